//! Catalog items shown in the discovery deck
//!
//! Items are supplied by the catalog collaborator in their final order and
//! are never mutated by the engine.

use serde::{Deserialize, Serialize};

/// A product candidate in the discovery feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateItem {
    /// Catalog identifier
    pub id: String,

    /// Boutique or brand the item comes from
    pub source_name: String,

    /// Product category (e.g. "dress", "outerwear")
    pub category: String,

    /// Color tags used by the similarity service
    #[serde(default)]
    pub color_tags: Vec<String>,

    /// Image reference for the card
    pub image_url: String,

    /// Current price
    pub price: f64,

    /// Price before discount, if the item is on sale
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_price: Option<f64>,
}

impl CandidateItem {
    /// Create a new item without color tags or sale price
    pub fn new(
        id: impl Into<String>,
        source_name: impl Into<String>,
        category: impl Into<String>,
        image_url: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            source_name: source_name.into(),
            category: category.into(),
            color_tags: Vec::new(),
            image_url: image_url.into(),
            price,
            original_price: None,
        }
    }

    /// Attach color tags
    pub fn with_color_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.color_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Attach a pre-discount price
    pub fn with_original_price(mut self, original_price: f64) -> Self {
        self.original_price = Some(original_price);
        self
    }

    /// Whether the card has everything it needs to be drawn
    ///
    /// Items failing this check are never rendered or dragged.
    pub fn is_renderable(&self) -> bool {
        !self.id.trim().is_empty()
            && !self.source_name.trim().is_empty()
            && !self.image_url.trim().is_empty()
            && self.price.is_finite()
            && self.price >= 0.0
    }

    /// Whether the item is discounted
    pub fn is_on_sale(&self) -> bool {
        matches!(self.original_price, Some(original) if original.is_finite() && original > self.price)
    }

    /// Discount as a whole percentage, rounded down
    pub fn discount_percent(&self) -> Option<u32> {
        let original = self.original_price?;
        if !self.is_on_sale() || original <= 0.0 {
            return None;
        }
        Some((((original - self.price) / original) * 100.0).floor() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dress() -> CandidateItem {
        CandidateItem::new("item-1", "Chic Boutique", "dress", "https://cdn/1.jpg", 450.0)
    }

    #[test]
    fn test_renderable() {
        assert!(dress().is_renderable());

        let mut missing_image = dress();
        missing_image.image_url = "  ".to_string();
        assert!(!missing_image.is_renderable());

        let mut bad_price = dress();
        bad_price.price = f64::NAN;
        assert!(!bad_price.is_renderable());

        let mut no_source = dress();
        no_source.source_name.clear();
        assert!(!no_source.is_renderable());
    }

    #[test]
    fn test_discount() {
        assert_eq!(dress().discount_percent(), None);
        assert_eq!(dress().with_original_price(600.0).discount_percent(), Some(25));
        // Original price below current price is not a sale
        assert_eq!(dress().with_original_price(300.0).discount_percent(), None);
    }

    #[test]
    fn test_serde_camel_case() {
        let item = dress().with_color_tags(["black", "red"]).with_original_price(500.0);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["sourceName"], "Chic Boutique");
        assert_eq!(json["imageUrl"], "https://cdn/1.jpg");
        assert_eq!(json["originalPrice"], 500.0);

        let parsed: CandidateItem = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, item);
    }

    #[test]
    fn test_missing_optional_fields() {
        let parsed: CandidateItem = serde_json::from_str(
            r#"{"id":"a","sourceName":"S","category":"bag","imageUrl":"u","price":10}"#,
        )
        .unwrap();
        assert!(parsed.color_tags.is_empty());
        assert_eq!(parsed.original_price, None);
    }
}
