//! Discovery feed configuration
//!
//! Every threshold, capacity and physics constant used by the discovery
//! engine lives here so that independent feed sessions can be constructed
//! with their own tuning. The defaults reproduce the shipping feel of the
//! swipe deck.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value the engine cannot work with
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// JSON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Gesture classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GestureConfig {
    /// Horizontal offset (px) a release must exceed to commit a swipe
    pub commit_threshold: f32,
    /// How long a still hold must last before it becomes a long-press
    pub long_press_ms: u64,
    /// Movement (px, per axis) tolerated before a long-press is abandoned
    pub long_press_tolerance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            commit_threshold: 120.0,
            long_press_ms: 500,
            long_press_tolerance: 10.0,
        }
    }
}

/// Live drag feedback constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArcConfig {
    /// Parabola coefficient for the upward arc
    pub coefficient: f32,
    /// Rotation (degrees) reached at half a viewport of travel
    pub max_rotation_deg: f32,
    /// Opacity reached at a third of a viewport of travel
    pub min_opacity: f32,
}

impl Default for ArcConfig {
    fn default() -> Self {
        Self {
            coefficient: 0.0008,
            max_rotation_deg: 7.0,
            min_opacity: 0.7,
        }
    }
}

/// Exit fling constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlingConfig {
    /// Minimum exit speed in px/s
    pub min_velocity: f32,
    /// Distance past the viewport edge where the card is considered gone
    pub exit_overshoot: f32,
    /// Share of horizontal release speed carried into the upward exit
    pub vertical_factor: f32,
    /// Per-millisecond velocity retention of the decay
    pub deceleration: f32,
    /// Speed (px/s) below which a decaying card is at rest
    pub rest_velocity: f32,
}

impl Default for FlingConfig {
    fn default() -> Self {
        Self {
            min_velocity: 800.0,
            exit_overshoot: 200.0,
            vertical_factor: 0.3,
            deceleration: 0.998,
            rest_velocity: 100.0,
        }
    }
}

/// Snap-back spring parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpringConfig {
    /// Damping coefficient
    pub damping: f32,
    /// Spring stiffness
    pub stiffness: f32,
    /// Mass of the card
    pub mass: f32,
    /// Displacement (px) considered settled
    pub rest_displacement: f32,
    /// Speed (px/s) considered settled
    pub rest_speed: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            damping: 20.0,
            stiffness: 300.0,
            mass: 1.0,
            rest_displacement: 0.01,
            rest_speed: 2.0,
        }
    }
}

impl SpringConfig {
    /// Damping ratio (1.0 is critical damping)
    pub fn damping_ratio(&self) -> f32 {
        self.damping / (2.0 * (self.stiffness * self.mass).sqrt())
    }
}

/// Complete discovery feed configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    /// Width of the card viewport in px
    pub viewport_width: f32,
    /// Gesture thresholds
    pub gesture: GestureConfig,
    /// Live drag feedback
    pub arc: ArcConfig,
    /// Exit fling
    pub fling: FlingConfig,
    /// Snap-back spring
    pub spring: SpringConfig,
    /// How long a committed swipe stays undoable
    pub undo_window_ms: u64,
    /// How long a loyalty notification stays on screen
    pub notification_ms: u64,
    /// Capacity of the recently-liked buffer
    pub recent_capacity: usize,
    /// Exact number of buffered likes from one source that triggers a notification
    pub loyalty_threshold: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            viewport_width: 390.0,
            gesture: GestureConfig::default(),
            arc: ArcConfig::default(),
            fling: FlingConfig::default(),
            spring: SpringConfig::default(),
            undo_window_ms: 3000,
            notification_ms: 5000,
            recent_capacity: 10,
            loyalty_threshold: 5,
        }
    }
}

impl DiscoveryConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the viewport width
    pub fn viewport_width(mut self, width: f32) -> Self {
        self.viewport_width = width;
        self
    }

    /// Set the commit threshold
    pub fn commit_threshold(mut self, threshold: f32) -> Self {
        self.gesture.commit_threshold = threshold;
        self
    }

    /// Set the undo window in milliseconds
    pub fn undo_window_ms(mut self, millis: u64) -> Self {
        self.undo_window_ms = millis;
        self
    }

    /// Set the loyalty notification lifetime in milliseconds
    pub fn notification_ms(mut self, millis: u64) -> Self {
        self.notification_ms = millis;
        self
    }

    /// Set the recently-liked buffer capacity
    pub fn recent_capacity(mut self, capacity: usize) -> Self {
        self.recent_capacity = capacity;
        self
    }

    /// Set the loyalty threshold
    pub fn loyalty_threshold(mut self, threshold: usize) -> Self {
        self.loyalty_threshold = threshold;
        self
    }

    /// Long-press hold duration
    pub fn long_press_duration(&self) -> Duration {
        Duration::from_millis(self.gesture.long_press_ms)
    }

    /// Undo visibility window
    pub fn undo_window(&self) -> Duration {
        Duration::from_millis(self.undo_window_ms)
    }

    /// Loyalty notification lifetime
    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }

    /// Parse a configuration from JSON, filling missing fields with defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that every value is usable by the engine
    pub fn validate(&self) -> Result<()> {
        positive("viewportWidth", self.viewport_width)?;
        positive("gesture.commitThreshold", self.gesture.commit_threshold)?;
        non_negative("gesture.longPressTolerance", self.gesture.long_press_tolerance)?;
        non_negative("arc.coefficient", self.arc.coefficient)?;
        non_negative("arc.maxRotationDeg", self.arc.max_rotation_deg)?;
        if !(0.0..=1.0).contains(&self.arc.min_opacity) {
            return Err(invalid("arc.minOpacity", "must be within [0, 1]"));
        }
        positive("fling.minVelocity", self.fling.min_velocity)?;
        non_negative("fling.exitOvershoot", self.fling.exit_overshoot)?;
        non_negative("fling.verticalFactor", self.fling.vertical_factor)?;
        if !(self.fling.deceleration > 0.0 && self.fling.deceleration < 1.0) {
            return Err(invalid("fling.deceleration", "must be within (0, 1)"));
        }
        positive("fling.restVelocity", self.fling.rest_velocity)?;
        non_negative("spring.damping", self.spring.damping)?;
        positive("spring.stiffness", self.spring.stiffness)?;
        positive("spring.mass", self.spring.mass)?;
        positive("spring.restDisplacement", self.spring.rest_displacement)?;
        positive("spring.restSpeed", self.spring.rest_speed)?;
        if self.recent_capacity == 0 {
            return Err(invalid("recentCapacity", "must be at least 1"));
        }
        if self.loyalty_threshold == 0 || self.loyalty_threshold > self.recent_capacity {
            return Err(invalid(
                "loyaltyThreshold",
                "must be between 1 and recentCapacity",
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive finite number"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a non-negative finite number"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = DiscoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gesture.commit_threshold, 120.0);
        assert_eq!(config.long_press_duration(), Duration::from_millis(500));
        assert_eq!(config.undo_window(), Duration::from_millis(3000));
        assert_eq!(config.notification_duration(), Duration::from_millis(5000));
        assert_eq!(config.recent_capacity, 10);
        assert_eq!(config.loyalty_threshold, 5);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config =
            DiscoveryConfig::from_json_str(r#"{"viewportWidth": 428, "gesture": {"commitThreshold": 100}}"#)
                .unwrap();
        assert_eq!(config.viewport_width, 428.0);
        assert_eq!(config.gesture.commit_threshold, 100.0);
        assert_eq!(config.gesture.long_press_ms, 500);
        assert_eq!(config.spring, SpringConfig::default());
    }

    #[test]
    fn test_rejects_threshold_above_capacity() {
        let config = DiscoveryConfig::new().recent_capacity(4).loyalty_threshold(5);
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "loyaltyThreshold"),
            other => panic!("Expected invalid loyaltyThreshold, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_viewport() {
        assert!(DiscoveryConfig::new().viewport_width(0.0).validate().is_err());
        assert!(DiscoveryConfig::new().viewport_width(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = DiscoveryConfig::from_json_str("{not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"undoWindowMs": 4000, "loyaltyThreshold": 3}}"#).unwrap();

        let config = DiscoveryConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.undo_window(), Duration::from_millis(4000));
        assert_eq!(config.loyalty_threshold, 3);
    }

    #[test]
    fn test_missing_file() {
        let result = DiscoveryConfig::from_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_default_spring_is_underdamped() {
        let ratio = SpringConfig::default().damping_ratio();
        assert!(ratio > 0.57 && ratio < 0.58);
    }
}
