//! Live drag feedback
//!
//! Maps the horizontal drag offset to the card's arc, tilt and fade. Every
//! value is a pure function of the current offset, so it can be evaluated
//! at any frame rate without history.

use serde::{Deserialize, Serialize};

use crate::config::DiscoveryConfig;

/// Visual state of the top card for one drag sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransform {
    /// Horizontal offset (follows the finger)
    pub translate_x: f32,
    /// Vertical arc offset (negative is up)
    pub translate_y: f32,
    /// Tilt in degrees
    pub rotation_deg: f32,
    /// Card opacity
    pub opacity: f32,
    /// Strength of the LIKE stamp in [0, 1]
    pub like_hint: f32,
    /// Strength of the NOPE stamp in [0, 1]
    pub dislike_hint: f32,
}

impl CardTransform {
    /// The resting card
    pub fn identity() -> Self {
        Self {
            opacity: 1.0,
            ..Self::default()
        }
    }
}

/// Arc trajectory calculator
#[derive(Debug, Clone, PartialEq)]
pub struct ArcPhysics {
    coefficient: f32,
    max_rotation_deg: f32,
    min_opacity: f32,
    viewport_width: f32,
    commit_threshold: f32,
}

impl ArcPhysics {
    /// Build from a feed configuration
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            coefficient: config.arc.coefficient,
            max_rotation_deg: config.arc.max_rotation_deg,
            min_opacity: config.arc.min_opacity,
            viewport_width: config.viewport_width,
            commit_threshold: config.gesture.commit_threshold,
        }
    }

    /// Upward arc offset: `-coefficient * dx²`
    pub fn translate_y(&self, dx: f32) -> f32 {
        -self.coefficient * dx * dx
    }

    /// Tilt, interpolated over half a viewport each side and clamped
    pub fn rotation_deg(&self, dx: f32) -> f32 {
        if !self.has_viewport() {
            return 0.0;
        }
        let half = self.viewport_width / 2.0;
        interpolate_clamped(
            dx,
            (-half, half),
            (-self.max_rotation_deg, self.max_rotation_deg),
        )
    }

    /// Fade, interpolated over a third of a viewport of travel and clamped
    pub fn opacity(&self, dx: f32) -> f32 {
        if !self.has_viewport() {
            return 1.0;
        }
        interpolate_clamped(
            dx.abs(),
            (0.0, self.viewport_width / 3.0),
            (1.0, self.min_opacity),
        )
    }

    /// Full card transform for a drag offset
    pub fn transform(&self, dx: f32) -> CardTransform {
        let (like_hint, dislike_hint) = if self.commit_threshold > 0.0 {
            (
                (dx / self.commit_threshold).clamp(0.0, 1.0),
                (-dx / self.commit_threshold).clamp(0.0, 1.0),
            )
        } else {
            (0.0, 0.0)
        };

        CardTransform {
            translate_x: dx,
            translate_y: self.translate_y(dx),
            rotation_deg: self.rotation_deg(dx),
            opacity: self.opacity(dx),
            like_hint,
            dislike_hint,
        }
    }

    fn has_viewport(&self) -> bool {
        self.viewport_width.is_finite() && self.viewport_width > 0.0
    }
}

/// Linear map of `value` from `input` to `output`, clamped to the output range
fn interpolate_clamped(value: f32, input: (f32, f32), output: (f32, f32)) -> f32 {
    let (in_start, in_end) = input;
    let (out_start, out_end) = output;
    let fraction = (value - in_start) / (in_end - in_start);
    let mapped = out_start + (out_end - out_start) * fraction;
    let (lo, hi) = if out_start <= out_end {
        (out_start, out_end)
    } else {
        (out_end, out_start)
    };
    mapped.clamp(lo, hi)
}
