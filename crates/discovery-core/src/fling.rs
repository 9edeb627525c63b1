//! Post-release card motion
//!
//! A committed swipe leaves the screen on an exponential decay that is
//! clamped at the exit bound; anything else springs back to the center.
//! Both motions are closed-form so the host can sample them at any time and
//! schedule their end without stepping a simulation.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{DiscoveryConfig, SpringConfig};
use crate::gesture::GestureSample;
use crate::queue::ActionKind;

/// Upper bound on computed animation lengths
const MAX_ANIMATION: Duration = Duration::from_secs(10);

/// Exit trajectory of a committed card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitTrajectory {
    /// Horizontal start (px)
    pub start_x: f32,
    /// Vertical start (px)
    pub start_y: f32,
    /// Horizontal exit velocity (px/s)
    pub velocity_x: f32,
    /// Vertical exit velocity (px/s), negative continues the arc upward
    pub velocity_y: f32,
    /// Signed horizontal position where the card is gone
    pub exit_x: f32,
    /// Decay rate per second
    pub decay_rate: f32,
    /// Speed below which the card is at rest
    pub rest_velocity: f32,
}

impl ExitTrajectory {
    /// Position at `elapsed` since release
    pub fn position_at(&self, elapsed: Duration) -> (f32, f32) {
        let t = elapsed.min(self.duration()).as_secs_f64();
        let k = self.decay_rate as f64;
        let travel = (1.0 - (-k * t).exp()) / k;

        let x = self.start_x as f64 + self.velocity_x as f64 * travel;
        let x = if self.exit_x >= 0.0 {
            x.min(self.exit_x as f64)
        } else {
            x.max(self.exit_x as f64)
        };
        let y = self.start_y as f64 + self.velocity_y as f64 * travel;
        (x as f32, y as f32)
    }

    /// Time until the card reaches the exit bound or comes to rest
    pub fn duration(&self) -> Duration {
        let k = self.decay_rate as f64;
        let speed = (self.velocity_x as f64).abs();
        let remaining = (self.exit_x as f64 - self.start_x as f64).abs();

        if speed <= 0.0 || k <= 0.0 {
            return Duration::ZERO;
        }
        let moving_outward = (self.exit_x - self.start_x).signum() == self.velocity_x.signum();
        if !moving_outward || remaining == 0.0 {
            return Duration::ZERO;
        }

        let max_travel = speed / k;
        let seconds = if remaining < max_travel {
            -(1.0 - remaining * k / speed).ln() / k
        } else if speed > self.rest_velocity as f64 {
            (speed / self.rest_velocity as f64).ln() / k
        } else {
            0.0
        };
        Duration::from_secs_f64(seconds).min(MAX_ANIMATION)
    }
}

/// Snap-back motion of an uncommitted card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapBack {
    /// Horizontal start (px)
    pub from_x: f32,
    /// Vertical start (px)
    pub from_y: f32,
    /// Horizontal release velocity (px/s)
    pub velocity_x: f32,
    /// Vertical release velocity (px/s)
    pub velocity_y: f32,
    /// Spring driving both axes
    pub spring: SpringConfig,
}

impl SnapBack {
    /// Position at `elapsed` since release
    pub fn position_at(&self, elapsed: Duration) -> (f32, f32) {
        let t = elapsed.as_secs_f64();
        let x = spring_state(&self.spring, self.from_x as f64, self.velocity_x as f64, t).0;
        let y = spring_state(&self.spring, self.from_y as f64, self.velocity_y as f64, t).0;
        (x as f32, y as f32)
    }

    /// Whether both axes are within the rest thresholds
    pub fn is_settled_at(&self, elapsed: Duration) -> bool {
        let t = elapsed.as_secs_f64();
        let rest_x = self.spring.rest_displacement as f64;
        let rest_v = self.spring.rest_speed as f64;
        [
            (self.from_x as f64, self.velocity_x as f64),
            (self.from_y as f64, self.velocity_y as f64),
        ]
        .iter()
        .all(|&(x0, v0)| {
            let (x, v) = spring_state(&self.spring, x0, v0, t);
            x.abs() < rest_x && v.abs() < rest_v
        })
    }

    /// Time until the card is settled, found at millisecond resolution
    pub fn settle_time(&self) -> Duration {
        let mut elapsed = Duration::ZERO;
        while elapsed < MAX_ANIMATION {
            if self.is_settled_at(elapsed) {
                return elapsed;
            }
            elapsed += Duration::from_millis(1);
        }
        MAX_ANIMATION
    }
}

/// Position and velocity of a damped spring pulled toward zero
fn spring_state(spring: &SpringConfig, x0: f64, v0: f64, t: f64) -> (f64, f64) {
    let mass = spring.mass as f64;
    let stiffness = spring.stiffness as f64;
    let omega = (stiffness / mass).sqrt();
    let zeta = spring.damping as f64 / (2.0 * (stiffness * mass).sqrt());

    if (zeta - 1.0).abs() < 1e-6 {
        let c = v0 + omega * x0;
        let decay = (-omega * t).exp();
        let x = decay * (x0 + c * t);
        let v = decay * (c - omega * (x0 + c * t));
        (x, v)
    } else if zeta < 1.0 {
        let omega_d = omega * (1.0 - zeta * zeta).sqrt();
        let b = (v0 + zeta * omega * x0) / omega_d;
        let decay = (-zeta * omega * t).exp();
        let (sin, cos) = (omega_d * t).sin_cos();
        let x = decay * (x0 * cos + b * sin);
        let v = decay * (-zeta * omega * (x0 * cos + b * sin) + omega_d * (b * cos - x0 * sin));
        (x, v)
    } else {
        let root = (zeta * zeta - 1.0).sqrt();
        let r1 = -omega * (zeta - root);
        let r2 = -omega * (zeta + root);
        let c1 = (v0 - r2 * x0) / (r1 - r2);
        let c2 = x0 - c1;
        let x = c1 * (r1 * t).exp() + c2 * (r2 * t).exp();
        let v = c1 * r1 * (r1 * t).exp() + c2 * r2 * (r2 * t).exp();
        (x, v)
    }
}

/// Computes release animations
#[derive(Debug, Clone, PartialEq)]
pub struct FlingResolver {
    viewport_width: f32,
    min_velocity: f32,
    exit_overshoot: f32,
    vertical_factor: f32,
    decay_rate: f32,
    rest_velocity: f32,
    spring: SpringConfig,
}

impl FlingResolver {
    /// Build from a feed configuration
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            min_velocity: config.fling.min_velocity,
            exit_overshoot: config.fling.exit_overshoot,
            vertical_factor: config.fling.vertical_factor,
            decay_rate: -(config.fling.deceleration.ln()) * 1000.0,
            rest_velocity: config.fling.rest_velocity,
            spring: config.spring,
        }
    }

    /// Exit trajectory for a committed swipe released at `sample`, with the
    /// card currently at vertical offset `start_y`
    pub fn exit(&self, kind: ActionKind, sample: &GestureSample, start_y: f32) -> ExitTrajectory {
        let sign = match kind {
            ActionKind::Like => 1.0,
            ActionKind::Dislike => -1.0,
        };
        let speed = sample.velocity_x.abs();
        ExitTrajectory {
            start_x: sample.dx,
            start_y,
            velocity_x: sign * speed.max(self.min_velocity),
            velocity_y: -speed * self.vertical_factor,
            exit_x: sign * (self.viewport_width + self.exit_overshoot),
            decay_rate: self.decay_rate,
            rest_velocity: self.rest_velocity,
        }
    }

    /// Spring back to the center from the release sample
    pub fn snap_back(&self, sample: &GestureSample) -> SnapBack {
        SnapBack {
            from_x: sample.dx,
            from_y: sample.dy,
            velocity_x: sample.velocity_x,
            velocity_y: sample.velocity_y,
            spring: self.spring,
        }
    }
}
