//! Swipe gesture classification
//!
//! One [`DragSession`] exists per touch-down-to-release cycle. While it is
//! alive the classifier races the long-press alarm against movement and,
//! on release, turns the final offset into a swipe decision.

use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::timer::TimerId;

/// One observation of an active drag
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureSample {
    /// Horizontal offset from touch-down (px)
    pub dx: f32,
    /// Vertical offset from touch-down (px)
    pub dy: f32,
    /// Horizontal velocity (px/s)
    pub velocity_x: f32,
    /// Vertical velocity (px/s)
    pub velocity_y: f32,
    /// Time since touch-down (ms)
    pub elapsed_ms: u64,
}

impl GestureSample {
    /// Sample with an offset and no velocity
    pub fn at(dx: f32, dy: f32, elapsed_ms: u64) -> Self {
        Self {
            dx,
            dy,
            velocity_x: 0.0,
            velocity_y: 0.0,
            elapsed_ms,
        }
    }

    /// Attach velocities
    pub fn with_velocity(mut self, velocity_x: f32, velocity_y: f32) -> Self {
        self.velocity_x = velocity_x;
        self.velocity_y = velocity_y;
        self
    }
}

/// Classifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GesturePhase {
    /// No finger on the card
    #[default]
    Idle,
    /// Finger down, no decision yet
    Dragging,
    /// Released past the right threshold
    CommittedLike,
    /// Released past the left threshold
    CommittedDislike,
    /// Released inside the thresholds
    SnappingBack,
    /// Held still long enough to preview similar items
    LongPressActive,
}

/// Result of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwipeDecision {
    /// Swipe right
    Like,
    /// Swipe left
    Dislike,
    /// Return to center
    SnapBack,
}

/// Classify a release offset. Ties with the threshold snap back.
pub fn classify(dx: f32, threshold: f32) -> SwipeDecision {
    if dx > threshold {
        SwipeDecision::Like
    } else if dx < -threshold {
        SwipeDecision::Dislike
    } else {
        SwipeDecision::SnapBack
    }
}

/// State of one touch-down-to-release cycle
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    long_press: Option<TimerId>,
    suppressed: bool,
    last: Option<GestureSample>,
    beyond_threshold: bool,
}

impl DragSession {
    fn new(long_press: TimerId) -> Self {
        Self {
            long_press: Some(long_press),
            suppressed: false,
            last: None,
            beyond_threshold: false,
        }
    }

    /// Pending long-press alarm, if still armed
    pub fn long_press_timer(&self) -> Option<TimerId> {
        self.long_press
    }

    /// Whether a long-press already claimed this session
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Most recent accepted sample
    pub fn last_sample(&self) -> Option<&GestureSample> {
        self.last.as_ref()
    }
}

/// What a sample changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleOutcome {
    /// Whether the sample was accepted into the session
    pub accepted: bool,
    /// Long-press alarm abandoned because of movement
    pub cancelled_long_press: Option<TimerId>,
    /// The drag just moved past the commit threshold
    pub crossed_threshold: bool,
}

/// What a release resolved to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReleaseOutcome {
    /// There was no drag in progress
    Ignored,
    /// A long-press already consumed the session
    Suppressed,
    /// Swipe decision for the final sample
    Decided {
        /// Classification of the final offset
        decision: SwipeDecision,
        /// Final position and velocity
        sample: GestureSample,
    },
}

/// Release result plus the alarm that no longer needs to fire
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    /// The resolution
    pub outcome: ReleaseOutcome,
    /// Long-press alarm to cancel
    pub cancelled_long_press: Option<TimerId>,
}

/// Per-card gesture state machine
#[derive(Debug, Clone)]
pub struct GestureClassifier {
    threshold: f32,
    tolerance: f32,
    phase: GesturePhase,
    session: Option<DragSession>,
}

impl GestureClassifier {
    /// Create a classifier with the given thresholds
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            threshold: config.commit_threshold,
            tolerance: config.long_press_tolerance,
            phase: GesturePhase::Idle,
            session: None,
        }
    }

    /// Current phase
    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    /// Active drag session, if any
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Whether a finger is currently on the card
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Touch-down. Returns the alarm of a session that was still open, which
    /// the caller must cancel.
    pub fn begin(&mut self, long_press: TimerId) -> Option<TimerId> {
        let stale = self.session.take().and_then(|s| s.long_press);
        if stale.is_some() {
            tracing::debug!("drag started over an unfinished session");
        }
        self.session = Some(DragSession::new(long_press));
        self.phase = GesturePhase::Dragging;
        stale
    }

    /// Feed a movement sample
    pub fn on_sample(&mut self, sample: GestureSample) -> SampleOutcome {
        let Some(session) = self.session.as_mut() else {
            return SampleOutcome::default();
        };

        if let Some(last) = &session.last {
            if sample.elapsed_ms <= last.elapsed_ms {
                tracing::trace!(
                    elapsed_ms = sample.elapsed_ms,
                    last_ms = last.elapsed_ms,
                    "ignoring out-of-order sample"
                );
                return SampleOutcome::default();
            }
        }
        session.last = Some(sample);

        if session.suppressed {
            return SampleOutcome {
                accepted: true,
                ..SampleOutcome::default()
            };
        }

        let mut outcome = SampleOutcome {
            accepted: true,
            ..SampleOutcome::default()
        };

        if sample.dx.abs() > self.tolerance || sample.dy.abs() > self.tolerance {
            outcome.cancelled_long_press = session.long_press.take();
        }

        let beyond = sample.dx.abs() > self.threshold;
        outcome.crossed_threshold = beyond && !session.beyond_threshold;
        session.beyond_threshold = beyond;

        outcome
    }

    /// Long-press alarm fired. Returns true when it claimed the session.
    pub fn on_long_press(&mut self, timer: TimerId) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.long_press != Some(timer) {
            return false;
        }
        session.long_press = None;
        session.suppressed = true;
        self.phase = GesturePhase::LongPressActive;
        true
    }

    /// Pointer up with the final sample
    pub fn release(&mut self, sample: GestureSample) -> Release {
        let Some(session) = self.session.take() else {
            return Release {
                outcome: ReleaseOutcome::Ignored,
                cancelled_long_press: None,
            };
        };

        if session.suppressed {
            self.phase = GesturePhase::Idle;
            return Release {
                outcome: ReleaseOutcome::Suppressed,
                cancelled_long_press: None,
            };
        }

        let decision = classify(sample.dx, self.threshold);
        self.phase = match decision {
            SwipeDecision::Like => GesturePhase::CommittedLike,
            SwipeDecision::Dislike => GesturePhase::CommittedDislike,
            SwipeDecision::SnapBack => GesturePhase::SnappingBack,
        };

        Release {
            outcome: ReleaseOutcome::Decided { decision, sample },
            cancelled_long_press: session.long_press,
        }
    }

    /// Pointer cancelled by the platform. Ends the session without a swipe.
    pub fn cancel(&mut self) -> Option<DragSession> {
        let session = self.session.take()?;
        self.phase = if session.suppressed {
            GesturePhase::Idle
        } else {
            GesturePhase::SnappingBack
        };
        Some(session)
    }

    /// Return to idle once the release animation has been handed off
    pub fn settle(&mut self) {
        if self.session.is_none() {
            self.phase = GesturePhase::Idle;
        }
    }
}
