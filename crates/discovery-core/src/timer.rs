//! One-shot alarm handles
//!
//! The engine never sleeps. It hands out [`TimerId`]s to the value that owns
//! each alarm (drag session, pending action, notification, in-flight fling)
//! and asks the host to schedule or cancel them. A fired id that no owner
//! recognises any more is stale and ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a scheduled alarm, unique within one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// What an alarm is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerKind {
    /// Hold-to-preview detection
    LongPress,
    /// End of the exit fling
    FlingComplete,
    /// End of the undo window
    UndoWindow,
    /// Loyalty notification auto-dismiss
    Notification,
}

/// Monotonic allocator for [`TimerId`]s
#[derive(Debug, Default)]
pub struct TimerIds {
    next: u64,
}

impl TimerIds {
    /// Create a new allocator
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id
    pub fn allocate(&mut self) -> TimerId {
        self.next += 1;
        TimerId(self.next)
    }
}
