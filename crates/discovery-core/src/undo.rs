//! Undo affordance visibility
//!
//! The undo button is shown for a fixed window after each commit. The
//! controller only tracks which alarm owns that window; the undoable action
//! itself lives in the [`CardQueue`](crate::queue::CardQueue).

use std::time::Duration;

use crate::timer::TimerId;

/// Visibility of the undo affordance
#[derive(Debug, Clone)]
pub struct UndoController {
    window: Duration,
    armed: Option<TimerId>,
}

impl UndoController {
    /// Create a controller with the given visibility window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
        }
    }

    /// How long the affordance stays visible
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether the undo button is showing
    pub fn is_visible(&self) -> bool {
        self.armed.is_some()
    }

    /// Show the affordance for a new commit. Returns the superseded alarm.
    pub fn arm(&mut self, timer: TimerId) -> Option<TimerId> {
        self.armed.replace(timer)
    }

    /// Hide immediately after a successful undo. Returns the alarm to cancel.
    pub fn disarm(&mut self) -> Option<TimerId> {
        self.armed.take()
    }

    /// Window alarm fired. True when it was the current window.
    pub fn expire(&mut self, timer: TimerId) -> bool {
        if self.armed == Some(timer) {
            self.armed = None;
            true
        } else {
            false
        }
    }
}
