//! Card queue
//!
//! Holds the candidate list handed over by the catalog, the cursor into it
//! and the single undoable action.

use serde::{Deserialize, Serialize};

use crate::catalog::CandidateItem;

/// Kind of committed swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    /// Swiped right
    Like,
    /// Swiped left
    Dislike,
}

impl ActionKind {
    /// Lowercase name used in logs and outcome records
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Like => "like",
            ActionKind::Dislike => "dislike",
        }
    }
}

/// The last committed swipe, undoable until its window closes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    /// What was committed
    pub kind: ActionKind,
    /// The swiped item
    pub item: CandidateItem,
    /// Cursor value before the commit advanced it
    pub index_at_commit: usize,
}

/// Ordered candidates with a cursor
///
/// Invariant: `0 <= index <= len`; `index == len` means "all caught up".
#[derive(Debug, Clone, Default)]
pub struct CardQueue {
    items: Vec<CandidateItem>,
    index: usize,
    pending: Option<PendingAction>,
}

impl CardQueue {
    /// Create a queue positioned at the first candidate
    pub fn new(items: Vec<CandidateItem>) -> Self {
        Self {
            items,
            index: 0,
            pending: None,
        }
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the feed had no candidates at all
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cursor position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether every candidate has been swiped
    pub fn is_exhausted(&self) -> bool {
        self.index >= self.items.len()
    }

    /// The candidate under the finger, if any
    pub fn current(&self) -> Option<&CandidateItem> {
        self.items.get(self.index)
    }

    /// The card to draw on top. Stays on the last card once exhausted.
    pub fn visible(&self) -> Option<&CandidateItem> {
        self.current().or_else(|| self.items.last())
    }

    /// Cards stacked behind the current one
    pub fn upcoming(&self, count: usize) -> &[CandidateItem] {
        let start = (self.index + 1).min(self.items.len());
        let end = (start + count).min(self.items.len());
        &self.items[start..end]
    }

    /// Cards not yet swiped, including the current one
    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.index)
    }

    /// Move past the current card. Returns false when this exhausted the feed
    /// (or it already was).
    pub fn advance(&mut self) -> bool {
        if !self.items.is_empty() && self.index < self.items.len() - 1 {
            self.index += 1;
            true
        } else {
            self.index = self.items.len();
            false
        }
    }

    /// Store the undoable action, replacing any previous one
    pub fn record_action(
        &mut self,
        kind: ActionKind,
        item: CandidateItem,
        index_at_commit: usize,
    ) -> Option<PendingAction> {
        self.pending.replace(PendingAction {
            kind,
            item,
            index_at_commit,
        })
    }

    /// The undoable action, if its window is still open
    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Restore the cursor to before the last commit
    pub fn undo(&mut self) -> Option<PendingAction> {
        let action = self.pending.take()?;
        self.index = action.index_at_commit.min(self.items.len());
        Some(action)
    }

    /// Drop the undoable action without restoring anything
    pub fn clear_pending(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }
}
