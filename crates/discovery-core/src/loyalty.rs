//! Boutique loyalty detection
//!
//! Keeps the most recent likes in a bounded buffer and prompts the user to
//! favorite a boutique when it shows up an exact number of times. The count
//! must match exactly so that further likes from the same boutique do not
//! prompt again while older entries age out.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::catalog::CandidateItem;
use crate::timer::TimerId;

/// Bounded buffer of liked items, newest first
#[derive(Debug, Clone)]
pub struct RecentBuffer {
    capacity: usize,
    items: VecDeque<CandidateItem>,
}

impl RecentBuffer {
    /// Create an empty buffer
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a like at the front, evicting the oldest past capacity
    pub fn push(&mut self, item: CandidateItem) -> Option<CandidateItem> {
        self.items.push_front(item);
        if self.items.len() > self.capacity {
            self.items.pop_back()
        } else {
            None
        }
    }

    /// Remove the newest entry with this id
    pub fn remove(&mut self, item_id: &str) -> Option<CandidateItem> {
        let position = self.items.iter().position(|item| item.id == item_id)?;
        self.items.remove(position)
    }

    /// Occurrences of a source in the buffer
    pub fn count_source(&self, source_name: &str) -> usize {
        self.items
            .iter()
            .filter(|item| item.source_name == source_name)
            .count()
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &CandidateItem> {
        self.items.iter()
    }

    /// Owned copy of the entries, newest first
    pub fn to_vec(&self) -> Vec<CandidateItem> {
        self.items.iter().cloned().collect()
    }
}

/// Prompt to favorite a boutique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyNotification {
    /// The boutique
    pub source_name: String,
    /// How many buffered likes it has
    pub count: usize,
}

/// Result of recording a like
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoyaltyCheck {
    /// Count is not exactly at the threshold
    Below,
    /// Threshold reached and nothing is showing
    Qualified(LoyaltyNotification),
    /// Threshold reached but a notification is already live
    Dropped(LoyaltyNotification),
}

/// Watches recent likes for repeated boutiques
#[derive(Debug, Clone)]
pub struct LoyaltyDetector {
    buffer: RecentBuffer,
    threshold: usize,
    live: Option<(LoyaltyNotification, TimerId)>,
}

impl LoyaltyDetector {
    /// Create a detector with the given buffer capacity and exact threshold
    pub fn new(capacity: usize, threshold: usize) -> Self {
        Self {
            buffer: RecentBuffer::new(capacity),
            threshold,
            live: None,
        }
    }

    /// The recently-liked buffer
    pub fn recent(&self) -> &RecentBuffer {
        &self.buffer
    }

    /// Notification currently on screen
    pub fn live(&self) -> Option<&LoyaltyNotification> {
        self.live.as_ref().map(|(notification, _)| notification)
    }

    /// Record a committed like and check the threshold
    pub fn record_like(&mut self, item: CandidateItem) -> LoyaltyCheck {
        let source_name = item.source_name.clone();
        if let Some(evicted) = self.buffer.push(item) {
            tracing::trace!(item_id = %evicted.id, "evicted from recent likes");
        }

        let count = self.buffer.count_source(&source_name);
        if count != self.threshold {
            return LoyaltyCheck::Below;
        }

        let notification = LoyaltyNotification { source_name, count };
        if self.live.is_some() {
            LoyaltyCheck::Dropped(notification)
        } else {
            LoyaltyCheck::Qualified(notification)
        }
    }

    /// Put a qualified notification on screen under the given dismiss alarm
    pub fn show(&mut self, notification: LoyaltyNotification, timer: TimerId) {
        self.live = Some((notification, timer));
    }

    /// Remove a like that was undone. Returns true if it was buffered.
    pub fn remove_like(&mut self, item_id: &str) -> bool {
        self.buffer.remove(item_id).is_some()
    }

    /// Take the live notification if its boutique no longer reaches the
    /// threshold, e.g. after the qualifying like was undone
    pub fn withdraw_below_threshold(&mut self) -> Option<(LoyaltyNotification, TimerId)> {
        let below = match &self.live {
            Some((notification, _)) => {
                self.buffer.count_source(&notification.source_name) < self.threshold
            }
            None => false,
        };
        if below {
            self.live.take()
        } else {
            None
        }
    }

    /// Close the notification (accepted or dismissed by the user)
    pub fn close(&mut self) -> Option<(LoyaltyNotification, TimerId)> {
        self.live.take()
    }

    /// Dismiss alarm fired. Returns the notification if the alarm was current.
    pub fn expire(&mut self, timer: TimerId) -> Option<LoyaltyNotification> {
        match &self.live {
            Some((_, live_timer)) if *live_timer == timer => {
                self.live.take().map(|(notification, _)| notification)
            }
            _ => None,
        }
    }
}
