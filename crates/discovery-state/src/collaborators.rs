//! Services the feed session talks to
//!
//! Collaborators are optional. A session without an outcome sink simply does
//! not persist swipes; a failing collaborator is logged and never changes the
//! feed.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use discovery_core::engine::HapticPattern;
use discovery_core::{ActionKind, CandidateItem};

/// Collaborator errors
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Service could not be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Service refused the request
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Result type for collaborator calls
pub type Result<T> = std::result::Result<T, CollaboratorError>;

/// A persisted like or dislike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeOutcome {
    /// Feed session that produced it
    pub session_id: Uuid,
    /// Like or dislike
    pub kind: ActionKind,
    /// Swiped item
    pub item_id: String,
    /// Boutique of the item
    pub source_name: String,
    /// When the swipe committed (RFC 3339)
    pub created_at: String,
}

impl SwipeOutcome {
    /// Outcome stamped with the current time
    pub fn new(session_id: Uuid, kind: ActionKind, item: &CandidateItem) -> Self {
        Self {
            session_id,
            kind,
            item_id: item.id.clone(),
            source_name: item.source_name.clone(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Persistence for swipe outcomes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Store a committed swipe
    async fn record(&self, outcome: SwipeOutcome) -> Result<()>;

    /// Remove a swipe that was undone
    async fn retract(&self, session_id: Uuid, item_id: String) -> Result<()>;
}

/// Similarity expansion for long-press previews
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimilarItems: Send + Sync {
    /// Items related to the held one
    async fn similar_to(&self, item: CandidateItem) -> Result<Vec<CandidateItem>>;
}

/// Platform haptics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HapticSink: Send + Sync {
    /// Play a pulse
    async fn pulse(&self, pattern: HapticPattern) -> Result<()>;
}

/// The set of services wired into a session
#[derive(Clone, Default)]
pub struct Collaborators {
    pub(crate) outcomes: Option<Arc<dyn OutcomeSink>>,
    pub(crate) similar: Option<Arc<dyn SimilarItems>>,
    pub(crate) haptics: Option<Arc<dyn HapticSink>>,
}

impl Collaborators {
    /// No collaborators
    pub fn new() -> Self {
        Self::default()
    }

    /// Persist outcomes to this sink
    pub fn with_outcomes(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.outcomes = Some(sink);
        self
    }

    /// Look up similar items with this service
    pub fn with_similar_items(mut self, service: Arc<dyn SimilarItems>) -> Self {
        self.similar = Some(service);
        self
    }

    /// Play haptics on this sink
    pub fn with_haptics(mut self, sink: Arc<dyn HapticSink>) -> Self {
        self.haptics = Some(sink);
        self
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("outcomes", &self.outcomes.is_some())
            .field("similar", &self.similar.is_some())
            .field("haptics", &self.haptics.is_some())
            .finish()
    }
}
