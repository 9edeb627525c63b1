//! Feed session runtime for Vitrin
//!
//! This crate runs the discovery engine on a tokio task, turning its alarm
//! and event effects into timers, channels and collaborator calls.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collaborators;
pub mod session;

pub use collaborators::{
    CollaboratorError, Collaborators, HapticSink, OutcomeSink, SimilarItems, SwipeOutcome,
};
pub use session::{FeedSession, SessionError, SessionEvent};
