//! Swipe discovery core for Vitrin
//!
//! This crate provides the gesture classification, card physics, candidate
//! queue, undo and boutique-loyalty logic behind the discovery feed. It is
//! synchronous and runtime-agnostic: the [`DiscoveryEngine`] returns effects
//! for a host runtime to execute.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod config;
pub mod engine;
pub mod fling;
pub mod gesture;
pub mod loyalty;
pub mod physics;
pub mod queue;
pub mod timer;
pub mod undo;

pub use catalog::CandidateItem;
pub use config::{ConfigError, DiscoveryConfig};
pub use engine::{DiscoveryEngine, DiscoveryEvent, Effect, FeedSnapshot, SessionStats};
pub use gesture::GestureSample;
pub use queue::ActionKind;
pub use timer::{TimerId, TimerKind};
