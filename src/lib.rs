//! Vitrin swipe discovery
//!
//! Re-exports the pure engine ([`discovery_core`]) and the tokio session
//! runtime ([`discovery_state`]), and sets up logging for hosts that do not
//! install their own subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use discovery_core;
pub use discovery_state;

pub use discovery_core::{
    ActionKind, CandidateItem, DiscoveryConfig, DiscoveryEngine, DiscoveryEvent, Effect,
    FeedSnapshot, GestureSample,
};
pub use discovery_state::{Collaborators, FeedSession, SessionError, SessionEvent};

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install a global subscriber that writes to stdout, filtered by `RUST_LOG`.
///
/// Fails if another subscriber is already installed.
pub fn init_tracing() -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
}
