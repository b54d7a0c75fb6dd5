//! Error types for state snapshot building.

use thiserror::Error;

/// Result type alias for state operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur while building a state snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("listing vpods failed: {0}")]
    VPodList(#[source] anyhow::Error),

    #[error("listing nodes failed: {0}")]
    NodeList(#[source] anyhow::Error),
}
