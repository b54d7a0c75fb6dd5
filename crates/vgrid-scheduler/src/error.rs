//! Scheduler error types.

use thiserror::Error;

use vgrid_core::types::Placement;
use vgrid_placement::{EngineError, PolicyError};
use vgrid_state::StateError;

/// Errors that can occur during scheduling.
///
/// `NotEnoughReplicas` and `PluginFailed` carry the partial placement list:
/// the vreplicas that did fit stay placed (and reserved) while the caller
/// waits for capacity or fixes its plugins.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Capacity ran out; callers should commit the partial placements and
    /// retry once the autoscaler has caught up.
    #[error("not enough worker replicas: {left} vreplica(s) unplaced")]
    NotEnoughReplicas {
        placements: Vec<Placement>,
        left: i32,
    },

    /// A plugin reported an internal error mid-pipeline.
    #[error("placement pipeline aborted: {source}")]
    PluginFailed {
        placements: Vec<Placement>,
        left: i32,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    InvalidPolicy(#[from] PolicyError),

    #[error(transparent)]
    State(#[from] StateError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
