//! Plugin contracts.

use vgrid_core::types::{Placement, VPodKey};
use vgrid_state::State;

use crate::status::Status;

/// The vreplica being placed: which vpod it belongs to, how many vreplicas
/// that vpod wants in total, and the placements accumulated so far (committed
/// plus the ones placed earlier in the same pipeline run).
#[derive(Debug, Clone, Copy)]
pub struct VReplicaRequest<'a> {
    pub key: &'a VPodKey,
    pub desired: i32,
    pub placements: &'a [Placement],
}

/// A worker ordinal with its (possibly weighted) score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerScore {
    pub ordinal: i32,
    pub score: i64,
}

/// Decides whether one more vreplica fits on a worker.
///
/// Returning [`Status::unschedulable`] excludes the worker for this
/// vreplica; [`Status::error`] aborts the whole placement.
pub trait FilterPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn filter(&self, state: &State, request: &VReplicaRequest<'_>, ordinal: i32) -> Status;
}

/// Ranks feasible workers. Higher scores win; the engine multiplies each
/// score by the plugin's configured weight and sums across plugins.
pub trait ScorePlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, state: &State, request: &VReplicaRequest<'_>, ordinal: i32) -> (i64, Status);

    /// Optional post-pass over all scores this plugin produced.
    fn normalize_scores(&self, _state: &State, _scores: &mut [WorkerScore]) -> Status {
        Status::success()
    }
}
