//! Zone-spread priority.

use vgrid_state::State;

use crate::plugin::{ScorePlugin, VReplicaRequest};
use crate::plugins::AVAILABILITY_ZONE_PRIORITY;
use crate::status::Status;

/// Design slot for preferring workers in the zone that currently carries the
/// fewest of this vpod's vreplicas.
///
/// Scores a flat value for now, so it contributes weight-proportionally
/// without reordering candidates.
// TODO: score by per-zone vreplica counts from the request's placements.
#[derive(Debug, Default)]
pub struct AvailabilityZonePriority;

impl ScorePlugin for AvailabilityZonePriority {
    fn name(&self) -> &'static str {
        AVAILABILITY_ZONE_PRIORITY
    }

    fn score(&self, _state: &State, _request: &VReplicaRequest<'_>, _ordinal: i32) -> (i64, Status) {
        (1, Status::success())
    }
}
