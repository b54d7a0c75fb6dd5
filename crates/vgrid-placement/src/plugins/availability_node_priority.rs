//! Node-spread priority.

use vgrid_state::State;

use crate::plugin::{ScorePlugin, VReplicaRequest};
use crate::plugins::AVAILABILITY_NODE_PRIORITY;
use crate::status::Status;

/// Design slot for preferring workers on the node that currently carries the
/// fewest of this vpod's vreplicas. Scores a flat value for now, like its
/// zone-level sibling.
#[derive(Debug, Default)]
pub struct AvailabilityNodePriority;

impl ScorePlugin for AvailabilityNodePriority {
    fn name(&self) -> &'static str {
        AVAILABILITY_NODE_PRIORITY
    }

    fn score(&self, _state: &State, _request: &VReplicaRequest<'_>, _ordinal: i32) -> (i64, Status) {
        (1, Status::success())
    }
}
