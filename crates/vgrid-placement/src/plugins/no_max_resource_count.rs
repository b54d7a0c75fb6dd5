//! Occupied-worker-count predicate.

use vgrid_state::State;

use crate::plugin::{FilterPlugin, VReplicaRequest};
use crate::plugins::NO_MAX_RESOURCE_COUNT;
use crate::status::Status;

/// Caps the number of *occupied* workers across the whole pool.
///
/// Placing on an already-occupied worker never violates the cap; placing on
/// an empty worker does when the pool is already at the configured maximum.
/// The bound typically mirrors an external resource limit, e.g. the number
/// of partitions a consumer set can usefully spread over.
#[derive(Debug)]
pub struct NoMaxResourceCount {
    max_resource_count: i32,
}

impl NoMaxResourceCount {
    pub fn new(max_resource_count: i32) -> Self {
        Self { max_resource_count }
    }
}

impl FilterPlugin for NoMaxResourceCount {
    fn name(&self) -> &'static str {
        NO_MAX_RESOURCE_COUNT
    }

    fn filter(&self, state: &State, _request: &VReplicaRequest<'_>, ordinal: i32) -> Status {
        let occupied = state.occupied_workers();
        let newly_occupied = state.free(ordinal) == state.capacity;

        if occupied + i32::from(newly_occupied) > self.max_resource_count {
            Status::unschedulable(format!(
                "placing would occupy more than {} workers",
                self.max_resource_count
            ))
        } else {
            Status::success()
        }
    }
}
