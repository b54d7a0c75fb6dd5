//! Per-zone spread predicate.

use vgrid_core::ordinal::ordinal_from_worker_name;
use vgrid_state::State;

use crate::plugin::{FilterPlugin, VReplicaRequest};
use crate::plugins::EVEN_POD_SPREAD;
use crate::status::Status;

/// Caps how many of one vpod's vreplicas may land in a single zone.
///
/// The cap is `ceil(desired / num_zones)`. Workers without zone information
/// (no node assignment, or a node without the zone label) are not
/// constrained; with no zones known at all the predicate is inert.
#[derive(Debug, Default)]
pub struct EvenPodSpread;

impl FilterPlugin for EvenPodSpread {
    fn name(&self) -> &'static str {
        EVEN_POD_SPREAD
    }

    fn filter(&self, state: &State, request: &VReplicaRequest<'_>, ordinal: i32) -> Status {
        if state.num_zones <= 0 {
            return Status::success();
        }
        let Some(zone) = state.zone_of(ordinal) else {
            return Status::success();
        };

        let cap = (request.desired + state.num_zones - 1) / state.num_zones;
        let in_zone: i32 = request
            .placements
            .iter()
            .filter(|p| state.zone_of(ordinal_from_worker_name(&p.worker_name)) == Some(zone))
            .map(|p| p.vreplicas)
            .sum();

        if in_zone + 1 > cap {
            Status::unschedulable(format!("zone {zone} already holds {in_zone} vreplicas"))
        } else {
            Status::success()
        }
    }
}

#[cfg(test)]
mod tests {
    use vgrid_core::types::Placement;

    use super::*;
    use crate::plugins::testutil::{request, request_key, state_with_free};

    fn spread_state() -> State {
        // Three workers on three nodes across two zones.
        let mut state = state_with_free(vec![5, 5, 10], 10);
        state.num_zones = 2;
        state.num_nodes = 3;
        for (ordinal, node, zone) in [
            (0, "node-0", "zone-a"),
            (1, "node-1", "zone-a"),
            (2, "node-2", "zone-b"),
        ] {
            state.worker_to_node.insert(ordinal, node.to_string());
            state.node_to_zone.insert(node.to_string(), zone.to_string());
        }
        state
    }

    #[test]
    fn inert_without_zone_information() {
        let state = state_with_free(vec![5], 10);
        let key = request_key();
        let req = request(&key, 4, &[]);

        assert!(EvenPodSpread.filter(&state, &req, 0).is_success());
    }

    #[test]
    fn allows_placement_under_the_zone_cap() {
        let state = spread_state();
        let key = request_key();
        // desired=4 over 2 zones: cap 2 per zone. zone-a holds 1.
        let placements = [Placement::new("pool-0", 1)];
        let req = request(&key, 4, &placements);

        assert!(EvenPodSpread.filter(&state, &req, 1).is_success());
    }

    #[test]
    fn rejects_placement_at_the_zone_cap() {
        let state = spread_state();
        let key = request_key();
        // desired=4 over 2 zones: cap 2 per zone. zone-a already holds 2.
        let placements = [Placement::new("pool-0", 2)];
        let req = request(&key, 4, &placements);

        let status = EvenPodSpread.filter(&state, &req, 1);
        assert!(status.is_unschedulable());
    }

    #[test]
    fn other_zone_remains_schedulable() {
        let state = spread_state();
        let key = request_key();
        let placements = [Placement::new("pool-0", 2)];
        let req = request(&key, 4, &placements);

        assert!(EvenPodSpread.filter(&state, &req, 2).is_success());
    }

    #[test]
    fn unzoned_worker_is_not_constrained() {
        let mut state = spread_state();
        state.worker_to_node.remove(&1);
        let key = request_key();
        let placements = [Placement::new("pool-0", 2)];
        let req = request(&key, 4, &placements);

        assert!(EvenPodSpread.filter(&state, &req, 1).is_success());
    }
}
