//! MAXFILLUP strategy: pack vreplicas onto the lowest ordinals.
//!
//! Scale-up has worker affinity: existing placements are filled to capacity
//! before new workers are considered. Scale-down walks placements in
//! reverse so the highest ordinals drain first, which keeps the pool
//! shrinkable from the top.

use vgrid_core::ordinal::{ordinal_from_worker_name, worker_name, INVALID_ORDINAL};
use vgrid_core::types::Placement;
use vgrid_state::State;

/// Grow `placements` by `diff` vreplicas. Returns the new placement list
/// and how many vreplicas did not fit.
pub fn add_replicas(
    state: &mut State,
    pool: &str,
    replicas: i32,
    mut diff: i32,
    placements: &[Placement],
) -> (Vec<Placement>, i32) {
    let mut new_placements = Vec::with_capacity(placements.len());

    // Fill existing placements up to capacity first. Placements with an
    // unparseable worker name are carried through untouched.
    for placement in placements {
        let ordinal = ordinal_from_worker_name(&placement.worker_name);
        let free = state.free(ordinal);
        if ordinal != INVALID_ORDINAL && diff > 0 && free > 0 {
            let allocation = free.min(diff);
            new_placements.push(Placement::new(
                &placement.worker_name,
                placement.vreplicas + allocation,
            ));
            diff -= allocation;
            state.set_free(ordinal, free - allocation);
        } else {
            new_placements.push(placement.clone());
        }
    }

    // Spill the rest onto the lowest free ordinals.
    if diff > 0 {
        for ordinal in 0..replicas {
            let free = state.free(ordinal);
            if free > 0 {
                let allocation = free.min(diff);
                new_placements.push(Placement::new(worker_name(pool, ordinal), allocation));
                diff -= allocation;
                state.set_free(ordinal, free - allocation);
            }
            if diff == 0 {
                break;
            }
        }
    }

    (new_placements, diff)
}

/// Shrink `placements` by `diff` vreplicas, draining the highest ordinals
/// first. Placements reduced to zero are dropped.
pub fn remove_replicas(mut diff: i32, placements: &[Placement]) -> Vec<Placement> {
    let mut new_placements = Vec::with_capacity(placements.len());
    for placement in placements.iter().rev() {
        if diff >= placement.vreplicas {
            diff -= placement.vreplicas;
        } else {
            new_placements.push(Placement::new(
                &placement.worker_name,
                placement.vreplicas - diff,
            ));
            diff = 0;
        }
    }
    new_placements
}
