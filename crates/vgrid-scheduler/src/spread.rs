//! EVENSPREAD strategies: balance vreplicas across failure domains.
//!
//! A domain is a zone (`EVENSPREAD`) or a node (`EVENSPREAD_BYNODE`). The
//! caller computes `spread_val` — `ceil(desired / domains)` when growing,
//! `floor(desired / domains)` when shrinking — and these functions keep
//! every domain at or under (resp. at or above) that value. Domains are
//! visited in name order so the outcome is deterministic.
//!
//! Placements on workers with no usable domain (no node assignment, or a
//! node without a zone label) are carried through untouched: they cannot
//! participate in domain math.

use std::collections::{BTreeMap, HashMap};

use vgrid_core::ordinal::{ordinal_from_worker_name, worker_name};
use vgrid_core::types::Placement;
use vgrid_state::State;

fn domain_of(state: &State, ordinal: i32, by_node: bool) -> Option<String> {
    if by_node {
        state.node_of(ordinal).map(str::to_string)
    } else {
        state.zone_of(ordinal).map(str::to_string)
    }
}

/// Group placement ordinals by domain name, ascending within each domain.
/// Placements with no resolvable domain are returned separately.
fn placements_by_domain(
    state: &State,
    placements: &[Placement],
    by_node: bool,
) -> (BTreeMap<String, Vec<i32>>, Vec<Placement>) {
    let mut by_domain: BTreeMap<String, Vec<i32>> = BTreeMap::new();
    let mut undomained = Vec::new();

    for placement in placements {
        let ordinal = ordinal_from_worker_name(&placement.worker_name);
        match domain_of(state, ordinal, by_node) {
            Some(domain) => by_domain.entry(domain).or_default().push(ordinal),
            None => undomained.push(placement.clone()),
        }
    }
    for ordinals in by_domain.values_mut() {
        ordinals.sort_unstable();
    }

    (by_domain, undomained)
}

fn total_in_domain(state: &State, placements: &[Placement], domain: &str, by_node: bool) -> i32 {
    placements
        .iter()
        .filter(|p| {
            domain_of(state, ordinal_from_worker_name(&p.worker_name), by_node).as_deref()
                == Some(domain)
        })
        .map(|p| p.vreplicas)
        .sum()
}

fn merge_placement(placements: &mut Vec<Placement>, worker: String, vreplicas: i32) {
    match placements.iter_mut().find(|p| p.worker_name == worker) {
        Some(p) => p.vreplicas += vreplicas,
        None => placements.push(Placement::new(worker, vreplicas)),
    }
}

/// Grow `placements` by `diff` vreplicas without pushing any domain over
/// `spread_val`. Existing placements are topped up first, then free workers
/// in under-target domains. Returns the new list and the unplaced rest.
pub fn add_replicas_even_spread(
    state: &mut State,
    pool: &str,
    replicas: i32,
    mut diff: i32,
    placements: &[Placement],
    spread_val: i32,
    by_node: bool,
) -> (Vec<Placement>, i32) {
    let (by_domain, undomained) = placements_by_domain(state, placements, by_node);
    let by_ordinal: HashMap<i32, &Placement> = placements
        .iter()
        .map(|p| (ordinal_from_worker_name(&p.worker_name), p))
        .collect();

    let mut new_placements = undomained;

    // Top up existing placements, domain by domain.
    for (domain, ordinals) in &by_domain {
        let mut total = total_in_domain(state, placements, domain, by_node);
        for &ordinal in ordinals {
            let placement = by_ordinal[&ordinal];
            let free = state.free(ordinal);
            if diff > 0 && free > 0 && total < spread_val {
                let allocation = diff.min(free.min(spread_val - total));
                new_placements.push(Placement::new(
                    &placement.worker_name,
                    placement.vreplicas + allocation,
                ));
                diff -= allocation;
                total += allocation;
                state.set_free(ordinal, free - allocation);
            } else {
                new_placements.push(placement.clone());
            }
        }
    }

    // Open up new workers, still honoring the per-domain target.
    if diff > 0 {
        for ordinal in 0..replicas {
            let free = state.free(ordinal);
            if free <= 0 {
                continue;
            }
            let Some(domain) = domain_of(state, ordinal, by_node) else {
                continue;
            };
            let total = total_in_domain(state, &new_placements, &domain, by_node);
            if total >= spread_val {
                continue;
            }

            let allocation = diff.min(free.min(spread_val - total));
            if allocation > 0 {
                merge_placement(&mut new_placements, worker_name(pool, ordinal), allocation);
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

/// Shrink `placements` by `diff` vreplicas, draining each domain down to
/// `spread_val`. Within a domain the highest ordinals drain first.
pub fn remove_replicas_even_spread(
    state: &State,
    mut diff: i32,
    placements: &[Placement],
    spread_val: i32,
    by_node: bool,
) -> Vec<Placement> {
    let (by_domain, undomained) = placements_by_domain(state, placements, by_node);
    let by_ordinal: HashMap<i32, &Placement> = placements
        .iter()
        .map(|p| (ordinal_from_worker_name(&p.worker_name), p))
        .collect();

    let mut new_placements = undomained;

    for (domain, ordinals) in &by_domain {
        let mut total = total_in_domain(state, placements, domain, by_node);
        for &ordinal in ordinals.iter().rev() {
            let placement = by_ordinal[&ordinal];
            if diff > 0 && total >= spread_val {
                let deallocation = diff.min(placement.vreplicas.min(total - spread_val));
                if deallocation > 0 && deallocation < placement.vreplicas {
                    new_placements.push(Placement::new(
                        &placement.worker_name,
                        placement.vreplicas - deallocation,
                    ));
                    diff -= deallocation;
                    total -= deallocation;
                } else if deallocation >= placement.vreplicas {
                    // The whole placement goes.
                    diff -= placement.vreplicas;
                    total -= placement.vreplicas;
                } else {
                    new_placements.push(placement.clone());
                }
            } else {
                new_placements.push(placement.clone());
            }
        }
    }

    new_placements
}
