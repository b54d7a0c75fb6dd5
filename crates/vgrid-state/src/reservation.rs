//! Reservation and pending bookkeeping.
//!
//! A *reservation* is a placement the scheduler returned to a caller that
//! has not yet shown up in the vpod lister. Until the commit is observed,
//! the reserved value is what counts against worker capacity. *Pending* is
//! the opposite side of the ledger: vreplicas that could not be placed at
//! all, fuel for the autoscaler.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use vgrid_core::types::VPodKey;

/// Uncommitted placements, keyed by vpod then worker name.
///
/// Entries hold the full reserved vreplica value for a (vpod, worker) pair,
/// not a delta. They are reconciled against observed commits on every state
/// build and vanish once the commit catches up.
#[derive(Debug, Default, Clone)]
pub struct ReservationTable {
    entries: HashMap<VPodKey, HashMap<String, i32>>,
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `vreplicas` as reserved for `worker` on behalf of `key`.
    pub fn reserve(&mut self, key: &VPodKey, worker: &str, vreplicas: i32) {
        self.entries
            .entry(key.clone())
            .or_default()
            .insert(worker.to_string(), vreplicas);
    }

    /// Reserved vreplicas for a (vpod, worker) pair, if any.
    pub fn get(&self, key: &VPodKey, worker: &str) -> Option<i32> {
        self.entries.get(key).and_then(|m| m.get(worker)).copied()
    }

    /// Reconcile an observed committed value against this table and return
    /// the effective vreplica count to account for.
    ///
    /// - observed < reserved: the commit lags; the reservation wins.
    /// - observed >= reserved: the commit caught up (or surpassed a stale
    ///   reservation); the entry is dropped and the observation wins.
    pub fn reconcile(&mut self, key: &VPodKey, worker: &str, committed: i32) -> i32 {
        let Some(workers) = self.entries.get_mut(key) else {
            return committed;
        };
        let Some(&reserved) = workers.get(worker) else {
            return committed;
        };

        if committed < reserved {
            reserved
        } else {
            workers.remove(worker);
            if workers.is_empty() {
                self.entries.remove(key);
            }
            committed
        }
    }

    /// Iterate over all reserved (vpod, worker → vreplicas) entries.
    pub fn iter(&self) -> impl Iterator<Item = (&VPodKey, &HashMap<String, i32>)> {
        self.entries.iter()
    }

    /// Drop all reservations for a vpod (e.g. when it is deleted).
    pub fn remove_vpod(&mut self, key: &VPodKey) {
        self.entries.remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Vreplicas that could not be scheduled for lack of capacity.
#[derive(Debug, Default, Clone)]
pub struct PendingTable {
    entries: HashMap<VPodKey, i32>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &VPodKey, vreplicas: i32) {
        self.entries.insert(key.clone(), vreplicas);
    }

    pub fn clear(&mut self, key: &VPodKey) {
        self.entries.remove(key);
    }

    pub fn get(&self, key: &VPodKey) -> i32 {
        self.entries.get(key).copied().unwrap_or(0)
    }

    /// Total pending vreplicas across all vpods.
    pub fn total(&self) -> i32 {
        self.entries.values().sum()
    }
}

/// Scheduler bookkeeping the autoscaler reads too, guarded by one lock.
///
/// The scheduler mutates all three fields while scheduling; the autoscaler
/// takes the same lock to read pending demand and reconcile reservations
/// when it snapshots state. Neither holds the lock across I/O.
#[derive(Debug, Default)]
pub struct SchedulerTables {
    /// Cached worker pool size, updated by the pool watcher.
    pub replicas: i32,
    /// Placements returned but not yet observed as committed.
    pub reserved: ReservationTable,
    /// Vreplicas that could not be placed, per vpod.
    pub pending: PendingTable,
}

impl SchedulerTables {
    pub fn with_replicas(replicas: i32) -> Self {
        Self {
            replicas,
            ..Self::default()
        }
    }

    pub fn shared(self) -> SharedTables {
        Arc::new(Mutex::new(self))
    }
}

/// Handle to [`SchedulerTables`] shared between scheduler and autoscaler.
pub type SharedTables = Arc<Mutex<SchedulerTables>>;
