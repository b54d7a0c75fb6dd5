//! Immutable state snapshots.
//!
//! [`StateBuilder`] rebuilds the scheduler's view of the cluster from
//! scratch on every call: per-ordinal free capacity, the last occupied
//! ordinal, and (for spread-aware policies) the failure-domain shape.
//! Reserved placements are folded in so the snapshot reflects what has been
//! promised, not just what has been committed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, warn};

use vgrid_core::inventory::{NodeInventory, VPodLister, WorkerPool};
use vgrid_core::ordinal::{ordinal_from_worker_name, INVALID_ORDINAL};
use vgrid_core::types::SchedulerPolicyType;

use crate::error::{StateError, StateResult};
use crate::reservation::ReservationTable;

/// Snapshot of the cluster at the start of one scheduling call.
///
/// `free[i]` may go negative when a worker is overcommitted; the snapshot
/// records the violation and scheduling continues, since the next observed
/// commit self-heals the view.
#[derive(Debug, Clone)]
pub struct State {
    /// Free capacity per ordinal. Grows on demand; missing ordinals have
    /// `capacity` free.
    pub free: Vec<i32>,
    /// Largest ordinal with at least one vreplica placed, -1 if none.
    pub last_ordinal: i32,
    /// Uniform worker capacity.
    pub capacity: i32,
    /// The built-in strategy this snapshot was built for, if any.
    pub policy: Option<SchedulerPolicyType>,
    /// Distinct zones across schedulable, zone-labeled nodes.
    pub num_zones: i32,
    /// Schedulable, zone-labeled nodes.
    pub num_nodes: i32,
    /// Node name → zone name.
    pub node_to_zone: HashMap<String, String>,
    /// Worker ordinal → node name, for workers with a node assignment.
    pub worker_to_node: HashMap<i32, String>,
}

impl State {
    /// An empty snapshot: nothing placed, no domain information.
    pub fn empty(capacity: i32, policy: Option<SchedulerPolicyType>) -> Self {
        Self {
            free: Vec::new(),
            last_ordinal: -1,
            capacity,
            policy,
            num_zones: 0,
            num_nodes: 0,
            node_to_zone: HashMap::new(),
            worker_to_node: HashMap::new(),
        }
    }

    /// Free capacity at `ordinal`. Ordinals beyond the tracked range are
    /// entirely free.
    pub fn free(&self, ordinal: i32) -> i32 {
        if ordinal < 0 || ordinal as usize >= self.free.len() {
            return self.capacity;
        }
        self.free[ordinal as usize]
    }

    /// Set the free capacity at `ordinal`, growing the tracked range as
    /// needed.
    pub fn set_free(&mut self, ordinal: i32, value: i32) {
        grow(&mut self.free, ordinal, self.capacity);
        self.free[ordinal as usize] = value;
    }

    /// Total free vreplica slots up to and including `last_ordinal`.
    pub fn free_capacity(&self) -> i32 {
        self.free
            .iter()
            .take((self.last_ordinal + 1).max(0) as usize)
            .sum()
    }

    /// Whether any placement (committed or reserved) has been observed.
    pub fn has_placements(&self) -> bool {
        !self.free.is_empty()
    }

    /// Total vreplicas placed (committed plus reserved) across tracked
    /// workers. Overcommitted workers count above capacity.
    pub fn total_placed(&self) -> i32 {
        self.free.iter().map(|free| self.capacity - free).sum()
    }

    /// Number of workers currently carrying at least one vreplica.
    pub fn occupied_workers(&self) -> i32 {
        self.free.iter().filter(|&&f| f != self.capacity).count() as i32
    }

    /// Node the worker at `ordinal` runs on, if known.
    pub fn node_of(&self, ordinal: i32) -> Option<&str> {
        self.worker_to_node.get(&ordinal).map(String::as_str)
    }

    /// Zone the worker at `ordinal` belongs to, if its node is labeled.
    pub fn zone_of(&self, ordinal: i32) -> Option<&str> {
        self.node_of(ordinal)
            .and_then(|node| self.node_to_zone.get(node))
            .map(String::as_str)
    }
}

/// Rebuilds a [`State`] from the listers on every request.
#[derive(Clone)]
pub struct StateBuilder {
    lister: Arc<dyn VPodLister>,
    nodes: Arc<dyn NodeInventory>,
    pool: Arc<dyn WorkerPool>,
    capacity: i32,
    policy: Option<SchedulerPolicyType>,
    /// Node label whose value is the availability zone.
    zone_label: String,
}

impl StateBuilder {
    pub fn new(
        lister: Arc<dyn VPodLister>,
        nodes: Arc<dyn NodeInventory>,
        pool: Arc<dyn WorkerPool>,
        capacity: i32,
        policy: Option<SchedulerPolicyType>,
        zone_label: String,
    ) -> Self {
        Self {
            lister,
            nodes,
            pool,
            capacity,
            policy,
            zone_label,
        }
    }

    /// Build a snapshot, reconciling `reserved` in place: reservations whose
    /// commit has been observed are dropped, the rest count against free
    /// capacity.
    pub fn snapshot(&self, reserved: &mut ReservationTable) -> StateResult<State> {
        let vpods = self.lister.list().map_err(StateError::VPodList)?;

        let mut state = State::empty(self.capacity, self.policy);

        // (vpod, worker) pairs with an observed placement, so reserved-only
        // entries can be applied separately below.
        let mut with_placement: HashMap<_, HashSet<&str>> = HashMap::new();

        for vpod in &vpods {
            let seen = with_placement.entry(&vpod.key).or_default();
            for placement in &vpod.placements {
                let vreplicas =
                    reserved.reconcile(&vpod.key, &placement.worker_name, placement.vreplicas);
                self.account(&mut state, &placement.worker_name, vreplicas);
                seen.insert(placement.worker_name.as_str());
            }
        }

        // Reservations with no observed placement yet.
        for (key, workers) in reserved.iter() {
            for (worker, &vreplicas) in workers {
                let observed = with_placement
                    .get(key)
                    .is_some_and(|seen| seen.contains(worker.as_str()));
                if observed {
                    continue;
                }
                self.account(&mut state, worker, vreplicas);
            }
        }

        // MAXFILLUP is domain-blind; everything else needs the cluster shape.
        if self.policy != Some(SchedulerPolicyType::MaxFillup) {
            self.fill_domains(&mut state)?;
        }

        Ok(state)
    }

    /// Subtract `vreplicas` from the free capacity of `worker`.
    fn account(&self, state: &mut State, worker: &str, vreplicas: i32) {
        let ordinal = ordinal_from_worker_name(worker);
        if ordinal == INVALID_ORDINAL {
            warn!(worker, "ignoring placement with unparseable worker name");
            return;
        }

        grow(&mut state.free, ordinal, self.capacity);
        let idx = ordinal as usize;
        state.free[idx] -= vreplicas;

        if state.free[idx] < 0 {
            // Not fatal. The next observed commit brings the view back to
            // legal; keep the overcommitted value and move on.
            error!(worker, free = state.free[idx], "worker is overcommitted");
        }

        if ordinal > state.last_ordinal && state.free[idx] != self.capacity {
            state.last_ordinal = ordinal;
        }
    }

    fn fill_domains(&self, state: &mut State) -> StateResult<()> {
        let nodes = self.nodes.list().map_err(StateError::NodeList)?;

        let mut zones = HashSet::new();
        for node in nodes {
            if node.unschedulable {
                continue;
            }
            let Some(zone) = node.zone(&self.zone_label).map(str::to_string) else {
                // No zone label: likely a control or test node, excluded
                // from domain math.
                continue;
            };
            zones.insert(zone.clone());
            state.node_to_zone.insert(node.name, zone);
        }
        state.num_nodes = state.node_to_zone.len() as i32;
        state.num_zones = zones.len() as i32;

        let tracked = (state.free.len() as i32).max(self.pool.replicas());
        for ordinal in 0..tracked {
            if let Some(node) = self.pool.node_of(ordinal) {
                state.worker_to_node.insert(ordinal, node);
            }
        }

        debug!(
            num_zones = state.num_zones,
            num_nodes = state.num_nodes,
            "cluster domain state"
        );
        Ok(())
    }
}

fn grow(free: &mut Vec<i32>, ordinal: i32, capacity: i32) {
    while (free.len() as i32) <= ordinal {
        free.push(capacity);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::watch;

    use vgrid_core::config::DEFAULT_ZONE_LABEL;
    use vgrid_core::inventory::{NodeInventory, VPodLister, WorkerPool};
    use vgrid_core::types::{Node, Placement, VPod, VPodKey};

    use super::*;

    struct FakeLister {
        vpods: Vec<VPod>,
    }

    impl VPodLister for FakeLister {
        fn list(&self) -> anyhow::Result<Vec<VPod>> {
            Ok(self.vpods.clone())
        }
    }

    struct FakeNodes {
        nodes: Vec<Node>,
    }

    impl NodeInventory for FakeNodes {
        fn list(&self) -> anyhow::Result<Vec<Node>> {
            Ok(self.nodes.clone())
        }
    }

    struct FakePool {
        replicas: i32,
        nodes: HashMap<i32, String>,
        tx: watch::Sender<i32>,
    }

    impl FakePool {
        fn new(replicas: i32, nodes: HashMap<i32, String>) -> Self {
            let (tx, _) = watch::channel(replicas);
            Self {
                replicas,
                nodes,
                tx,
            }
        }
    }

    #[async_trait]
    impl WorkerPool for FakePool {
        fn replicas(&self) -> i32 {
            self.replicas
        }

        fn node_of(&self, ordinal: i32) -> Option<String> {
            self.nodes.get(&ordinal).cloned()
        }

        async fn resize(&self, _replicas: i32) -> anyhow::Result<()> {
            Ok(())
        }

        fn watch_replicas(&self) -> watch::Receiver<i32> {
            self.tx.subscribe()
        }
    }

    fn builder(
        vpods: Vec<VPod>,
        policy: Option<SchedulerPolicyType>,
        capacity: i32,
    ) -> StateBuilder {
        StateBuilder::new(
            Arc::new(FakeLister { vpods }),
            Arc::new(FakeNodes { nodes: vec![] }),
            Arc::new(FakePool::new(0, HashMap::new())),
            capacity,
            policy,
            DEFAULT_ZONE_LABEL.to_string(),
        )
    }

    fn zoned_node(name: &str, zone_label: &str, zone: &str) -> Node {
        Node {
            name: name.to_string(),
            unschedulable: false,
            labels: HashMap::from([(zone_label.to_string(), zone.to_string())]),
        }
    }

    fn vpod(name: &str, placements: Vec<Placement>) -> VPod {
        VPod::new(VPodKey::new("test-ns", name), total_of(&placements), placements)
    }

    fn total_of(placements: &[Placement]) -> i32 {
        placements.iter().map(|p| p.vreplicas).sum()
    }

    #[test]
    fn no_vpods_yields_empty_state() {
        let b = builder(vec![], Some(SchedulerPolicyType::MaxFillup), 10);
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();

        assert!(state.free.is_empty());
        assert_eq!(state.last_ordinal, -1);
        assert_eq!(state.free_capacity(), 0);
        assert!(!state.has_placements());
    }

    #[test]
    fn single_placement() {
        let b = builder(
            vec![vpod("a", vec![Placement::new("pool-0", 1)])],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();

        assert_eq!(state.free, vec![9]);
        assert_eq!(state.last_ordinal, 0);
        assert_eq!(state.free_capacity(), 9);
    }

    #[test]
    fn many_vpods_no_gaps() {
        let b = builder(
            vec![
                vpod(
                    "a",
                    vec![Placement::new("pool-0", 1), Placement::new("pool-2", 5)],
                ),
                vpod("b", vec![Placement::new("pool-1", 2)]),
                vpod(
                    "c",
                    vec![Placement::new("pool-1", 3), Placement::new("pool-0", 1)],
                ),
            ],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();

        assert_eq!(state.free, vec![8, 5, 5]);
        assert_eq!(state.last_ordinal, 2);
        assert_eq!(state.free_capacity(), 18);
        assert_eq!(state.occupied_workers(), 3);
    }

    #[test]
    fn zero_vreplica_placements_track_but_do_not_occupy() {
        let b = builder(
            vec![
                vpod(
                    "a",
                    vec![Placement::new("pool-0", 1), Placement::new("pool-2", 5)],
                ),
                vpod("b", vec![Placement::new("pool-1", 0)]),
                vpod(
                    "c",
                    vec![Placement::new("pool-1", 0), Placement::new("pool-3", 0)],
                ),
            ],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();

        assert_eq!(state.free, vec![9, 10, 5, 10]);
        assert_eq!(state.last_ordinal, 2);
        assert_eq!(state.occupied_workers(), 2);
    }

    #[test]
    fn reservation_wins_over_stale_commit() {
        let b = builder(
            vec![vpod("a", vec![Placement::new("pool-0", 1)])],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let mut reserved = ReservationTable::new();
        reserved.reserve(&VPodKey::new("test-ns", "a"), "pool-0", 5);

        let state = b.snapshot(&mut reserved).unwrap();

        assert_eq!(state.free, vec![5]);
        // Reservation not yet committed, so it stays.
        assert_eq!(reserved.get(&VPodKey::new("test-ns", "a"), "pool-0"), Some(5));
    }

    #[test]
    fn observed_commit_clears_reservation_within_one_build() {
        let b = builder(
            vec![vpod("a", vec![Placement::new("pool-0", 5)])],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let mut reserved = ReservationTable::new();
        reserved.reserve(&VPodKey::new("test-ns", "a"), "pool-0", 5);

        let state = b.snapshot(&mut reserved).unwrap();

        assert_eq!(state.free, vec![5]);
        assert!(reserved.is_empty());
    }

    #[test]
    fn reserved_only_placements_count_against_capacity() {
        let b = builder(
            vec![vpod("a", vec![Placement::new("pool-0", 1)])],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let mut reserved = ReservationTable::new();
        reserved.reserve(&VPodKey::new("test-ns", "b"), "pool-4", 5);
        reserved.reserve(&VPodKey::new("test-ns", "b"), "pool-0", 2);

        let state = b.snapshot(&mut reserved).unwrap();

        assert_eq!(state.free, vec![7, 10, 10, 10, 5]);
        assert_eq!(state.last_ordinal, 4);
    }

    #[test]
    fn overcommit_is_recorded_not_fatal() {
        let b = builder(
            vec![
                vpod("a", vec![Placement::new("pool-0", 8)]),
                vpod("b", vec![Placement::new("pool-0", 7)]),
            ],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();

        assert_eq!(state.free, vec![-5]);
        assert_eq!(state.last_ordinal, 0);
    }

    #[test]
    fn unparseable_worker_names_are_skipped() {
        let b = builder(
            vec![vpod(
                "a",
                vec![
                    Placement::new("not a worker", 3),
                    Placement::new("pool-1", 2),
                ],
            )],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();

        assert_eq!(state.free, vec![10, 8]);
    }

    #[test]
    fn spread_policy_builds_domain_maps() {
        let mut unschedulable = zoned_node("node-2", DEFAULT_ZONE_LABEL, "zone-c");
        unschedulable.unschedulable = true;
        let nodes = vec![
            zoned_node("node-0", DEFAULT_ZONE_LABEL, "zone-a"),
            zoned_node("node-1", DEFAULT_ZONE_LABEL, "zone-b"),
            unschedulable,
            Node {
                name: "node-3".into(),
                unschedulable: false,
                labels: HashMap::new(),
            },
        ];
        let worker_nodes: HashMap<i32, String> =
            [(0, "node-0".to_string()), (1, "node-1".to_string())].into();

        let b = StateBuilder::new(
            Arc::new(FakeLister {
                vpods: vec![vpod("a", vec![Placement::new("pool-0", 1)])],
            }),
            Arc::new(FakeNodes { nodes }),
            Arc::new(FakePool::new(2, worker_nodes)),
            10,
            Some(SchedulerPolicyType::EvenSpread),
            DEFAULT_ZONE_LABEL.to_string(),
        );
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();

        // Unschedulable and unlabeled nodes are excluded.
        assert_eq!(state.num_zones, 2);
        assert_eq!(state.num_nodes, 2);
        assert_eq!(state.zone_of(0), Some("zone-a"));
        assert_eq!(state.zone_of(1), Some("zone-b"));
        assert_eq!(state.zone_of(7), None);
    }

    #[test]
    fn zone_resolution_uses_the_configured_label() {
        // The node is labeled under a custom key; a builder configured with
        // that key sees the zone, one with the default key does not.
        let nodes = vec![zoned_node("node-0", "failure-domain/zone", "zone-a")];
        let worker_nodes: HashMap<i32, String> = [(0, "node-0".to_string())].into();

        let custom = StateBuilder::new(
            Arc::new(FakeLister { vpods: vec![] }),
            Arc::new(FakeNodes {
                nodes: nodes.clone(),
            }),
            Arc::new(FakePool::new(1, worker_nodes.clone())),
            10,
            Some(SchedulerPolicyType::EvenSpread),
            "failure-domain/zone".to_string(),
        );
        let state = custom.snapshot(&mut ReservationTable::new()).unwrap();
        assert_eq!(state.num_zones, 1);
        assert_eq!(state.zone_of(0), Some("zone-a"));

        let default = StateBuilder::new(
            Arc::new(FakeLister { vpods: vec![] }),
            Arc::new(FakeNodes { nodes }),
            Arc::new(FakePool::new(1, worker_nodes)),
            10,
            Some(SchedulerPolicyType::EvenSpread),
            DEFAULT_ZONE_LABEL.to_string(),
        );
        let state = default.snapshot(&mut ReservationTable::new()).unwrap();
        assert_eq!(state.num_zones, 0);
        assert_eq!(state.zone_of(0), None);
    }

    #[test]
    fn maxfillup_skips_domain_maps() {
        let b = builder(
            vec![vpod("a", vec![Placement::new("pool-0", 1)])],
            Some(SchedulerPolicyType::MaxFillup),
            10,
        );
        let state = b.snapshot(&mut ReservationTable::new()).unwrap();
        assert_eq!(state.num_zones, 0);
        assert!(state.node_to_zone.is_empty());
    }
}
