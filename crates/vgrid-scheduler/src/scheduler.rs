//! The scheduling facade.
//!
//! One mutex serializes every scheduling decision. Inside the critical
//! section the scheduler only does bounded in-memory work against cached
//! listers; resizes and evictions belong to the autoscaler and happen
//! elsewhere.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use vgrid_autoscale::ScaleTrigger;
use vgrid_core::config::SchedulerConfig;
use vgrid_core::inventory::{NodeInventory, VPodLister, WorkerPool};
use vgrid_core::ordinal::{ordinal_from_worker_name, worker_name};
use vgrid_core::types::{total_vreplicas, Placement, SchedulerPolicyType, VPod};
use vgrid_placement::{validate_policy, PolicyEngine, SchedulerPolicy, VReplicaRequest};
use vgrid_state::{SchedulerTables, SharedTables, StateBuilder};

use crate::error::{SchedulerError, SchedulerResult};
use crate::{fillup, spread};

/// Places vreplicas for one worker pool.
///
/// `schedule` is safe to call from concurrent tasks on behalf of different
/// vpods; the internal mutex serializes them and the reservation table
/// keeps later calls from reusing capacity promised to earlier ones.
pub struct Scheduler {
    pool_name: String,
    policy_type: Option<SchedulerPolicyType>,
    policy: SchedulerPolicy,
    engine: PolicyEngine,
    state_builder: StateBuilder,
    pool: Arc<dyn WorkerPool>,
    trigger: Option<Arc<dyn ScaleTrigger>>,
    tables: SharedTables,
}

impl Scheduler {
    pub fn new(
        config: &SchedulerConfig,
        policy: SchedulerPolicy,
        lister: Arc<dyn VPodLister>,
        nodes: Arc<dyn NodeInventory>,
        pool: Arc<dyn WorkerPool>,
    ) -> Self {
        let engine = PolicyEngine::from_policy(&policy, config.max_resource_count);
        let state_builder = StateBuilder::new(
            lister,
            nodes,
            pool.clone(),
            config.capacity,
            config.policy,
            config.zone_label.clone(),
        );
        let tables = SchedulerTables::with_replicas(pool.replicas()).shared();

        Self {
            pool_name: config.pool_name.clone(),
            policy_type: config.policy,
            policy,
            engine,
            state_builder,
            pool,
            trigger: None,
            tables,
        }
    }

    /// Wire in the autoscaler poke. Without one, pending demand is only
    /// picked up on the autoscaler's periodic refresh.
    pub fn with_trigger(mut self, trigger: Arc<dyn ScaleTrigger>) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Replace the policy engine, e.g. to inject custom plugins.
    pub fn with_engine(mut self, engine: PolicyEngine) -> Self {
        self.engine = engine;
        self
    }

    /// The bookkeeping tables this scheduler maintains, for sharing with
    /// the autoscaler.
    pub fn tables(&self) -> SharedTables {
        self.tables.clone()
    }

    /// Compute the placement list satisfying `vpod`'s desired vreplicas.
    ///
    /// Returns placements sorted by ordinal. On partial placement the
    /// error ([`SchedulerError::NotEnoughReplicas`] or
    /// [`SchedulerError::PluginFailed`]) carries what did fit; those
    /// placements are reserved and should be committed by the caller.
    pub async fn schedule(&self, vpod: &VPod) -> SchedulerResult<Vec<Placement>> {
        let mut tables = self.tables.lock().await;

        match self.schedule_vpod(&mut tables, vpod) {
            Ok(placements) => Ok(self.finalize(&mut tables, vpod, placements)),
            Err(SchedulerError::NotEnoughReplicas { placements, left }) => {
                let placements = self.finalize(&mut tables, vpod, placements);
                Err(SchedulerError::NotEnoughReplicas { placements, left })
            }
            Err(SchedulerError::PluginFailed {
                placements,
                left,
                source,
            }) => {
                let placements = self.finalize(&mut tables, vpod, placements);
                Err(SchedulerError::PluginFailed {
                    placements,
                    left,
                    source,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Total vreplicas currently waiting for capacity.
    pub async fn pending_vreplicas(&self) -> i32 {
        self.tables.lock().await.pending.total()
    }

    /// Forget a deleted vpod's reservations and pending demand.
    pub async fn forget(&self, vpod: &VPod) {
        let mut tables = self.tables.lock().await;
        tables.reserved.remove_vpod(&vpod.key);
        tables.pending.clear(&vpod.key);
    }

    /// Apply an observed worker pool size.
    pub async fn observe_replicas(&self, replicas: i32) {
        let mut tables = self.tables.lock().await;
        let replicas = replicas.max(0);
        if tables.replicas != replicas {
            tables.replicas = replicas;
            info!(replicas, "worker pool replicas updated");
        }
    }

    /// Watch the worker pool for size changes until `shutdown` signals.
    pub fn spawn_pool_watcher(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        let mut replicas_rx = scheduler.pool.watch_replicas();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = replicas_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let replicas = *replicas_rx.borrow_and_update();
                        scheduler.observe_replicas(replicas).await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    /// Sort canonically and record reservations for anything that grew.
    fn finalize(
        &self,
        tables: &mut SchedulerTables,
        vpod: &VPod,
        mut placements: Vec<Placement>,
    ) -> Vec<Placement> {
        placements.sort_by_key(|p| ordinal_from_worker_name(&p.worker_name));
        reserve_placements(tables, vpod, &placements);
        placements
    }

    fn schedule_vpod(
        &self,
        tables: &mut SchedulerTables,
        vpod: &VPod,
    ) -> SchedulerResult<Vec<Placement>> {
        let key = &vpod.key;
        info!(vpod = %key, desired = vpod.vreplicas, "scheduling");

        let mut state = self.state_builder.snapshot(&mut tables.reserved)?;

        let placements = vpod.placements.clone();
        let committed = total_vreplicas(&placements);

        // Exact number of vreplicas: nothing to do.
        if committed == vpod.vreplicas {
            debug!(vpod = %key, "already fully scheduled");
            tables.pending.clear(key);
            return Ok(placements);
        }

        let (placements, left) = if let Some(policy) = self.policy_type {
            if committed > vpod.vreplicas {
                info!(vpod = %key, committed, desired = vpod.vreplicas, "scaling down");
                let placements = match policy {
                    SchedulerPolicyType::MaxFillup => {
                        fillup::remove_replicas(committed - vpod.vreplicas, &placements)
                    }
                    SchedulerPolicyType::EvenSpread | SchedulerPolicyType::EvenSpreadByNode => {
                        let by_node = policy == SchedulerPolicyType::EvenSpreadByNode;
                        let domains = if by_node { state.num_nodes } else { state.num_zones };
                        if domains <= 0 {
                            warn!(vpod = %key, "no usable failure domains, leaving placements unchanged");
                            placements
                        } else {
                            // Minimum vreplicas each domain keeps, for availability.
                            let spread_val = vpod.vreplicas / domains;
                            debug!(vpod = %key, spread_val, "vreplica floor per domain");
                            spread::remove_replicas_even_spread(
                                &state,
                                committed - vpod.vreplicas,
                                &placements,
                                spread_val,
                                by_node,
                            )
                        }
                    }
                };
                // Scale-down never triggers the autoscaler.
                (placements, 0)
            } else {
                info!(vpod = %key, committed, desired = vpod.vreplicas, "scaling up");
                let needed = vpod.vreplicas - committed;
                match policy {
                    SchedulerPolicyType::MaxFillup => fillup::add_replicas(
                        &mut state,
                        &self.pool_name,
                        tables.replicas,
                        needed,
                        &placements,
                    ),
                    SchedulerPolicyType::EvenSpread | SchedulerPolicyType::EvenSpreadByNode => {
                        let by_node = policy == SchedulerPolicyType::EvenSpreadByNode;
                        let domains = if by_node { state.num_nodes } else { state.num_zones };
                        if domains <= 0 {
                            warn!(vpod = %key, "no usable failure domains, request stays pending");
                            (placements, needed)
                        } else {
                            // Maximum vreplicas each domain may hold.
                            let spread_val = (vpod.vreplicas + domains - 1) / domains;
                            debug!(vpod = %key, spread_val, "vreplica cap per domain");
                            spread::add_replicas_even_spread(
                                &mut state,
                                &self.pool_name,
                                tables.replicas,
                                needed,
                                &placements,
                                spread_val,
                                by_node,
                            )
                        }
                    }
                }
            }
        } else {
            // Pipeline mode: predicates and priorities drive placement.
            validate_policy(&self.policy)?;

            if committed > vpod.vreplicas {
                info!(vpod = %key, committed, desired = vpod.vreplicas, "scaling down");
                (
                    fillup::remove_replicas(committed - vpod.vreplicas, &placements),
                    0,
                )
            } else {
                info!(vpod = %key, committed, desired = vpod.vreplicas, "scaling up");
                let (placements, left, engine_err) = self.add_replicas_with_policy(
                    tables,
                    vpod,
                    vpod.vreplicas - committed,
                    placements,
                );
                if let Some(source) = engine_err {
                    tables.pending.set(key, left);
                    self.poke_autoscaler(tables);
                    return Err(SchedulerError::PluginFailed {
                        placements,
                        left,
                        source,
                    });
                }
                (placements, left)
            }
        };

        if left > 0 {
            // Give the autoscaler time to do its job.
            info!(vpod = %key, left, "scheduling incomplete, not enough worker replicas");
            tables.pending.set(key, left);
            self.poke_autoscaler(tables);
            return Err(SchedulerError::NotEnoughReplicas { placements, left });
        }

        info!(vpod = %key, placements = placements.len(), "scheduling successful");
        tables.pending.clear(key);
        Ok(placements)
    }

    /// Place `needed` vreplicas one at a time through the plugin pipeline.
    ///
    /// Each iteration re-snapshots state so it sees the reservation made for
    /// the previous vreplica. Returns the placements, how many vreplicas are
    /// still unplaced, and the engine error if a plugin aborted the run.
    fn add_replicas_with_policy(
        &self,
        tables: &mut SchedulerTables,
        vpod: &VPod,
        needed: i32,
        mut placements: Vec<Placement>,
    ) -> (Vec<Placement>, i32, Option<vgrid_placement::EngineError>) {
        let mut left = needed;

        for _ in 0..needed {
            let state = match self.state_builder.snapshot(&mut tables.reserved) {
                Ok(state) => state,
                Err(e) => {
                    warn!(vpod = %vpod.key, error = %e, "state refresh failed mid-pipeline (will retry)");
                    break;
                }
            };

            if tables.replicas == 0 {
                debug!(vpod = %vpod.key, "no workers in pool");
                break;
            }

            let request = VReplicaRequest {
                key: &vpod.key,
                desired: vpod.vreplicas,
                placements: &placements,
            };

            let feasible = match self.engine.feasible_workers(&state, &request, tables.replicas) {
                Ok(feasible) => feasible,
                Err(e) => return (placements, left, Some(e)),
            };
            if feasible.is_empty() {
                debug!(vpod = %vpod.key, "no feasible workers for vreplica");
                break;
            }

            let selected = if feasible.len() == 1 {
                feasible[0]
            } else {
                let scores = match self.engine.prioritize(&state, &request, &feasible) {
                    Ok(scores) => scores,
                    Err(e) => return (placements, left, Some(e)),
                };
                match PolicyEngine::select_worker(&scores) {
                    Some(ordinal) => ordinal,
                    None => break,
                }
            };

            debug!(vpod = %vpod.key, worker = selected, "selected worker for vreplica");
            add_selection(&mut placements, &worker_name(&self.pool_name, selected));
            // Reserve immediately so the next snapshot sees this vreplica.
            reserve_placements(tables, vpod, &placements);
            left -= 1;
        }

        (placements, left, None)
    }

    fn poke_autoscaler(&self, tables: &SchedulerTables) {
        if let Some(trigger) = &self.trigger {
            trigger.autoscale(tables.pending.total());
        }
    }
}

/// Record every placement that exceeds the committed value.
///
/// The full new value is tracked, not the delta: by the next snapshot some
/// of it may have committed, and `max(committed, reserved)` must still
/// account for the rest.
fn reserve_placements(tables: &mut SchedulerTables, vpod: &VPod, placements: &[Placement]) {
    for placement in placements {
        let committed = vpod
            .placements
            .iter()
            .find(|existing| existing.worker_name == placement.worker_name)
            .map_or(0, |existing| existing.vreplicas);

        if placement.vreplicas > committed {
            tables
                .reserved
                .reserve(&vpod.key, &placement.worker_name, placement.vreplicas);
        }
    }
}

/// Add one vreplica for `worker` to the placement list.
fn add_selection(placements: &mut Vec<Placement>, worker: &str) {
    match placements.iter_mut().find(|p| p.worker_name == worker) {
        Some(placement) => placement.vreplicas += 1,
        None => placements.push(Placement::new(worker, 1)),
    }
}
