//! The autoscaler control loop.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info, warn};

use vgrid_core::config::SchedulerConfig;
use vgrid_core::inventory::{Evictor, NodeInventory, VPodLister, WorkerPool};
use vgrid_core::ordinal::{ordinal_from_worker_name, INVALID_ORDINAL};
use vgrid_core::types::VPod;
use vgrid_state::{SharedTables, StateBuilder};

/// Wakes the autoscaler with the scheduler's current pending total.
///
/// Kept as a trait so the scheduler can be tested without a pool behind it.
pub trait ScaleTrigger: Send + Sync {
    fn autoscale(&self, pending: i32);
}

/// Periodically resizes the worker pool to match vreplica demand.
///
/// Demand is what the snapshot accounts for — committed plus reserved
/// placements — plus the pending vreplicas the scheduler could not place.
/// Pending and reservations are read from the tables shared with the
/// scheduler, under the shared lock; pool I/O happens after it is released.
pub struct Autoscaler {
    capacity: i32,
    min_replicas: i32,
    max_replicas: i32,
    refresh_period: Duration,
    lister: Arc<dyn VPodLister>,
    pool: Arc<dyn WorkerPool>,
    evictor: Arc<dyn Evictor>,
    state_builder: StateBuilder,
    tables: SharedTables,
    /// Pending total reported by the latest poke, for observability.
    poked_pending: AtomicI32,
    wakeup: Notify,
}

impl Autoscaler {
    pub fn new(
        config: &SchedulerConfig,
        lister: Arc<dyn VPodLister>,
        nodes: Arc<dyn NodeInventory>,
        pool: Arc<dyn WorkerPool>,
        evictor: Arc<dyn Evictor>,
        tables: SharedTables,
    ) -> Self {
        let state_builder = StateBuilder::new(
            lister.clone(),
            nodes,
            pool.clone(),
            config.capacity,
            config.policy,
            config.zone_label.clone(),
        );
        Self {
            capacity: config.capacity,
            min_replicas: config.min_replicas,
            max_replicas: config.max_replicas,
            refresh_period: config.refresh_period(),
            lister,
            pool,
            evictor,
            state_builder,
            tables,
            poked_pending: AtomicI32::new(0),
            wakeup: Notify::new(),
        }
    }

    /// Run until `shutdown` signals. A tick in flight when the signal
    /// arrives completes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            refresh_period_secs = self.refresh_period.as_secs(),
            "autoscaler started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.refresh_period) => {}
                _ = self.wakeup.notified() => {}
                _ = shutdown.changed() => {
                    info!("autoscaler shutting down");
                    break;
                }
            }

            if let Err(e) = self.tick().await {
                error!(error = %e, "autoscale tick failed");
            }
        }
    }

    /// One evaluation: compute the target pool size and act on it.
    pub async fn tick(&self) -> anyhow::Result<()> {
        // Bounded in-memory work under the shared lock, no I/O.
        let (placed, pending, free_capacity) = {
            let mut tables = self.tables.lock().await;
            let pending = tables.pending.total();
            let state = self.state_builder.snapshot(&mut tables.reserved)?;
            (state.total_placed(), pending, state.free_capacity())
        };

        let required = placed + pending;
        let target =
            ceil_div(required, self.capacity).clamp(self.min_replicas, self.max_replicas);
        let current = self.pool.replicas();

        debug!(
            placed,
            pending,
            free_capacity,
            poked = self.poked_pending.load(Ordering::Relaxed),
            target,
            current,
            "autoscale evaluation"
        );

        if target > current {
            info!(from = current, to = target, "scaling worker pool up");
            self.pool.resize(target).await.context("resizing pool up")?;
        } else if target < current {
            // Strand nothing: evict everything above the new last ordinal
            // before the pool shrinks under it.
            let vpods = self.lister.list().context("listing vpods")?;
            if let Err(e) = self.evict_above(&vpods, target).await {
                warn!(error = %e, target, "eviction failed, aborting shrink for this tick");
                return Ok(());
            }
            info!(from = current, to = target, "scaling worker pool down");
            self.pool
                .resize(target)
                .await
                .context("resizing pool down")?;
        }

        Ok(())
    }

    async fn evict_above(&self, vpods: &[VPod], target: i32) -> anyhow::Result<()> {
        for vpod in vpods {
            for placement in &vpod.placements {
                let ordinal = ordinal_from_worker_name(&placement.worker_name);
                if ordinal == INVALID_ORDINAL || ordinal < target {
                    continue;
                }
                self.evictor
                    .evict(vpod, placement)
                    .await
                    .with_context(|| {
                        format!("evicting {} from {}", vpod.key, placement.worker_name)
                    })?;
                debug!(vpod = %vpod.key, worker = %placement.worker_name, "evicted placement");
            }
        }
        Ok(())
    }
}

impl ScaleTrigger for Autoscaler {
    fn autoscale(&self, pending: i32) {
        self.poked_pending.store(pending, Ordering::Relaxed);
        self.wakeup.notify_one();
    }
}

fn ceil_div(value: i32, divisor: i32) -> i32 {
    (value + divisor - 1) / divisor
}
