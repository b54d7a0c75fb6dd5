//! Collaborator traits consumed by the scheduler and autoscaler.
//!
//! All listing traits are pure reads over cached data; implementations must
//! not block on remote stores. The async traits (`WorkerPool::resize`,
//! `Evictor::evict`) are the only operations with real I/O behind them, and
//! the core never calls them while holding the scheduling lock.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::types::{Node, Placement, VPod};

/// Snapshot read of all vpods with their committed placements.
pub trait VPodLister: Send + Sync {
    fn list(&self) -> anyhow::Result<Vec<VPod>>;
}

/// Snapshot read of cluster nodes, used for failure-domain accounting.
pub trait NodeInventory: Send + Sync {
    fn list(&self) -> anyhow::Result<Vec<Node>>;
}

/// The ordered worker pool the scheduler places vreplicas onto.
///
/// `replicas` and `node_of` are cached reads; `resize` is the autoscaler's
/// single write path. External resizes surface through `watch_replicas`.
#[async_trait]
pub trait WorkerPool: Send + Sync {
    /// Current number of workers in the pool.
    fn replicas(&self) -> i32;

    /// Name of the node the worker at `ordinal` runs on, if assigned.
    fn node_of(&self, ordinal: i32) -> Option<String>;

    /// Resize the pool to exactly `replicas` workers.
    async fn resize(&self, replicas: i32) -> anyhow::Result<()>;

    /// Observe pool-size changes (external or autoscaler-driven).
    fn watch_replicas(&self) -> watch::Receiver<i32>;
}

/// Removes a placement stranded by a pool scale-down.
///
/// Must be idempotent: the autoscaler retries failed shrinks on its next
/// tick and may evict the same placement again.
#[async_trait]
pub trait Evictor: Send + Sync {
    async fn evict(&self, vpod: &VPod, placement: &Placement) -> anyhow::Result<()>;
}
