//! vgrid-autoscale — resizes the worker pool from vreplica demand.
//!
//! The autoscaler wakes every refresh period, or immediately when the
//! scheduler pokes it with a fresh pending total, and drives the pool
//! toward `ceil(required / capacity)` workers:
//!
//! ```text
//! placed   = vreplicas the snapshot accounts for (committed + reserved)
//! required = placed + pending
//! target   = clamp(ceil(required / capacity), min_replicas, max_replicas)
//!
//! target > current:  resize up, nothing evicted
//! target < current:  evict every placement on ordinals >= target,
//!                    then resize down; any eviction failure aborts
//!                    the shrink until the next tick
//! ```

pub mod scaler;

pub use scaler::{Autoscaler, ScaleTrigger};
