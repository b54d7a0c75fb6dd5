//! vgrid-core — shared types for the vgrid virtual-replica scheduler.
//!
//! A *vpod* is a logical workload that wants a number of *vreplicas*
//! (indivisible units of work). Vreplicas are placed onto an ordered pool
//! of workers addressed by integer ordinal, each with the same fixed
//! capacity. This crate holds the vocabulary shared by every other vgrid
//! crate:
//!
//! - **`types`** — `VPod`, `Placement`, `Node`, policy enums
//! - **`ordinal`** — `<pool>-<ordinal>` worker-name encoding
//! - **`inventory`** — traits the scheduler consumes (`VPodLister`,
//!   `NodeInventory`, `WorkerPool`, `Evictor`)
//! - **`config`** — TOML-loadable scheduler configuration

pub mod config;
pub mod inventory;
pub mod ordinal;
pub mod types;

pub use config::SchedulerConfig;
pub use inventory::{Evictor, NodeInventory, VPodLister, WorkerPool};
pub use ordinal::{ordinal_from_worker_name, pool_name, worker_name};
pub use types::{total_vreplicas, Node, Placement, SchedulerPolicyType, VPod, VPodKey};
