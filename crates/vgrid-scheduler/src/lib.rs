//! vgrid-scheduler — places vreplicas onto the worker pool.
//!
//! The [`Scheduler`] is the serialized entry point: one mutex guards every
//! scheduling decision, and a reservation table carries placements that
//! have been returned but not yet observed as committed, so concurrent
//! callers can never overcommit a worker.
//!
//! # Architecture
//!
//! ```text
//! Scheduler::schedule(vpod)
//!   ├── StateBuilder (snapshot: free capacity, domains, reservations)
//!   ├── strategy dispatch
//!   │     ├── MAXFILLUP            (fillup: pack lowest ordinals)
//!   │     ├── EVENSPREAD(_BYNODE)  (spread: balance failure domains)
//!   │     └── policy pipeline      (one vreplica at a time through
//!   │                               filter + score plugins)
//!   ├── sort placements by ordinal
//!   ├── record reservations
//!   └── pending bookkeeping → poke the autoscaler
//! ```

pub mod error;
pub mod fillup;
pub mod scheduler;
pub mod spread;

pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::Scheduler;
