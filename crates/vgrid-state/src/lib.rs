//! vgrid-state — cluster state snapshots for scheduling decisions.
//!
//! The scheduler never persists its view of the world. Each scheduling call
//! rebuilds an immutable [`State`] snapshot from the vpod lister, folding in
//! *reserved* placements — placements already handed to callers but not yet
//! observed as committed — so concurrent schedulings cannot overcommit a
//! worker.
//!
//! ```text
//! StateBuilder
//!   ├── VPodLister   (committed placements)
//!   ├── ReservationTable (uncommitted placements, reconciled in place)
//!   ├── NodeInventory (zones for failure-domain spread)
//!   └── WorkerPool   (worker → node mapping)
//!         ↓
//!       State { free[], last_ordinal, domains }
//! ```

pub mod error;
pub mod reservation;
pub mod snapshot;

pub use error::{StateError, StateResult};
pub use reservation::{PendingTable, ReservationTable, SchedulerTables, SharedTables};
pub use snapshot::{State, StateBuilder};
