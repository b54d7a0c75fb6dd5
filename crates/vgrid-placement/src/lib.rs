//! vgrid-placement — pluggable predicates and priorities.
//!
//! The scheduler's pipeline mode places one vreplica at a time: *filter*
//! plugins decide which workers are feasible, *score* plugins rank them.
//! This crate holds the plugin contracts, the tri-valued [`Status`] they
//! report with, the built-in plugin set, and the [`PolicyEngine`] that runs
//! them.
//!
//! There is no global plugin registry. Engines are built explicitly, either
//! from a [`SchedulerPolicy`] naming built-ins ([`PolicyEngine::from_policy`])
//! or from caller-constructed plugin objects ([`PolicyEngine::new`]), which
//! keeps tests deterministic and free of module-initialization effects.

pub mod engine;
pub mod plugin;
pub mod plugins;
pub mod policy;
pub mod status;

pub use engine::{EngineError, PolicyEngine};
pub use plugin::{FilterPlugin, ScorePlugin, VReplicaRequest, WorkerScore};
pub use policy::{
    validate_policy, PolicyError, PredicateSpec, PrioritySpec, SchedulerPolicy, MAX_TOTAL_WEIGHT,
};
pub use status::{Code, Status};
