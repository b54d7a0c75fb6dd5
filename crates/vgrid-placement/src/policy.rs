//! Scheduler policy configuration and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exclusive upper bound on a single priority weight.
pub const MAX_TOTAL_WEIGHT: i64 = 100;

/// Names the predicates and weighted priorities the pipeline runs.
///
/// Empty lists select the default built-in sets (see
/// [`PolicyEngine::from_policy`](crate::PolicyEngine::from_policy)).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerPolicy {
    #[serde(default)]
    pub predicates: Vec<PredicateSpec>,
    #[serde(default)]
    pub priorities: Vec<PrioritySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateSpec {
    pub name: String,
}

impl PredicateSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrioritySpec {
    pub name: String,
    pub weight: i64,
}

impl PrioritySpec {
    pub fn new(name: impl Into<String>, weight: i64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// A policy that fails validation, with every problem found.
#[derive(Debug, Error)]
#[error("invalid scheduler policy: {}", problems.join("; "))]
pub struct PolicyError {
    pub problems: Vec<String>,
}

/// Check every priority weight is in `(0, MAX_TOTAL_WEIGHT)`.
pub fn validate_policy(policy: &SchedulerPolicy) -> Result<(), PolicyError> {
    let problems: Vec<String> = policy
        .priorities
        .iter()
        .filter(|p| p.weight <= 0 || p.weight >= MAX_TOTAL_WEIGHT)
        .map(|p| {
            format!(
                "priority {} has weight {}, want 0 < weight < {}",
                p.name, p.weight, MAX_TOTAL_WEIGHT
            )
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PolicyError { problems })
    }
}
