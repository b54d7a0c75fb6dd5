//! The policy engine: runs filters and scorers over candidate workers.

use std::sync::Arc;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use vgrid_state::State;

use crate::plugin::{FilterPlugin, ScorePlugin, VReplicaRequest, WorkerScore};
use crate::plugins::{
    AvailabilityNodePriority, AvailabilityZonePriority, EvenPodSpread, LowestOrdinalPriority,
    NoMaxResourceCount, PodFitsResources, AVAILABILITY_NODE_PRIORITY, AVAILABILITY_ZONE_PRIORITY,
    EVEN_POD_SPREAD, LOWEST_ORDINAL_PRIORITY, NO_MAX_RESOURCE_COUNT, POD_FITS_RESOURCES,
};
use crate::policy::{PrioritySpec, SchedulerPolicy};
use crate::status::Status;

/// A plugin reported `Error`, aborting the placement in progress.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("filter plugins failed for worker {worker}: {reasons}")]
    Filter { worker: i32, reasons: String },

    #[error("score plugin {plugin} failed: {reasons}")]
    Score { plugin: String, reasons: String },
}

/// Runs a fixed set of filter and score plugins.
///
/// Engines are built explicitly: [`PolicyEngine::from_policy`] resolves
/// built-in plugin names, [`PolicyEngine::new`] accepts arbitrary plugin
/// objects. The mandatory `PodFitsResources` predicate is always present in
/// policy-resolved engines.
pub struct PolicyEngine {
    filters: Vec<Arc<dyn FilterPlugin>>,
    scorers: Vec<(Arc<dyn ScorePlugin>, i64)>,
}

impl PolicyEngine {
    /// Build an engine from explicit plugin objects. The caller is
    /// responsible for including every predicate it wants — nothing is
    /// added implicitly.
    pub fn new(
        filters: Vec<Arc<dyn FilterPlugin>>,
        scorers: Vec<(Arc<dyn ScorePlugin>, i64)>,
    ) -> Self {
        Self { filters, scorers }
    }

    /// Resolve a [`SchedulerPolicy`] against the built-in plugin set.
    ///
    /// An empty predicate list selects the default predicates
    /// (`PodFitsResources`, `NoMaxResourceCount`, `EvenPodSpread`); an empty
    /// priority list selects the default priorities (availability node/zone
    /// and lowest-ordinal, each at weight 1). `PodFitsResources` is
    /// mandatory and prepended when the policy omits it. Unknown names are
    /// skipped with a warning.
    pub fn from_policy(policy: &SchedulerPolicy, max_resource_count: i32) -> Self {
        let mut predicate_names: Vec<String> = if policy.predicates.is_empty() {
            vec![
                POD_FITS_RESOURCES.to_string(),
                NO_MAX_RESOURCE_COUNT.to_string(),
                EVEN_POD_SPREAD.to_string(),
            ]
        } else {
            policy.predicates.iter().map(|p| p.name.clone()).collect()
        };
        if !predicate_names.iter().any(|n| n == POD_FITS_RESOURCES) {
            predicate_names.insert(0, POD_FITS_RESOURCES.to_string());
        }

        let mut filters: Vec<Arc<dyn FilterPlugin>> = Vec::with_capacity(predicate_names.len());
        for name in &predicate_names {
            match name.as_str() {
                POD_FITS_RESOURCES => filters.push(Arc::new(PodFitsResources)),
                NO_MAX_RESOURCE_COUNT => {
                    filters.push(Arc::new(NoMaxResourceCount::new(max_resource_count)))
                }
                EVEN_POD_SPREAD => filters.push(Arc::new(EvenPodSpread)),
                other => warn!(plugin = other, "unknown filter plugin, skipping"),
            }
        }

        let priorities: Vec<PrioritySpec> = if policy.priorities.is_empty() {
            vec![
                PrioritySpec::new(AVAILABILITY_NODE_PRIORITY, 1),
                PrioritySpec::new(AVAILABILITY_ZONE_PRIORITY, 1),
                PrioritySpec::new(LOWEST_ORDINAL_PRIORITY, 1),
            ]
        } else {
            policy.priorities.clone()
        };

        let mut scorers: Vec<(Arc<dyn ScorePlugin>, i64)> = Vec::with_capacity(priorities.len());
        for priority in &priorities {
            match priority.name.as_str() {
                LOWEST_ORDINAL_PRIORITY => {
                    scorers.push((Arc::new(LowestOrdinalPriority), priority.weight))
                }
                AVAILABILITY_ZONE_PRIORITY => {
                    scorers.push((Arc::new(AvailabilityZonePriority), priority.weight))
                }
                AVAILABILITY_NODE_PRIORITY => {
                    scorers.push((Arc::new(AvailabilityNodePriority), priority.weight))
                }
                other => warn!(plugin = other, "unknown score plugin, skipping"),
            }
        }

        Self { filters, scorers }
    }

    pub fn has_score_plugins(&self) -> bool {
        !self.scorers.is_empty()
    }

    /// Run every filter plugin over ordinals `0..replicas` and return the
    /// feasible ones.
    ///
    /// Per ordinal, all filter statuses are merged: `Unschedulable` excludes
    /// the ordinal, `Error` aborts the run.
    pub fn feasible_workers(
        &self,
        state: &State,
        request: &VReplicaRequest<'_>,
        replicas: i32,
    ) -> Result<Vec<i32>, EngineError> {
        let mut feasible = Vec::new();
        for ordinal in 0..replicas {
            let merged = Status::merge(
                self.filters
                    .iter()
                    .map(|plugin| plugin.filter(state, request, ordinal)),
            );
            if merged.is_error() {
                return Err(EngineError::Filter {
                    worker: ordinal,
                    reasons: merged.message(),
                });
            }
            if merged.is_success() {
                feasible.push(ordinal);
            } else {
                debug!(worker = ordinal, reasons = %merged.message(), "worker unschedulable");
            }
        }
        Ok(feasible)
    }

    /// Score every feasible worker: per plugin, score all workers, run the
    /// plugin's normalize pass, then accumulate `score * weight`.
    ///
    /// With no score plugins configured every worker scores 1, leaving the
    /// final selection uniformly random among the feasible set.
    pub fn prioritize(
        &self,
        state: &State,
        request: &VReplicaRequest<'_>,
        feasible: &[i32],
    ) -> Result<Vec<WorkerScore>, EngineError> {
        let mut totals: Vec<WorkerScore> = feasible
            .iter()
            .map(|&ordinal| WorkerScore { ordinal, score: 0 })
            .collect();

        if self.scorers.is_empty() {
            for total in &mut totals {
                total.score = 1;
            }
            return Ok(totals);
        }

        for (plugin, weight) in &self.scorers {
            let mut scores = Vec::with_capacity(feasible.len());
            for &ordinal in feasible {
                let (score, status) = plugin.score(state, request, ordinal);
                if !status.is_success() {
                    return Err(EngineError::Score {
                        plugin: plugin.name().to_string(),
                        reasons: status.message(),
                    });
                }
                scores.push(WorkerScore { ordinal, score });
            }

            let status = plugin.normalize_scores(state, &mut scores);
            if !status.is_success() {
                return Err(EngineError::Score {
                    plugin: plugin.name().to_string(),
                    reasons: status.message(),
                });
            }

            for (total, scored) in totals.iter_mut().zip(&scores) {
                total.score += scored.score * weight;
            }
        }

        Ok(totals)
    }

    /// Pick the highest-scoring worker; ties are broken uniformly at random
    /// in a single reservoir pass.
    pub fn select_worker(scores: &[WorkerScore]) -> Option<i32> {
        let mut rng = rand::thread_rng();

        let first = scores.first()?;
        let mut selected = first.ordinal;
        let mut max_score = first.score;
        let mut ties = 1;

        for candidate in &scores[1..] {
            if candidate.score > max_score {
                max_score = candidate.score;
                selected = candidate.ordinal;
                ties = 1;
            } else if candidate.score == max_score {
                ties += 1;
                if rng.gen_range(0..ties) == 0 {
                    selected = candidate.ordinal;
                }
            }
        }

        Some(selected)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::plugin::FilterPlugin;
    use crate::plugins::testutil::{request, request_key, state_with_free};
    use crate::policy::PredicateSpec;

    struct RejectAll;

    impl FilterPlugin for RejectAll {
        fn name(&self) -> &'static str {
            "RejectAll"
        }

        fn filter(&self, _: &State, _: &VReplicaRequest<'_>, _: i32) -> Status {
            Status::unschedulable("rejected")
        }
    }

    struct FailingFilter;

    impl FilterPlugin for FailingFilter {
        fn name(&self) -> &'static str {
            "FailingFilter"
        }

        fn filter(&self, _: &State, _: &VReplicaRequest<'_>, _: i32) -> Status {
            Status::error("boom")
        }
    }

    #[test]
    fn default_engine_filters_full_workers() {
        let engine = PolicyEngine::from_policy(&SchedulerPolicy::default(), 100);
        let state = state_with_free(vec![0, 4, 10], 10);
        let key = request_key();
        let req = request(&key, 1, &[]);

        let feasible = engine.feasible_workers(&state, &req, 3).unwrap();
        assert_eq!(feasible, vec![1, 2]);
    }

    #[test]
    fn mandatory_predicate_is_prepended() {
        // A policy that only names the spread predicate still rejects full
        // workers.
        let policy = SchedulerPolicy {
            predicates: vec![PredicateSpec::new(EVEN_POD_SPREAD)],
            priorities: vec![],
        };
        let engine = PolicyEngine::from_policy(&policy, 100);
        let state = state_with_free(vec![0], 10);
        let key = request_key();
        let req = request(&key, 1, &[]);

        let feasible = engine.feasible_workers(&state, &req, 1).unwrap();
        assert!(feasible.is_empty());
    }

    #[test]
    fn unschedulable_excludes_error_aborts() {
        let engine = PolicyEngine::new(vec![Arc::new(RejectAll)], vec![]);
        let state = state_with_free(vec![10], 10);
        let key = request_key();
        let req = request(&key, 1, &[]);
        assert!(engine.feasible_workers(&state, &req, 1).unwrap().is_empty());

        let engine = PolicyEngine::new(vec![Arc::new(FailingFilter)], vec![]);
        let err = engine.feasible_workers(&state, &req, 1).unwrap_err();
        assert!(matches!(err, EngineError::Filter { worker: 0, .. }));
    }

    #[test]
    fn prioritize_without_scorers_is_flat() {
        let engine = PolicyEngine::new(vec![], vec![]);
        let state = state_with_free(vec![5, 5], 10);
        let key = request_key();
        let req = request(&key, 1, &[]);

        let scores = engine.prioritize(&state, &req, &[0, 1]).unwrap();
        assert!(scores.iter().all(|s| s.score == 1));
    }

    #[test]
    fn prioritize_weighs_and_sums() {
        let engine = PolicyEngine::new(
            vec![],
            vec![
                (Arc::new(LowestOrdinalPriority), 2),
                (Arc::new(AvailabilityZonePriority), 3),
            ],
        );
        let state = state_with_free(vec![5, 5], 10);
        let key = request_key();
        let req = request(&key, 1, &[]);

        let scores = engine.prioritize(&state, &req, &[0, 1]).unwrap();
        // last_ordinal = 1: lowest-ordinal scores are 300 and 299.
        assert_eq!(scores[0].score, 300 * 2 + 3);
        assert_eq!(scores[1].score, 299 * 2 + 3);
    }

    #[test]
    fn select_prefers_the_maximum() {
        let scores = vec![
            WorkerScore {
                ordinal: 0,
                score: 10,
            },
            WorkerScore {
                ordinal: 1,
                score: 30,
            },
            WorkerScore {
                ordinal: 2,
                score: 20,
            },
        ];
        assert_eq!(PolicyEngine::select_worker(&scores), Some(1));
        assert_eq!(PolicyEngine::select_worker(&[]), None);
    }

    #[test]
    fn select_breaks_ties_across_candidates() {
        let scores = vec![
            WorkerScore {
                ordinal: 0,
                score: 7,
            },
            WorkerScore {
                ordinal: 1,
                score: 7,
            },
        ];

        // Both tied candidates must be selectable.
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(PolicyEngine::select_worker(&scores).unwrap());
        }
        assert_eq!(seen, HashSet::from([0, 1]));
    }
}
