//! Implements centralized storage for metrics of a dry run: how many pods were placed or left
//! pending and statistics over the scores of chosen nodes.

use average::{concatenate, Estimate, Max, Mean, Min, Variance};

use crate::core::scheduler::interface::StatusCode;
use crate::dry_run::PodOutcome;

concatenate!(
    Estimator,
    [Min, min],
    [Max, max],
    [Mean, mean],
    [Variance, population_variance]
);

#[derive(Debug, Default)]
pub struct EstimatorWrapper {
    estimator: Estimator,
}

impl std::fmt::Debug for Estimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Estimator")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("mean", &self.mean)
            .field("population_variance", &self.population_variance)
            .finish()
    }
}

impl EstimatorWrapper {
    pub fn add(&mut self, value: f64) {
        self.estimator.add(value);
    }

    pub fn min(&self) -> f64 {
        self.estimator.min()
    }

    pub fn max(&self) -> f64 {
        self.estimator.max()
    }

    pub fn mean(&self) -> f64 {
        self.estimator.mean()
    }

    pub fn population_variance(&self) -> f64 {
        self.estimator.population_variance()
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    /// The number of nodes in the cluster snapshot.
    pub total_nodes_in_snapshot: u64,
    /// The number of pods in the cluster snapshot, both pending and already placed.
    pub total_pods_in_snapshot: u64,
    pub pods_scheduled: u64,
    /// Pods rejected with a retryable status, e.g. their group has not reached its quorum yet.
    pub pods_unschedulable: u64,
    /// Pods which hit a non-retryable error such as a malformed minAvailable label.
    pub pods_failed: u64,
    pub selected_node_score_stats: EstimatorWrapper,
    pub feasible_nodes_stats: EstimatorWrapper,
}

impl MetricsCollector {
    pub fn record(&mut self, outcome: &PodOutcome) {
        match outcome.status.code {
            StatusCode::Success => {
                self.pods_scheduled += 1;
                if let Some(score) = outcome.node_score {
                    self.selected_node_score_stats.add(score as f64);
                }
                if let Some(feasible_nodes) = outcome.feasible_nodes {
                    self.feasible_nodes_stats.add(feasible_nodes as f64);
                }
            }
            StatusCode::Unschedulable => self.pods_unschedulable += 1,
            StatusCode::Error => self.pods_failed += 1,
        }
    }
}
