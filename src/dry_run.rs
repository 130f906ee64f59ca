//! Represents entry point of a one-shot scheduling pass over a static cluster snapshot.

use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, DryRunConfig};
use crate::core::common::ObjectsInfo;
use crate::core::scheduler::interface::{LookupError, Status};
use crate::core::scheduler::kube_scheduler::KubeScheduler;
use crate::core::scheduler::plugin::Handle;
use crate::metrics::collector::MetricsCollector;
use crate::trace::generic::ClusterSnapshot;

#[derive(Debug, Error)]
pub enum DryRunError {
    #[error("failed to build scheduler: {0}")]
    Config(#[from] ConfigError),
    #[error("objects cache failed: {0}")]
    Cache(#[from] LookupError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodOutcome {
    pub pod_name: String,
    pub status: Status,
    pub node_name: Option<String>,
    pub node_score: Option<i64>,
    pub feasible_nodes: Option<usize>,
}

pub struct DryRun {
    objects: Arc<ObjectsInfo>,
    scheduler: KubeScheduler,
    pub metrics_collector: MetricsCollector,
}

impl DryRun {
    pub fn new(config: &DryRunConfig, snapshot: ClusterSnapshot) -> Result<Self, DryRunError> {
        let objects = Arc::new(snapshot.into_objects_info()?);
        let handle = Handle {
            pod_lister: objects.clone(),
            node_lister: objects.clone(),
        };
        let scheduler = KubeScheduler::new(&config.scheduler, &handle)?;

        let metrics_collector = MetricsCollector {
            total_nodes_in_snapshot: objects.node_count()? as u64,
            total_pods_in_snapshot: objects.pod_count()? as u64,
            ..Default::default()
        };

        Ok(Self {
            objects,
            scheduler,
            metrics_collector,
        })
    }

    pub fn objects(&self) -> &ObjectsInfo {
        &self.objects
    }

    /// Tries to schedule every pending pod once, in pod name order. Placed pods reserve their
    /// requests on the chosen node, so later pods see the reduced allocatable resources.
    pub fn run(&mut self) -> Result<Vec<PodOutcome>, LookupError> {
        let pending_pods = self.objects.pending_pods()?;
        info!("Scheduling {} pending pods", pending_pods.len());

        let mut outcomes = Vec::with_capacity(pending_pods.len());
        for pod in pending_pods {
            let outcome = match self.scheduler.schedule_one(&pod) {
                Ok(result) => {
                    self.objects
                        .assign_pod(&pod.metadata.name, &result.node_name)?;
                    info!(
                        "Pod {} is assigned to node {} with score {}",
                        pod.metadata.name, result.node_name, result.node_score
                    );
                    PodOutcome {
                        pod_name: pod.metadata.name,
                        status: Status::success(),
                        node_name: Some(result.node_name),
                        node_score: Some(result.node_score),
                        feasible_nodes: Some(result.feasible_nodes),
                    }
                }
                Err(err) => {
                    let status = err.status();
                    if status.is_retryable() {
                        info!("Pod {} is unschedulable: {}", pod.metadata.name, err);
                    } else {
                        warn!("Pod {} failed to schedule: {}", pod.metadata.name, err);
                    }
                    PodOutcome {
                        pod_name: pod.metadata.name,
                        status,
                        node_name: None,
                        node_score: None,
                        feasible_nodes: None,
                    }
                }
            };
            self.metrics_collector.record(&outcome);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }
}
