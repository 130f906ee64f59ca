//! Gang admission and memory-aware node scoring plugin.
//!
//! At the PreFilter extension point a pod is admitted only when its pod group already has at
//! least `minAvailable` members. At the Score extension point nodes are ranked by allocatable
//! memory, either preferring the least (bin-packing) or the most (spreading) of it, and the
//! batch of scores is then rescaled to [MIN_NODE_SCORE, MAX_NODE_SCORE].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::core::pod::Pod;
use crate::core::scheduler::interface::{
    NodeLister, NodeScore, PluginError, PodLister, MAX_NODE_SCORE, MIN_NODE_SCORE,
};
use crate::core::scheduler::plugin::{
    Handle, Plugin, PreFilterPlugin, ScoreExtensions, ScorePlugin,
};

pub const CUSTOM_SCHEDULER_NAME: &str = "CustomScheduler";
pub const GROUP_NAME_LABEL: &str = "podGroup";
pub const MIN_AVAILABLE_LABEL: &str = "minAvailable";

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct CustomSchedulerArgs {
    #[serde(default)]
    pub mode: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreMode {
    /// Nodes with less allocatable memory score higher.
    #[default]
    Least,
    /// Nodes with more allocatable memory score higher.
    Most,
}

impl FromStr for ScoreMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Least" => Ok(ScoreMode::Least),
            "Most" => Ok(ScoreMode::Most),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for ScoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreMode::Least => write!(f, "Least"),
            ScoreMode::Most => write!(f, "Most"),
        }
    }
}

pub struct CustomScheduler {
    pod_lister: Arc<dyn PodLister>,
    node_lister: Arc<dyn NodeLister>,
    score_mode: ScoreMode,
}

impl CustomScheduler {
    pub fn new(
        args: Option<&serde_json::Value>,
        pod_lister: Arc<dyn PodLister>,
        node_lister: Arc<dyn NodeLister>,
    ) -> Result<Self, ConfigError> {
        let mode = match args {
            Some(raw) => {
                let args = CustomSchedulerArgs::deserialize(raw).map_err(|source| {
                    ConfigError::InvalidArgs {
                        plugin: CUSTOM_SCHEDULER_NAME.to_string(),
                        source,
                    }
                })?;
                match args.mode {
                    Some(mode) => mode.parse()?,
                    None => ScoreMode::default(),
                }
            }
            None => ScoreMode::default(),
        };
        info!("Custom scheduler runs with the mode: {}.", mode);

        Ok(Self::with_mode(mode, pod_lister, node_lister))
    }

    pub fn with_mode(
        score_mode: ScoreMode,
        pod_lister: Arc<dyn PodLister>,
        node_lister: Arc<dyn NodeLister>,
    ) -> Self {
        Self {
            pod_lister,
            node_lister,
            score_mode,
        }
    }

    pub fn factory(
        args: Option<&serde_json::Value>,
        handle: &Handle,
    ) -> Result<Arc<dyn Plugin>, ConfigError> {
        let plugin = Self::new(
            args,
            handle.pod_lister.clone(),
            handle.node_lister.clone(),
        )?;
        Ok(Arc::new(plugin))
    }

    pub fn score_mode(&self) -> ScoreMode {
        self.score_mode
    }

    /// Group size as seen by the pod: the pod always counts itself exactly once, whether or not
    /// the lister already sees it.
    fn group_members(&self, pod: &Pod, group: &str) -> Result<usize, PluginError> {
        let pods = self
            .pod_lister
            .list_by_group(group)
            .map_err(|source| PluginError::ListPods {
                group: group.to_string(),
                source,
            })?;
        let lists_itself = pods
            .iter()
            .any(|member| member.metadata.name == pod.metadata.name);
        Ok(pods.len() + usize::from(!lists_itself))
    }
}

/// Parses the minAvailable label as a non-negative base-10 integer.
pub fn min_available(pod: &Pod) -> Result<u64, PluginError> {
    let value = pod
        .label(MIN_AVAILABLE_LABEL)
        .ok_or_else(|| PluginError::MissingLabel {
            pod: pod.metadata.name.clone(),
            label: MIN_AVAILABLE_LABEL,
        })?;

    value.parse::<u64>().map_err(|source| match value.parse::<i64>() {
        Ok(n) if n < 0 => PluginError::NegativeMinAvailable {
            value: value.to_string(),
        },
        _ => PluginError::InvalidMinAvailable {
            value: value.to_string(),
            source,
        },
    })
}

/// Rescales scores in place so that the lowest becomes MIN_NODE_SCORE and the highest
/// MAX_NODE_SCORE using truncating division. Equal scores all become MIN_NODE_SCORE.
pub fn normalize_to_range(scores: &mut [NodeScore]) {
    let Some((min, max)) = scores.iter().fold(None, |bounds, node| match bounds {
        None => Some((node.score, node.score)),
        Some((min, max)) => Some((node.score.min(min), node.score.max(max))),
    }) else {
        return;
    };

    // i128 keeps both the range and the multiplication exact for any pair of i64 scores.
    let min = i128::from(min);
    let range = i128::from(max) - min;
    for node in scores.iter_mut() {
        node.score = if range > 0 {
            // (score - min) <= range, so the quotient is within [0, MAX_NODE_SCORE]
            ((i128::from(node.score) - min) * i128::from(MAX_NODE_SCORE) / range) as i64
        } else {
            MIN_NODE_SCORE
        };
    }
}

impl Plugin for CustomScheduler {
    fn name(&self) -> &'static str {
        CUSTOM_SCHEDULER_NAME
    }

    fn as_pre_filter(&self) -> Option<&dyn PreFilterPlugin> {
        Some(self)
    }

    fn as_score(&self) -> Option<&dyn ScorePlugin> {
        Some(self)
    }
}

impl PreFilterPlugin for CustomScheduler {
    fn pre_filter(&self, pod: &Pod) -> Result<(), PluginError> {
        debug!("Pod {} is in PreFilter phase.", pod.metadata.name);

        let min_available = min_available(pod)?;
        let members = match pod.label(GROUP_NAME_LABEL) {
            Some(group) => self.group_members(pod, group)?,
            // ungrouped pod forms a group of its own
            None => 1,
        };

        if (members as u64) < min_available {
            return Err(PluginError::InsufficientGroupMembers {
                group: pod.label(GROUP_NAME_LABEL).unwrap_or_default().to_string(),
                members,
                min_available,
            });
        }
        Ok(())
    }
}

impl ScorePlugin for CustomScheduler {
    fn score(&self, pod: &Pod, node_name: &str) -> Result<i64, PluginError> {
        debug!(
            "Pod {} is in Score phase. Calculate the score of Node {}.",
            pod.metadata.name, node_name
        );

        let node = self
            .node_lister
            .get(node_name)
            .map_err(|source| PluginError::NodeInfo {
                node: node_name.to_string(),
                source,
            })?;
        let ram = node.status.allocatable.ram;
        let allocatable_memory =
            i64::try_from(ram).map_err(|_| PluginError::AllocatableOutOfRange {
                node: node_name.to_string(),
                ram,
            })?;

        Ok(match self.score_mode {
            ScoreMode::Least => -allocatable_memory,
            ScoreMode::Most => allocatable_memory,
        })
    }

    fn score_extensions(&self) -> Option<&dyn ScoreExtensions> {
        Some(self)
    }
}

impl ScoreExtensions for CustomScheduler {
    fn normalize_score(&self, pod: &Pod, scores: &mut [NodeScore]) -> Result<(), PluginError> {
        debug!(
            "Normalizing {} node scores of pod {}.",
            scores.len(),
            pod.metadata.name
        );
        normalize_to_range(scores);
        Ok(())
    }
}
