//! Implementation of kube-scheduler pipeline which runs configured plugins to pick a node for a pod.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::custom_scheduler::CUSTOM_SCHEDULER_NAME;
use crate::core::scheduler::interface::{
    NodeLister, NodeScore, NodeScoreList, PluginError, ScheduleError,
};
use crate::core::scheduler::plugin::{Handle, Plugin, FIT_PLUGIN_NAME, PLUGIN_REGISTRY};

pub const DEFAULT_SCHEDULER_NAME: &str = "default_scheduler";
pub const SCHEDULER_NAME_LABEL: &str = "scheduler_name";

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct KubeSchedulerConfig {
    // Profiles are scheduling profiles that kube-scheduler supports. Pods can
    // choose to be scheduled under a particular profile by setting its associated
    // scheduler name in labels. Pods that don't specify any scheduler name are scheduled
    // with the "default_scheduler" profile, if present here.
    pub profiles: Vec<KubeSchedulerProfile>,
}

impl Default for KubeSchedulerConfig {
    fn default() -> Self {
        default_kube_scheduler_config()
    }
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct KubeSchedulerProfile {
    #[serde(default = "default_scheduler_name")]
    pub scheduler_name: String,
    #[serde(default)]
    pub plugins: Plugins,
    // Args passed to plugins on construction, plugins without an entry get no args.
    #[serde(default)]
    pub plugin_config: Vec<PluginConfig>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Clone)]
pub struct Plugins {
    // Each extension point is a list of enabled plugins which are registered globally in plugin registry.
    #[serde(default)]
    pub pre_filter: Vec<PluginRef>,
    #[serde(default)]
    pub filter: Vec<PluginRef>,
    #[serde(default)]
    pub score: Vec<PluginRef>,
}

// PluginRef specifies a plugin name and its weight when applicable.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PluginRef {
    pub name: String,
    // Weight is used only for Score plugins, defaults to 1.
    #[serde(default)]
    pub weight: Option<i64>,
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct PluginConfig {
    pub name: String,
    pub args: serde_json::Value,
}

fn default_scheduler_name() -> String {
    DEFAULT_SCHEDULER_NAME.to_string()
}

fn plugin_ref(name: &str, weight: Option<i64>) -> PluginRef {
    PluginRef {
        name: name.to_string(),
        weight,
    }
}

pub fn default_kube_scheduler_config() -> KubeSchedulerConfig {
    KubeSchedulerConfig {
        profiles: vec![KubeSchedulerProfile {
            scheduler_name: default_scheduler_name(),
            plugins: Plugins {
                pre_filter: vec![plugin_ref(CUSTOM_SCHEDULER_NAME, None)],
                filter: vec![plugin_ref(FIT_PLUGIN_NAME, None)],
                score: vec![plugin_ref(CUSTOM_SCHEDULER_NAME, Some(1))],
            },
            plugin_config: vec![],
        }],
    }
}

/// Instantiated plugins of one profile. A plugin enabled at several extension points is
/// constructed once and shared between them.
struct Framework {
    pre_filter: Vec<Arc<dyn Plugin>>,
    filter: Vec<Arc<dyn Plugin>>,
    score: Vec<(Arc<dyn Plugin>, i64)>,
}

impl Framework {
    fn new(profile: &KubeSchedulerProfile, handle: &Handle) -> Result<Self, ConfigError> {
        let mut instances: HashMap<&str, Arc<dyn Plugin>> = HashMap::new();
        let mut framework = Framework {
            pre_filter: vec![],
            filter: vec![],
            score: vec![],
        };

        for entry in profile.plugins.pre_filter.iter() {
            let plugin = instantiate(&mut instances, &entry.name, profile, handle)?;
            if plugin.as_pre_filter().is_none() {
                return Err(unsupported(entry, "PreFilter"));
            }
            framework.pre_filter.push(plugin);
        }

        for entry in profile.plugins.filter.iter() {
            let plugin = instantiate(&mut instances, &entry.name, profile, handle)?;
            if plugin.as_filter().is_none() {
                return Err(unsupported(entry, "Filter"));
            }
            framework.filter.push(plugin);
        }

        for entry in profile.plugins.score.iter() {
            let plugin = instantiate(&mut instances, &entry.name, profile, handle)?;
            if plugin.as_score().is_none() {
                return Err(unsupported(entry, "Score"));
            }
            let weight = entry.weight.unwrap_or(1);
            if weight <= 0 {
                return Err(ConfigError::InvalidWeight {
                    plugin: entry.name.clone(),
                    weight,
                });
            }
            framework.score.push((plugin, weight));
        }

        Ok(framework)
    }
}

fn instantiate<'a>(
    instances: &mut HashMap<&'a str, Arc<dyn Plugin>>,
    name: &'a str,
    profile: &KubeSchedulerProfile,
    handle: &Handle,
) -> Result<Arc<dyn Plugin>, ConfigError> {
    if let Some(plugin) = instances.get(name) {
        return Ok(plugin.clone());
    }

    let factory = PLUGIN_REGISTRY
        .get(name)
        .ok_or_else(|| ConfigError::UnknownPlugin(name.to_string()))?;
    let args = profile
        .plugin_config
        .iter()
        .find(|config| config.name == name)
        .map(|config| &config.args);
    let plugin = factory(args, handle)?;
    instances.insert(name, plugin.clone());
    Ok(plugin)
}

fn unsupported(entry: &PluginRef, extension_point: &'static str) -> ConfigError {
    ConfigError::UnsupportedExtensionPoint {
        plugin: entry.name.clone(),
        extension_point,
    }
}

fn plugin_error(plugin: &dyn Plugin, error: PluginError) -> ScheduleError {
    ScheduleError::Plugin {
        plugin: plugin.name().to_string(),
        error,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleResult {
    pub node_name: String,
    /// Weighted sum of normalized scores of the chosen node.
    pub node_score: i64,
    /// Number of nodes which passed filtering and were scored.
    pub feasible_nodes: usize,
}

pub struct KubeScheduler {
    profiles: HashMap<String, Framework>,
    node_lister: Arc<dyn NodeLister>,
}

impl KubeScheduler {
    pub fn new(config: &KubeSchedulerConfig, handle: &Handle) -> Result<Self, ConfigError> {
        let mut profiles = HashMap::new();
        for profile in config.profiles.iter() {
            let framework = Framework::new(profile, handle)?;
            if profiles
                .insert(profile.scheduler_name.clone(), framework)
                .is_some()
            {
                return Err(ConfigError::DuplicateProfile(
                    profile.scheduler_name.clone(),
                ));
            }
        }

        Ok(Self {
            profiles,
            node_lister: handle.node_lister.clone(),
        })
    }

    /// Runs PreFilter, Filter, Score and NormalizeScore for the pod and returns the node with the
    /// highest weighted score. Ties are broken in favour of the lexicographically smallest node name.
    pub fn schedule_one(&self, pod: &Pod) -> Result<ScheduleResult, ScheduleError> {
        let profile_name = pod
            .label(SCHEDULER_NAME_LABEL)
            .unwrap_or(DEFAULT_SCHEDULER_NAME);
        let framework = self
            .profiles
            .get(profile_name)
            .ok_or_else(|| ScheduleError::UnknownProfile(profile_name.to_string()))?;

        for plugin in framework.pre_filter.iter() {
            if let Some(pre_filter) = plugin.as_pre_filter() {
                pre_filter
                    .pre_filter(pod)
                    .map_err(|error| plugin_error(plugin.as_ref(), error))?;
            }
        }

        let nodes = self.node_lister.list().map_err(ScheduleError::ListNodes)?;
        if nodes.is_empty() {
            return Err(ScheduleError::NoNodesInCluster);
        }

        let mut feasible_nodes: Vec<&Node> = nodes.iter().collect();
        for plugin in framework.filter.iter() {
            if let Some(filter) = plugin.as_filter() {
                feasible_nodes = filter.filter(pod, feasible_nodes);
            }
        }
        if feasible_nodes.is_empty() {
            return Err(ScheduleError::NoSufficientNodes);
        }

        let mut total_scores: NodeScoreList = feasible_nodes
            .iter()
            .map(|node| NodeScore {
                name: node.metadata.name.clone(),
                score: 0,
            })
            .collect();

        for (plugin, weight) in framework.score.iter() {
            let Some(scorer) = plugin.as_score() else {
                continue;
            };

            let mut scores = feasible_nodes
                .iter()
                .map(|node| -> Result<NodeScore, PluginError> {
                    Ok(NodeScore {
                        name: node.metadata.name.clone(),
                        score: scorer.score(pod, &node.metadata.name)?,
                    })
                })
                .collect::<Result<NodeScoreList, PluginError>>()
                .map_err(|error| plugin_error(plugin.as_ref(), error))?;

            if let Some(extensions) = scorer.score_extensions() {
                extensions
                    .normalize_score(pod, &mut scores)
                    .map_err(|error| plugin_error(plugin.as_ref(), error))?;
            }

            for (total, node) in total_scores.iter_mut().zip(scores.iter()) {
                total.score = total.score.saturating_add(node.score.saturating_mul(*weight));
            }
        }

        debug!(
            "Pod {} total node scores: {:?}",
            pod.metadata.name, total_scores
        );

        let feasible_count = total_scores.len();
        let best = total_scores
            .into_iter()
            .reduce(|best, node| {
                if node.score > best.score || (node.score == best.score && node.name < best.name) {
                    node
                } else {
                    best
                }
            })
            .ok_or(ScheduleError::NoSufficientNodes)?;

        Ok(ScheduleResult {
            node_name: best.name,
            node_score: best.score,
            feasible_nodes: feasible_count,
        })
    }
}
