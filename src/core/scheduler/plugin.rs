use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::config::ConfigError;
use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::custom_scheduler::{CustomScheduler, CUSTOM_SCHEDULER_NAME};
use crate::core::scheduler::interface::{NodeLister, NodeScore, PluginError, PodLister};

pub const FIT_PLUGIN_NAME: &str = "Fit";

/// Listers which the host hands to plugin constructors. Plugins keep only the ones they need.
#[derive(Clone)]
pub struct Handle {
    pub pod_lister: Arc<dyn PodLister>,
    pub node_lister: Arc<dyn NodeLister>,
}

/// Builds a plugin from its optional untyped args.
pub type PluginFactory = fn(Option<&serde_json::Value>, &Handle) -> Result<Arc<dyn Plugin>, ConfigError>;

lazy_static! {
    pub static ref PLUGIN_REGISTRY: HashMap<&'static str, PluginFactory> = {
        HashMap::from([
            (FIT_PLUGIN_NAME, new_fit as PluginFactory),
            (
                CUSTOM_SCHEDULER_NAME,
                CustomScheduler::factory as PluginFactory,
            ),
        ])
    };
}

/// Every plugin exposes the extension points it implements, the rest stay None.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn as_pre_filter(&self) -> Option<&dyn PreFilterPlugin> {
        None
    }

    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        None
    }

    fn as_score(&self) -> Option<&dyn ScorePlugin> {
        None
    }
}

pub trait PreFilterPlugin: Plugin {
    fn pre_filter(&self, pod: &Pod) -> Result<(), PluginError>;
}

pub trait FilterPlugin: Plugin {
    fn filter<'a>(&self, pod: &Pod, nodes: Vec<&'a Node>) -> Vec<&'a Node>;
}

pub trait ScorePlugin: Plugin {
    fn score(&self, pod: &Pod, node_name: &str) -> Result<i64, PluginError>;

    fn score_extensions(&self) -> Option<&dyn ScoreExtensions> {
        None
    }
}

pub trait ScoreExtensions {
    /// Called once per pod with scores of all nodes computed in the same scheduling round.
    fn normalize_score(&self, pod: &Pod, scores: &mut [NodeScore]) -> Result<(), PluginError>;
}

// Fit is a plugin that checks if a node has sufficient resources.
pub struct Fit {}

fn new_fit(_args: Option<&serde_json::Value>, _handle: &Handle) -> Result<Arc<dyn Plugin>, ConfigError> {
    Ok(Arc::new(Fit {}))
}

impl Plugin for Fit {
    fn name(&self) -> &'static str {
        FIT_PLUGIN_NAME
    }

    fn as_filter(&self) -> Option<&dyn FilterPlugin> {
        Some(self)
    }
}

impl FilterPlugin for Fit {
    fn filter<'a>(&self, pod: &Pod, nodes: Vec<&'a Node>) -> Vec<&'a Node> {
        nodes
            .into_iter()
            .filter(|&node| {
                pod.spec.resources.requests.cpu <= node.status.allocatable.cpu
                    && pod.spec.resources.requests.ram <= node.status.allocatable.ram
            })
            .collect()
    }
}
