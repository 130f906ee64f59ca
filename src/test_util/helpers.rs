use std::sync::Arc;

use crate::config::DryRunConfig;
use crate::core::common::ObjectsInfo;
use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::custom_scheduler::{GROUP_NAME_LABEL, MIN_AVAILABLE_LABEL};
use crate::core::scheduler::interface::{LookupError, NodeLister, PodLister};
use crate::core::scheduler::plugin::Handle;

pub fn group_pod(name: &str, group: Option<&str>, min_available: Option<&str>) -> Pod {
    let mut pod = Pod::new(name.to_string(), 1000, 1073741824);
    if let Some(group) = group {
        pod = pod.with_label(GROUP_NAME_LABEL, group);
    }
    if let Some(min_available) = min_available {
        pod = pod.with_label(MIN_AVAILABLE_LABEL, min_available);
    }
    pod
}

pub fn memory_node(name: &str, ram: u64) -> Node {
    Node::new(name.to_string(), 16000, ram)
}

pub fn objects_with(nodes: Vec<Node>, pods: Vec<Pod>) -> Arc<ObjectsInfo> {
    let objects = Arc::new(ObjectsInfo::new());
    for node in nodes {
        objects.add_node(node).unwrap();
    }
    for pod in pods {
        objects.add_pod(pod).unwrap();
    }
    objects
}

pub fn handle(objects: &Arc<ObjectsInfo>) -> Handle {
    Handle {
        pod_lister: objects.clone(),
        node_lister: objects.clone(),
    }
}

/// Lister whose backend is always down.
pub struct UnavailableLister {}

impl PodLister for UnavailableLister {
    fn list_by_group(&self, _group: &str) -> Result<Vec<Pod>, LookupError> {
        Err(LookupError::Unavailable("backend is down".to_string()))
    }
}

impl NodeLister for UnavailableLister {
    fn get(&self, _node_name: &str) -> Result<Node, LookupError> {
        Err(LookupError::Unavailable("backend is down".to_string()))
    }

    fn list(&self) -> Result<Vec<Node>, LookupError> {
        Err(LookupError::Unavailable("backend is down".to_string()))
    }
}

pub fn default_test_dry_run_config(with_suffix: Option<&str>) -> DryRunConfig {
    let mut default = r#"
    metrics_printer:
      format: JSON
    "#
    .to_string();

    if let Some(suffix) = with_suffix {
        default.push_str(suffix);
    }

    serde_yaml::from_str::<DryRunConfig>(&default).unwrap()
}
