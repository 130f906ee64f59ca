use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::core::node::Node;
use crate::core::pod::Pod;
use crate::core::scheduler::custom_scheduler::GROUP_NAME_LABEL;
use crate::core::scheduler::interface::{LookupError, NodeLister, PodLister};

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuntimeResources {
    pub cpu: u32, // in millicores
    pub ram: u64, // in bytes
}

/// In-memory cache of cluster objects which serves as a pod lister and a node lister for
/// scheduler plugins. Every lookup returns a copy, so a caller always works with a consistent
/// point-in-time view even if the cache is updated concurrently.
#[derive(Default, Debug)]
pub struct ObjectsInfo {
    pods: RwLock<BTreeMap<String, Pod>>,
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl ObjectsInfo {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_pod(&self, pod: Pod) -> Result<(), LookupError> {
        self.pods_mut()?.insert(pod.metadata.name.clone(), pod);
        Ok(())
    }

    pub fn add_node(&self, node: Node) -> Result<(), LookupError> {
        self.nodes_mut()?.insert(node.metadata.name.clone(), node);
        Ok(())
    }

    pub fn remove_node(&self, node_name: &str) -> Result<Option<Node>, LookupError> {
        Ok(self.nodes_mut()?.remove(node_name))
    }

    pub fn get_pod(&self, pod_name: &str) -> Result<Pod, LookupError> {
        self.pods()?
            .get(pod_name)
            .cloned()
            .ok_or_else(|| LookupError::PodNotFound(pod_name.to_string()))
    }

    pub fn pod_count(&self) -> Result<usize, LookupError> {
        Ok(self.pods()?.len())
    }

    pub fn node_count(&self) -> Result<usize, LookupError> {
        Ok(self.nodes()?.len())
    }

    /// Pods which are not bound to any node yet, ordered by name.
    pub fn pending_pods(&self) -> Result<Vec<Pod>, LookupError> {
        Ok(self
            .pods()?
            .values()
            .filter(|pod| pod.status.assigned_node.is_none())
            .cloned()
            .collect())
    }

    /// Binds the pod to the node and subtracts its requests from the node's allocatable resources.
    pub fn assign_pod(&self, pod_name: &str, node_name: &str) -> Result<(), LookupError> {
        let mut pods = self.pods_mut()?;
        let mut nodes = self.nodes_mut()?;

        let pod = pods
            .get_mut(pod_name)
            .ok_or_else(|| LookupError::PodNotFound(pod_name.to_string()))?;
        let node = nodes
            .get_mut(node_name)
            .ok_or_else(|| LookupError::NodeNotFound(node_name.to_string()))?;

        let requests = &pod.spec.resources.requests;
        let allocatable = &mut node.status.allocatable;
        allocatable.cpu = allocatable.cpu.saturating_sub(requests.cpu);
        allocatable.ram = allocatable.ram.saturating_sub(requests.ram);
        pod.status.assigned_node = Some(node_name.to_string());
        Ok(())
    }

    fn pods(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Pod>>, LookupError> {
        self.pods.read().map_err(|_| poisoned("pods"))
    }

    fn pods_mut(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Pod>>, LookupError> {
        self.pods.write().map_err(|_| poisoned("pods"))
    }

    fn nodes(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Node>>, LookupError> {
        self.nodes.read().map_err(|_| poisoned("nodes"))
    }

    fn nodes_mut(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Node>>, LookupError> {
        self.nodes.write().map_err(|_| poisoned("nodes"))
    }
}

fn poisoned(what: &str) -> LookupError {
    LookupError::Unavailable(format!("{} cache lock is poisoned", what))
}

impl PodLister for ObjectsInfo {
    fn list_by_group(&self, group: &str) -> Result<Vec<Pod>, LookupError> {
        Ok(self
            .pods()?
            .values()
            .filter(|pod| pod.label(GROUP_NAME_LABEL) == Some(group))
            .cloned()
            .collect())
    }
}

impl NodeLister for ObjectsInfo {
    fn get(&self, node_name: &str) -> Result<Node, LookupError> {
        self.nodes()?
            .get(node_name)
            .cloned()
            .ok_or_else(|| LookupError::NodeNotFound(node_name.to_string()))
    }

    fn list(&self) -> Result<Vec<Node>, LookupError> {
        Ok(self.nodes()?.values().cloned().collect())
    }
}
