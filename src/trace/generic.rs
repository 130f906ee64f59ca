//! Represents generic format of a cluster snapshot: nodes and pods as they are at the moment the
//! scheduler is started.

use serde::Deserialize;

use crate::core::common::{ObjectMeta, ObjectsInfo, RuntimeResources};
use crate::core::node::{Node, NodeSpec, NodeStatus};
use crate::core::pod::Pod;
use crate::core::scheduler::interface::LookupError;

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    /// Pods with `status.assigned_node` set are already placed: they count as members of their
    /// pod groups but are not scheduled again, and their requests are expected to be already
    /// subtracted from the allocatable resources of their nodes.
    #[serde(default)]
    pub pods: Vec<Pod>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SnapshotNode {
    pub metadata: ObjectMeta,
    pub status: SnapshotNodeStatus,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct SnapshotNodeStatus {
    pub capacity: RuntimeResources,
    // Omitted for fresh nodes, an explicit value (zero included) is taken as is.
    #[serde(default)]
    pub allocatable: Option<RuntimeResources>,
}

impl From<SnapshotNode> for Node {
    fn from(node: SnapshotNode) -> Self {
        let SnapshotNodeStatus {
            capacity,
            allocatable,
        } = node.status;
        Node {
            metadata: node.metadata,
            spec: NodeSpec::default(),
            status: NodeStatus {
                allocatable: allocatable.unwrap_or_else(|| capacity.clone()),
                capacity,
            },
        }
    }
}

impl ClusterSnapshot {
    pub fn into_objects_info(self) -> Result<ObjectsInfo, LookupError> {
        let objects = ObjectsInfo::new();
        for node in self.nodes {
            objects.add_node(node.into())?;
        }
        for pod in self.pods {
            objects.add_pod(pod)?;
        }
        Ok(objects)
    }
}
