//! Type definitions for node specification and state used in the objects cache and snapshot formats

use serde::{Deserialize, Serialize};

use crate::core::common::{ObjectMeta, RuntimeResources};

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodeSpec {
    // placeholder for future fields
}

#[derive(Default, Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NodeStatus {
    // How much resources left, equals capacity while node is created.
    pub allocatable: RuntimeResources,
    // Total amount of resources
    pub capacity: RuntimeResources,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Node {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: NodeSpec,
    pub status: NodeStatus,
}

impl Node {
    pub fn new(name: String, cpu: u32, ram: u64) -> Self {
        Self {
            metadata: ObjectMeta {
                name,
                labels: Default::default(),
            },
            spec: Default::default(),
            status: NodeStatus {
                allocatable: RuntimeResources { cpu, ram },
                capacity: RuntimeResources { cpu, ram },
            },
        }
    }
}
