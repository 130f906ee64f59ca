//! Type definition for Pod primitive in k8s cluster

use serde::{Deserialize, Serialize};

use crate::core::common::{ObjectMeta, RuntimeResources};

#[derive(Default, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Resources {
    #[serde(default)]
    pub limits: RuntimeResources,
    #[serde(default)]
    pub requests: RuntimeResources,
}

#[derive(Default, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PodSpec {
    /// Simplified: instead of vector of containers - one container with resources
    #[serde(default)]
    pub resources: Resources,
}

#[derive(Default, Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PodStatus {
    /// None while the pod is pending.
    #[serde(default)]
    pub assigned_node: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Pod {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    pub fn new(name: String, cpu: u32, ram: u64) -> Self {
        Self {
            metadata: ObjectMeta {
                name,
                labels: Default::default(),
            },
            spec: PodSpec {
                resources: Resources {
                    limits: RuntimeResources { cpu, ram },
                    requests: RuntimeResources { cpu, ram },
                },
            },
            status: Default::default(),
        }
    }

    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.metadata
            .labels
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }
}
