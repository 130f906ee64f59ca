//! Contracts between scheduler plugins and the host which runs them: read-only listers plugins
//! query, node score lists they produce and statuses they report.

use std::num::ParseIntError;

use serde::Serialize;
use thiserror::Error;

use crate::core::node::Node;
use crate::core::pod::Pod;

/// Highest score a node may have after normalization.
pub const MAX_NODE_SCORE: i64 = 100;
/// Lowest score a node may have after normalization.
pub const MIN_NODE_SCORE: i64 = 0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("node {0:?} not found")]
    NodeNotFound(String),
    #[error("pod {0:?} not found")]
    PodNotFound(String),
    #[error("lister is unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of pods grouped by the pod group label.
pub trait PodLister: Send + Sync {
    /// Returns every pod, pending or placed, labeled with the given group. The result is a
    /// snapshot and may be stale by the time the caller looks at it.
    fn list_by_group(&self, group: &str) -> Result<Vec<Pod>, LookupError>;
}

/// Read-only point-in-time view of cluster nodes.
pub trait NodeLister: Send + Sync {
    fn get(&self, node_name: &str) -> Result<Node, LookupError>;
    fn list(&self) -> Result<Vec<Node>, LookupError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeScore {
    pub name: String,
    pub score: i64,
}

pub type NodeScoreList = Vec<NodeScore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusCode {
    Success,
    /// The pod can not be scheduled right now, the host is expected to retry later.
    Unschedulable,
    /// Non-retryable failure of a single plugin call.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub code: StatusCode,
    pub reason: String,
}

impl Status {
    pub fn success() -> Self {
        Self {
            code: StatusCode::Success,
            reason: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success
    }

    pub fn is_retryable(&self) -> bool {
        self.code == StatusCode::Unschedulable
    }

    pub fn from_result<T>(result: &Result<T, PluginError>) -> Self {
        match result {
            Ok(_) => Self::success(),
            Err(err) => err.into(),
        }
    }
}

impl From<&PluginError> for Status {
    fn from(err: &PluginError) -> Self {
        Self {
            code: err.code(),
            reason: err.to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PluginError {
    #[error("not enough pods in the group {group:?}: {members} present, {min_available} required")]
    InsufficientGroupMembers {
        group: String,
        members: usize,
        min_available: u64,
    },
    #[error("pod {pod:?} has no {label:?} label")]
    MissingLabel { pod: String, label: &'static str },
    #[error("invalid minAvailable value {value:?}: {source}")]
    InvalidMinAvailable { value: String, source: ParseIntError },
    #[error("invalid minAvailable value {value:?}: must be non-negative")]
    NegativeMinAvailable { value: String },
    #[error("failed to list pods of group {group:?}: {source}")]
    ListPods { group: String, source: LookupError },
    #[error("failed to get node info: {source}")]
    NodeInfo { node: String, source: LookupError },
    #[error("allocatable memory {ram} of node {node:?} does not fit a signed 64-bit score")]
    AllocatableOutOfRange { node: String, ram: u64 },
}

impl PluginError {
    pub fn code(&self) -> StatusCode {
        match self {
            PluginError::InsufficientGroupMembers { .. } => StatusCode::Unschedulable,
            _ => StatusCode::Error,
        }
    }
}

/// Failures of the host pipeline for a single pod.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("there are no nodes in the cluster")]
    NoNodesInCluster,
    #[error("no nodes have sufficient resources for the pod")]
    NoSufficientNodes,
    #[error("pod refers to unknown scheduler profile {0:?}")]
    UnknownProfile(String),
    #[error("failed to list nodes: {0}")]
    ListNodes(LookupError),
    #[error("plugin {plugin} failed: {error}")]
    Plugin { plugin: String, error: PluginError },
}

impl ScheduleError {
    pub fn status(&self) -> Status {
        let code = match self {
            ScheduleError::NoNodesInCluster | ScheduleError::NoSufficientNodes => {
                StatusCode::Unschedulable
            }
            ScheduleError::Plugin { error, .. } => error.code(),
            ScheduleError::UnknownProfile(_) | ScheduleError::ListNodes(_) => StatusCode::Error,
        };
        Status {
            code,
            reason: self.to_string(),
        }
    }
}
