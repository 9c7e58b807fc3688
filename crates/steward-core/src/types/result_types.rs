//! Operation inputs and outputs exposed to the RPC/CLI layers

use super::{AgentInstanceMeta, LaunchMode, WorkspacePolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// What to do when the target workspace directory already exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkDirConflict {
    /// Refuse to create the instance
    #[default]
    Error,
    /// Delete the directory and start fresh
    Overwrite,
    /// Reuse the directory, keeping existing files
    Append,
}

/// Caller-supplied overrides for instance creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOverrides {
    #[serde(default)]
    pub launch_mode: Option<LaunchMode>,
    #[serde(default)]
    pub workspace_policy: Option<WorkspacePolicy>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Absolute path of an external workspace, linked from the instances dir
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default)]
    pub work_dir_conflict: WorkDirConflict,
}

impl InstanceOverrides {
    pub fn with_launch_mode(mut self, launch_mode: LaunchMode) -> Self {
        self.launch_mode = Some(launch_mode);
        self
    }

    pub fn with_workspace_policy(mut self, policy: WorkspacePolicy) -> Self {
        self.workspace_policy = Some(policy);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }

    pub fn with_conflict(mut self, conflict: WorkDirConflict) -> Self {
        self.work_dir_conflict = conflict;
        self
    }
}

/// Result of `find_or_create_instance` / `get_or_create_agent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceLookup {
    pub meta: AgentInstanceMeta,
    pub created: bool,
}

/// Spawn information for a client that launches the backend itself
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResult {
    pub workspace_dir: PathBuf,
    pub command: String,
    pub args: Vec<String>,
    pub instance_name: String,
    pub backend_type: String,
    pub created: bool,
}

/// Outcome of `detach_agent`
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DetachResult {
    pub workspace_cleaned: bool,
}

/// Instance record enriched with its workspace location
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    #[serde(flatten)]
    pub meta: AgentInstanceMeta,
    pub workspace_dir: PathBuf,
}
