//! Agent instance metadata and lifecycle state types

use super::PermissionsConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Backend used when a persisted record predates the `backendType` field.
pub const DEFAULT_BACKEND_TYPE: &str = "cursor";

/// Agent instance lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Workspace exists, no process has been started yet
    Created,
    /// Spawn in progress
    Starting,
    /// A live process is attached to the instance
    Running,
    /// Intentional shutdown in progress
    Stopping,
    /// No process; the last one exited or was stopped
    Stopped,
    /// An externally-owned process died unexpectedly
    Crashed,
    /// Launch failed or the restart limit was exceeded
    Error,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Crashed => "crashed",
            Self::Error => "error",
        }
    }

    /// `running` or `starting`: a process is (or is about to be) alive.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Starting)
    }

    /// Statuses that cannot survive a daemon restart.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Running | Self::Starting | Self::Stopping)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Launch mode, selecting the exit and recovery policy of an instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LaunchMode {
    /// Interactive process started directly by a user
    #[default]
    Direct,
    /// ACP session running in the background
    AcpBackground,
    /// Long-lived ACP service, restarted on exit
    #[serde(alias = "normal")]
    AcpService,
    /// Single task run, optionally destroyed on exit
    OneShot,
}

impl LaunchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::AcpBackground => "acp-background",
            Self::AcpService => "acp-service",
            Self::OneShot => "one-shot",
        }
    }

    /// Workspace policy an instance gets when none is given explicitly.
    pub fn default_workspace_policy(&self) -> WorkspacePolicy {
        match self {
            Self::OneShot => WorkspacePolicy::Ephemeral,
            _ => WorkspacePolicy::Persistent,
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the workspace outlives the process lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkspacePolicy {
    #[default]
    Persistent,
    Ephemeral,
}

/// Who spawned the OS process backing an instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessOwnership {
    /// Spawned by this manager
    #[default]
    Managed,
    /// Spawned elsewhere and registered through attach
    External,
}

/// Persisted state of one agent instance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentInstanceMeta {
    pub id: String,
    pub name: String,
    pub template_name: String,
    pub template_version: String,
    pub backend_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_config: Option<serde_json::Map<String, serde_json::Value>>,
    pub status: AgentStatus,
    pub launch_mode: LaunchMode,
    pub workspace_policy: WorkspacePolicy,
    pub process_ownership: ProcessOwnership,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_permissions: Option<PermissionsConfig>,
}

impl AgentInstanceMeta {
    /// Fresh `created` record for a new instance.
    pub fn new(
        name: impl Into<String>,
        template_name: impl Into<String>,
        template_version: impl Into<String>,
        backend_type: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            template_name: template_name.into(),
            template_version: template_version.into(),
            backend_type: backend_type.into(),
            backend_config: None,
            status: AgentStatus::Created,
            launch_mode: LaunchMode::default(),
            workspace_policy: WorkspacePolicy::default(),
            process_ownership: ProcessOwnership::default(),
            pid: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            metadata: HashMap::new(),
            effective_permissions: None,
        }
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Shallow patch applied by `update_instance_meta`.
///
/// Outer `None` leaves a field untouched; for the optional fields the inner
/// `None` clears it.
#[derive(Debug, Clone, Default)]
pub struct InstanceMetaPatch {
    pub status: Option<AgentStatus>,
    pub pid: Option<Option<u32>>,
    pub process_ownership: Option<ProcessOwnership>,
    pub started_at: Option<Option<chrono::DateTime<chrono::Utc>>>,
    pub metadata: Option<HashMap<String, String>>,
}

impl InstanceMetaPatch {
    pub fn status(status: AgentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_ownership(mut self, ownership: ProcessOwnership) -> Self {
        self.process_ownership = Some(ownership);
        self
    }

    pub fn with_started_at(mut self, started_at: Option<chrono::DateTime<chrono::Utc>>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Merge onto `meta`, leaving `updated_at` to the caller.
    pub(crate) fn apply(self, meta: &mut AgentInstanceMeta) {
        if let Some(status) = self.status {
            meta.status = status;
        }
        if let Some(pid) = self.pid {
            meta.pid = pid;
        }
        if let Some(ownership) = self.process_ownership {
            meta.process_ownership = ownership;
        }
        if let Some(started_at) = self.started_at {
            meta.started_at = started_at;
        }
        if let Some(metadata) = self.metadata {
            meta.metadata = metadata;
        }
    }
}
