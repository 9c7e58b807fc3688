//! Template, domain context, and permission types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Agent template resolved by name when an instance is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTemplate {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    pub backend: BackendSpec,
    #[serde(default)]
    pub permissions: Option<PermissionsInput>,
    #[serde(default)]
    pub domain_context: DomainContext,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl AgentTemplate {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        backend_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            backend: BackendSpec {
                backend_type: backend_type.into(),
                config: None,
            },
            permissions: None,
            domain_context: DomainContext::default(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_backend_config(mut self, config: serde_json::Map<String, serde_json::Value>) -> Self {
        self.backend.config = Some(config);
        self
    }

    pub fn with_permissions(mut self, permissions: PermissionsInput) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn with_domain_context(mut self, domain_context: DomainContext) -> Self {
        self.domain_context = domain_context;
        self
    }
}

/// Backend selection; `config` is opaque to everything but the command resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    #[serde(rename = "type")]
    pub backend_type: String,
    #[serde(default)]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Named components materialized into a workspace
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DomainContext {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub prompts: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<String>,
    #[serde(default)]
    pub workflow: Option<String>,
}

/// Default behavior of the agent when a tool is not explicitly listed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    Plan,
    DontAsk,
    BypassPermissions,
}

/// Fully resolved tool permissions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsConfig {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub ask: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<PermissionMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_directories: Vec<String>,
}

/// Template permissions: a preset name or an explicit config
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PermissionsInput {
    Preset(String),
    Config(PermissionsConfig),
}
