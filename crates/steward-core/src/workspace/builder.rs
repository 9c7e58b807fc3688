//! Workspace content materialization

use crate::error::{Result, WorkspaceError};
use crate::types::{DomainContext, PermissionsConfig};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONTEXT_DIR: &str = ".steward";
pub const CONTEXT_FILENAME: &str = "context.json";

/// Writes the files an agent backend needs into its workspace
#[async_trait]
pub trait WorkspaceBuilder: Send + Sync {
    /// Fails with `ComponentNotFound` when the domain context names
    /// something that does not exist.
    async fn build(
        &self,
        workspace_dir: &Path,
        domain_context: &DomainContext,
        backend_type: &str,
        permissions: &PermissionsConfig,
    ) -> Result<()>;
}

/// Component names a builder accepts
#[derive(Debug, Clone, Default)]
pub struct ComponentCatalog {
    pub skills: HashSet<String>,
    pub prompts: HashSet<String>,
    pub mcp_servers: HashSet<String>,
    pub workflows: HashSet<String>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skill(mut self, name: impl Into<String>) -> Self {
        self.skills.insert(name.into());
        self
    }

    pub fn with_prompt(mut self, name: impl Into<String>) -> Self {
        self.prompts.insert(name.into());
        self
    }

    pub fn with_mcp_server(mut self, name: impl Into<String>) -> Self {
        self.mcp_servers.insert(name.into());
        self
    }

    pub fn with_workflow(mut self, name: impl Into<String>) -> Self {
        self.workflows.insert(name.into());
        self
    }

    fn check(&self, context: &DomainContext) -> Result<()> {
        let groups: [(&str, &HashSet<String>, Vec<&String>); 4] = [
            ("Skill", &self.skills, context.skills.iter().collect()),
            ("Prompt", &self.prompts, context.prompts.iter().collect()),
            ("McpServer", &self.mcp_servers, context.mcp_servers.iter().collect()),
            ("Workflow", &self.workflows, context.workflow.iter().collect()),
        ];
        for (kind, known, referenced) in groups {
            if let Some(missing) = referenced.into_iter().find(|name| !known.contains(*name)) {
                return Err(WorkspaceError::ComponentNotFound {
                    kind: kind.to_string(),
                    name: missing.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextManifest<'a> {
    backend_type: &'a str,
    domain_context: &'a DomainContext,
    permissions: &'a PermissionsConfig,
}

/// Default builder: writes `.steward/context.json` describing the domain
/// context and permissions for the backend to pick up.
#[derive(Debug, Clone, Default)]
pub struct ContextFileBuilder {
    catalog: Option<ComponentCatalog>,
}

impl ContextFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject references to components outside `catalog`.
    pub fn with_catalog(catalog: ComponentCatalog) -> Self {
        Self {
            catalog: Some(catalog),
        }
    }

    pub fn manifest_path(workspace_dir: &Path) -> PathBuf {
        workspace_dir.join(CONTEXT_DIR).join(CONTEXT_FILENAME)
    }
}

#[async_trait]
impl WorkspaceBuilder for ContextFileBuilder {
    async fn build(
        &self,
        workspace_dir: &Path,
        domain_context: &DomainContext,
        backend_type: &str,
        permissions: &PermissionsConfig,
    ) -> Result<()> {
        if let Some(catalog) = &self.catalog {
            catalog.check(domain_context)?;
        }

        let manifest = ContextManifest {
            backend_type,
            domain_context,
            permissions,
        };
        let path = Self::manifest_path(workspace_dir);
        tokio::fs::create_dir_all(workspace_dir.join(CONTEXT_DIR)).await?;
        tokio::fs::write(&path, serde_json::to_vec_pretty(&manifest)?).await?;

        debug!(path = %path.display(), backend_type, "Context manifest written");
        Ok(())
    }
}
