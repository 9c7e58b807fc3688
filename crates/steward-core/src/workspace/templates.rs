//! Template lookup

use crate::error::{Result, WorkspaceError};
use crate::types::AgentTemplate;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Resolves a template name for instance creation
pub trait TemplateResolver: Send + Sync {
    fn get(&self, name: &str) -> Option<AgentTemplate>;

    fn get_or_throw(&self, name: &str) -> Result<AgentTemplate> {
        self.get(name)
            .ok_or_else(|| WorkspaceError::TemplateNotFound(name.to_string()).into())
    }
}

/// In-memory template registry
#[derive(Default)]
pub struct TemplateRegistry {
    templates: RwLock<HashMap<String, AgentTemplate>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a template
    pub fn register(&self, template: AgentTemplate) {
        debug!(name = %template.name, version = %template.version, "Registering template");
        self.templates.write().insert(template.name.clone(), template);
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.templates.write().remove(name).is_some()
    }

    pub fn list(&self) -> Vec<AgentTemplate> {
        let mut templates: Vec<AgentTemplate> = self.templates.read().values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }

    /// Register every `*.json` template in `dir`, returning how many loaded.
    ///
    /// Unparsable files are skipped with a warning.
    pub fn load_dir(&self, dir: &Path) -> Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<AgentTemplate>(&raw) {
                Ok(template) => {
                    self.register(template);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping invalid template"),
            }
        }
        info!(dir = %dir.display(), count = loaded, "Templates loaded");
        Ok(loaded)
    }
}

impl TemplateResolver for TemplateRegistry {
    fn get(&self, name: &str) -> Option<AgentTemplate> {
        self.templates.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[test]
    fn test_get_or_throw() {
        let registry = TemplateRegistry::new();
        registry.register(AgentTemplate::new("reviewer", "1.0.0", "cursor"));

        assert_eq!(registry.get_or_throw("reviewer").unwrap().version, "1.0.0");
        assert!(matches!(
            registry.get_or_throw("missing"),
            Err(Error::Workspace(WorkspaceError::TemplateNotFound(name))) if name == "missing"
        ));
    }

    #[test]
    fn test_load_dir_skips_invalid() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("reviewer.json"),
            r#"{ "name": "reviewer", "version": "1.0.0", "backend": { "type": "cursor" } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("README.md"), "# templates").unwrap();

        let registry = TemplateRegistry::new();
        assert_eq!(registry.load_dir(dir.path()).unwrap(), 1);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("reviewer").is_some());
    }
}
