//! Backend command resolution

use crate::error::{ConfigError, Result};
use serde::Serialize;
use std::path::Path;

type BackendConfig = serde_json::Map<String, serde_json::Value>;

/// Executable and arguments for one backend launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCommand {
    pub command: String,
    pub args: Vec<String>,
}

/// Turns `(backend type, workspace, backend config)` into a command line.
///
/// Implementations must be pure: no I/O, no side effects.
pub trait CommandResolver: Send + Sync {
    fn resolve(
        &self,
        backend_type: &str,
        workspace_dir: &Path,
        backend_config: Option<&BackendConfig>,
    ) -> Result<ResolvedCommand>;
}

/// Built-in backends.
///
/// `executablePath` in the backend config replaces the default executable and
/// `args` (an array) replaces the default arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCommandResolver;

impl DefaultCommandResolver {
    pub fn new() -> Self {
        Self
    }
}

impl CommandResolver for DefaultCommandResolver {
    fn resolve(
        &self,
        backend_type: &str,
        workspace_dir: &Path,
        backend_config: Option<&BackendConfig>,
    ) -> Result<ResolvedCommand> {
        let explicit_path = backend_config
            .and_then(|c| c.get("executablePath"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty());

        let workspace = workspace_dir.to_string_lossy().to_string();
        let (default_command, default_args) = match backend_type {
            "cursor" => (Some("cursor"), vec![workspace.clone()]),
            "claude-code" => (Some("claude-agent-acp"), Vec::new()),
            "custom" => (None, vec![workspace.clone()]),
            other => {
                return Err(ConfigError::Invalid(format!("Unknown backend type: {other}")).into())
            }
        };

        let command = match (explicit_path, default_command) {
            (Some(path), _) => path.to_string(),
            (None, Some(command)) => command.to_string(),
            (None, None) => {
                return Err(ConfigError::Invalid(
                    "Custom backend requires executablePath in backend config".into(),
                )
                .into())
            }
        };

        let args = match backend_config.and_then(|c| c.get("args")) {
            Some(serde_json::Value::Array(values)) => values
                .iter()
                .map(|v| match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            _ => default_args,
        };

        Ok(ResolvedCommand { command, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn config(value: serde_json::Value) -> BackendConfig {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_cursor_opens_workspace() {
        let resolved = DefaultCommandResolver
            .resolve("cursor", Path::new("/ws/a"), None)
            .unwrap();
        assert_eq!(resolved.command, "cursor");
        assert_eq!(resolved.args, vec!["/ws/a"]);
    }

    #[test]
    fn test_explicit_overrides() {
        let cfg = config(json!({ "executablePath": "/bin/sleep", "args": ["600", 1] }));
        let resolved = DefaultCommandResolver
            .resolve("custom", Path::new("/ws/a"), Some(&cfg))
            .unwrap();
        assert_eq!(resolved.command, "/bin/sleep");
        assert_eq!(resolved.args, vec!["600", "1"]);
    }

    #[test]
    fn test_custom_requires_executable() {
        let result = DefaultCommandResolver.resolve("custom", Path::new("/ws/a"), None);
        assert!(matches!(result, Err(Error::Config(ConfigError::Invalid(_)))));
    }

    #[test]
    fn test_unknown_backend() {
        let result = DefaultCommandResolver.resolve("vim", Path::new("/ws/a"), None);
        assert!(result.is_err());
    }
}
