//! Shared fixtures for unit tests

use crate::agent::AgentManager;
use crate::config::{LauncherConfig, ManagerConfig, RestartPolicy};
use crate::error::{Error, Result, WorkspaceError};
use crate::types::{AgentTemplate, DomainContext, PermissionsConfig};
use crate::workspace::{TemplateRegistry, WorkspaceBuilder};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub(crate) const SLEEPER_TEMPLATE: &str = "test-sleeper";

/// Custom backend that runs `sleep 300` in the workspace
pub(crate) fn sleeper_template() -> AgentTemplate {
    let config = json!({ "executablePath": "sleep", "args": ["300"] });
    AgentTemplate::new(SLEEPER_TEMPLATE, "1.0.0", "custom")
        .with_backend_config(config.as_object().cloned().unwrap_or_default())
}

/// Backend whose process exits right after spawning
pub(crate) fn crasher_template() -> AgentTemplate {
    let config = json!({ "executablePath": "true", "args": [] });
    AgentTemplate::new("test-crasher", "1.0.0", "custom")
        .with_backend_config(config.as_object().cloned().unwrap_or_default())
}

#[derive(Debug, Clone)]
pub(crate) enum StubFailure {
    Component { kind: String, name: String },
    Io,
}

/// Builder that writes nothing, counts calls, and can be told to fail
#[derive(Debug, Default)]
pub(crate) struct StubBuilder {
    failure: Option<StubFailure>,
    builds: AtomicUsize,
}

impl StubBuilder {
    pub(crate) fn failing_component(kind: &str, name: &str) -> Self {
        Self {
            failure: Some(StubFailure::Component {
                kind: kind.into(),
                name: name.into(),
            }),
            builds: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_io() -> Self {
        Self {
            failure: Some(StubFailure::Io),
            builds: AtomicUsize::new(0),
        }
    }

    pub(crate) fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkspaceBuilder for StubBuilder {
    async fn build(
        &self,
        _workspace_dir: &Path,
        _domain_context: &DomainContext,
        _backend_type: &str,
        _permissions: &PermissionsConfig,
    ) -> Result<()> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            None => Ok(()),
            Some(StubFailure::Component { kind, name }) => Err(WorkspaceError::ComponentNotFound {
                kind: kind.clone(),
                name: name.clone(),
            }
            .into()),
            Some(StubFailure::Io) => Err(Error::Io(std::io::Error::other("disk full"))),
        }
    }
}

/// Fast timings so lifecycle tests finish quickly.
pub(crate) fn test_config(instances_dir: &Path) -> ManagerConfig {
    ManagerConfig {
        watcher_poll_interval_ms: 50,
        restart_policy: RestartPolicy {
            max_restarts: 3,
            backoff_base_ms: 10,
            backoff_max_ms: 40,
            reset_after_ms: 300_000,
        },
        launcher: LauncherConfig {
            spawn_verify_delay_ms: 100,
            terminate_timeout_ms: 2_000,
        },
        ..ManagerConfig::with_instances_dir(instances_dir)
    }
}

pub(crate) fn test_templates() -> Arc<TemplateRegistry> {
    let registry = TemplateRegistry::new();
    registry.register(sleeper_template());
    registry.register(crasher_template());
    Arc::new(registry)
}

pub(crate) fn test_manager(config: &ManagerConfig) -> Arc<AgentManager> {
    AgentManager::with_defaults(config, test_templates(), Arc::new(StubBuilder::default()))
}

/// Poll `condition` every 10ms until it holds or `timeout` passes.
pub(crate) async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Spawn a `sleep` the manager does not own. It is reaped in the background
/// so it stops looking alive once killed.
pub(crate) fn spawn_external_sleeper() -> u32 {
    let mut child = tokio::process::Command::new("sleep")
        .arg("300")
        .spawn()
        .unwrap();
    let pid = child.id().unwrap();
    tokio::spawn(async move {
        let _ = child.wait().await;
    });
    pid
}

pub(crate) fn kill_pid(pid: u32) {
    crate::process::send_signal(pid, crate::process::Signal::Kill).unwrap();
}
