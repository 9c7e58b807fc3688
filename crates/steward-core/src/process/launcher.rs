//! Backend process launcher
//!
//! ```text
//! launch()     → spawn detached child → verify alive → AgentProcess
//! terminate()  → SIGTERM → wait → SIGKILL if still alive
//! ```

use super::resolver::{CommandResolver, ResolvedCommand};
use super::utils::{delay, is_process_alive, signal_process_tree, Signal};
use crate::config::LauncherConfig;
use crate::error::{Error, Result};
use crate::types::AgentInstanceMeta;
use async_trait::async_trait;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const TERMINATE_POLL_INTERVAL: Duration = Duration::from_millis(200);
const KILL_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// A backend process the manager is responsible for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentProcess {
    pub pid: u32,
    pub workspace_dir: PathBuf,
    pub instance_name: String,
}

/// Spawns and terminates backend processes
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// Spawn the backend for `meta` in `workspace_dir`.
    async fn launch(&self, workspace_dir: &Path, meta: &AgentInstanceMeta) -> Result<AgentProcess>;

    /// Stop a process, escalating to a forced kill.
    async fn terminate(&self, process: &AgentProcess) -> Result<()>;
}

/// Launcher that spawns real OS processes
pub struct ProcessLauncher {
    resolver: Arc<dyn CommandResolver>,
    config: LauncherConfig,
}

impl ProcessLauncher {
    pub fn new(resolver: Arc<dyn CommandResolver>, config: LauncherConfig) -> Self {
        Self { resolver, config }
    }

    fn spawn(
        &self,
        resolved: &ResolvedCommand,
        workspace_dir: &Path,
    ) -> std::io::Result<tokio::process::Child> {
        let mut cmd = std::process::Command::new(&resolved.command);
        cmd.args(&resolved.args)
            .current_dir(workspace_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // Own process group so the whole tree can be signalled.
            .process_group(0);
        tokio::process::Command::from(cmd).spawn()
    }
}

#[async_trait]
impl AgentLauncher for ProcessLauncher {
    async fn launch(&self, workspace_dir: &Path, meta: &AgentInstanceMeta) -> Result<AgentProcess> {
        let resolved = self
            .resolver
            .resolve(&meta.backend_type, workspace_dir, meta.backend_config.as_ref())
            .map_err(|e| Error::launch_failed(&meta.name, e))?;

        info!(
            name = %meta.name,
            command = %resolved.command,
            args = ?resolved.args,
            backend_type = %meta.backend_type,
            "Spawning backend process"
        );

        let mut child = self.spawn(&resolved, workspace_dir).map_err(|e| {
            Error::launch_failed(
                &meta.name,
                format!("failed to spawn {}: {}", resolved.command, e),
            )
        })?;

        let pid = child
            .id()
            .ok_or_else(|| Error::launch_failed(&meta.name, "spawned process has no pid"))?;

        // Reap the child in the background; an unreaped zombie still looks alive.
        let exited = Arc::new(AtomicBool::new(false));
        let exited_flag = Arc::clone(&exited);
        let name = meta.name.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => debug!(name = %name, pid, %status, "Backend process reaped"),
                Err(e) => warn!(name = %name, pid, error = %e, "Failed to wait on backend process"),
            }
            exited_flag.store(true, Ordering::SeqCst);
        });

        let verify_delay = self.config.spawn_verify_delay();
        if !verify_delay.is_zero() {
            delay(verify_delay).await;
            if exited.load(Ordering::SeqCst) || !is_process_alive(pid) {
                return Err(Error::launch_failed(
                    &meta.name,
                    format!(
                        "process exited immediately after spawn (pid={}, command={})",
                        pid, resolved.command
                    ),
                ));
            }
        }

        info!(name = %meta.name, pid, command = %resolved.command, "Backend process spawned");

        Ok(AgentProcess {
            pid,
            workspace_dir: workspace_dir.to_path_buf(),
            instance_name: meta.name.clone(),
        })
    }

    async fn terminate(&self, process: &AgentProcess) -> Result<()> {
        let AgentProcess {
            pid, instance_name, ..
        } = process;
        let pid = *pid;

        if !is_process_alive(pid) {
            info!(name = %instance_name, pid, "Process already exited");
            return Ok(());
        }

        info!(name = %instance_name, pid, "Sending SIGTERM");
        signal_process_tree(pid, Signal::Term)?;

        let deadline = Instant::now() + self.config.terminate_timeout();
        while Instant::now() < deadline {
            delay(TERMINATE_POLL_INTERVAL).await;
            if !is_process_alive(pid) {
                info!(name = %instance_name, pid, "Process terminated gracefully");
                return Ok(());
            }
        }

        warn!(name = %instance_name, pid, "Process did not exit after SIGTERM, sending SIGKILL");
        signal_process_tree(pid, Signal::Kill)?;
        delay(KILL_SETTLE_DELAY).await;

        if is_process_alive(pid) {
            error!(name = %instance_name, pid, "Process still alive after SIGKILL");
        } else {
            info!(name = %instance_name, pid, "Process killed with SIGKILL");
        }
        Ok(())
    }
}
