//! Agent lifecycle manager
//!
//! ```text
//! created ──start──▶ starting ──▶ running ──stop──▶ stopping ──▶ stopped
//!                       │            │
//!                       ▼            ▼ process exit
//!                     error      stopped | crashed ─▶ restart | destroy | error
//! ```
//!
//! Every mutating operation holds a per-name async lock, so two calls on
//! the same instance never interleave. Internal re-entry goes through the
//! `*_locked` variants.

use super::launch_mode::{
    process_exit_action, recovery_action, ProcessExitAction, RecoveryAction, EXITED_AT_KEY,
};
use super::restart::{RestartDecision, RestartTracker};
use crate::config::ManagerConfig;
use crate::error::{AgentError, Error, Result};
use crate::process::{
    delay, is_process_alive, AgentLauncher, AgentProcess, CommandResolver,
    DefaultCommandResolver, ProcessExitHandler, ProcessExitInfo, ProcessLauncher, ProcessWatcher,
};
use crate::storage::{scan_instances, update_instance_meta, ScanResult};
use crate::types::*;
use crate::workspace::{AgentInitializer, TemplateResolver, WorkspaceBuilder};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

type InstanceLock = Arc<tokio::sync::Mutex<()>>;

enum ExitFollowUp {
    Nothing,
    Restart(RestartDecision),
    Destroy,
}

/// Forwards watcher exits to the manager without keeping it alive.
struct ExitForwarder {
    manager: Weak<AgentManager>,
}

#[async_trait]
impl ProcessExitHandler for ExitForwarder {
    async fn on_process_exit(&self, info: ProcessExitInfo) -> Result<()> {
        match self.manager.upgrade() {
            Some(manager) => manager.handle_process_exit(info).await,
            None => Ok(()),
        }
    }
}

/// Supervises agent instances and their backend processes
pub struct AgentManager {
    instances_dir: PathBuf,
    corrupted_dir: PathBuf,
    initializer: AgentInitializer,
    launcher: Arc<dyn AgentLauncher>,
    resolver: Arc<dyn CommandResolver>,
    watcher: ProcessWatcher,
    restart_tracker: RestartTracker,
    /// In-memory view of every known instance
    cache: Mutex<HashMap<String, AgentInstanceMeta>>,
    /// Processes this manager is responsible for
    processes: Mutex<HashMap<String, AgentProcess>>,
    locks: Mutex<HashMap<String, InstanceLock>>,
}

impl AgentManager {
    pub fn new(
        config: &ManagerConfig,
        initializer: AgentInitializer,
        launcher: Arc<dyn AgentLauncher>,
        resolver: Arc<dyn CommandResolver>,
    ) -> Arc<Self> {
        let instances_dir = initializer.instances_dir().to_path_buf();
        let corrupted_dir = config
            .corrupted_dir
            .clone()
            .unwrap_or_else(|| instances_dir.join(".corrupted"));
        let poll_interval = config.poll_interval();

        Arc::new_cyclic(|manager: &Weak<Self>| Self {
            instances_dir,
            corrupted_dir,
            initializer,
            launcher,
            resolver,
            watcher: ProcessWatcher::new(
                Arc::new(ExitForwarder {
                    manager: manager.clone(),
                }),
                poll_interval,
            ),
            restart_tracker: RestartTracker::new(config.restart_policy),
            cache: Mutex::new(HashMap::new()),
            processes: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Manager with the built-in command resolver and process launcher.
    pub fn with_defaults(
        config: &ManagerConfig,
        templates: Arc<dyn TemplateResolver>,
        builder: Arc<dyn WorkspaceBuilder>,
    ) -> Arc<Self> {
        let resolver: Arc<dyn CommandResolver> = Arc::new(DefaultCommandResolver::new());
        let launcher = Arc::new(ProcessLauncher::new(Arc::clone(&resolver), config.launcher));
        let initializer = AgentInitializer::new(
            templates,
            builder,
            &config.instances_dir,
            config.default_launch_mode,
        );
        Self::new(config, initializer, launcher, resolver)
    }

    // ---- bookkeeping -------------------------------------------------------

    async fn lock_instance(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.lock().entry(name.to_string()).or_default());
        lock.lock_owned().await
    }

    fn cached(&self, name: &str) -> Option<AgentInstanceMeta> {
        self.cache.lock().get(name).cloned()
    }

    fn require(&self, name: &str) -> Result<AgentInstanceMeta> {
        self.cached(name).ok_or_else(|| Error::not_found(name))
    }

    fn store(&self, name: &str, meta: AgentInstanceMeta) -> AgentInstanceMeta {
        self.cache.lock().insert(name.to_string(), meta.clone());
        meta
    }

    /// Write `patch` to disk, then mirror the result into the cache.
    async fn persist(&self, name: &str, patch: InstanceMetaPatch) -> Result<AgentInstanceMeta> {
        let meta = update_instance_meta(&self.workspace_dir(name), patch).await?;
        Ok(self.store(name, meta))
    }

    fn stopped_patch() -> InstanceMetaPatch {
        InstanceMetaPatch::status(AgentStatus::Stopped)
            .with_pid(None)
            .with_started_at(None)
    }

    pub fn workspace_dir(&self, name: &str) -> PathBuf {
        self.initializer.instance_dir(name)
    }

    // ---- startup -----------------------------------------------------------

    /// Load instances from disk and reconcile them with reality.
    ///
    /// Stale `running`/`starting`/`stopping` records become `stopped`, and
    /// the ones whose launch mode recovers are restarted once the scan is
    /// complete. Corrupted directories are quarantined. Orphaned processes
    /// of `error`/`crashed` records are re-adopted if still alive.
    pub async fn initialize(&self) -> Result<()> {
        let ScanResult { valid, corrupted } = scan_instances(&self.instances_dir).await?;
        self.cache.lock().clear();
        self.processes.lock().clear();

        let mut pending_restarts = Vec::new();
        for meta in valid {
            let name = meta.name.clone();
            match (meta.status, meta.pid) {
                (status, _) if status.is_transient() => {
                    let action = recovery_action(meta.launch_mode);
                    info!(
                        name = %name,
                        stale_status = %status,
                        launch_mode = %meta.launch_mode,
                        ?action,
                        "Resetting stale instance to stopped"
                    );
                    match self.persist(&name, Self::stopped_patch()).await {
                        Ok(_) if action == RecoveryAction::Restart => pending_restarts.push(name),
                        Ok(_) => {}
                        Err(e) => {
                            error!(name = %name, error = %e, "Failed to reset stale instance, recovery skipped");
                            let mut stopped = meta;
                            Self::stopped_patch().apply(&mut stopped);
                            self.store(&name, stopped);
                        }
                    }
                }
                (AgentStatus::Error | AgentStatus::Crashed, Some(pid)) => {
                    let status = meta.status;
                    if let Err(e) = self.reclaim_or_clear(&name, status, pid).await {
                        error!(name = %name, pid, error = %e, "Failed to reconcile orphaned process");
                        self.store(&name, meta);
                    }
                }
                _ => {
                    self.store(&name, meta);
                }
            }
        }

        for dir_name in &corrupted {
            self.quarantine(dir_name).await;
        }

        self.watcher.start();
        info!(
            instances = self.len(),
            corrupted = corrupted.len(),
            pending_restarts = pending_restarts.len(),
            "AgentManager initialized"
        );

        for name in pending_restarts {
            match self.start_agent(&name).await {
                Ok(meta) => info!(name = %name, pid = ?meta.pid, "Recovered instance restarted"),
                Err(e) => error!(name = %name, error = %e, "Recovery restart failed"),
            }
        }
        Ok(())
    }

    async fn reclaim_or_clear(&self, name: &str, status: AgentStatus, pid: u32) -> Result<()> {
        if is_process_alive(pid) {
            self.persist(
                name,
                InstanceMetaPatch::status(AgentStatus::Running)
                    .with_pid(Some(pid))
                    .with_started_at(Some(Utc::now())),
            )
            .await?;
            self.processes.lock().insert(
                name.to_string(),
                AgentProcess {
                    pid,
                    workspace_dir: self.workspace_dir(name),
                    instance_name: name.to_string(),
                },
            );
            self.watcher.watch(name, pid);
            info!(name = %name, pid, previous_status = %status, "Reclaimed orphaned process");
        } else {
            self.persist(name, InstanceMetaPatch::default().with_pid(None))
                .await?;
            debug!(name = %name, pid, "Cleared pid of dead process");
        }
        Ok(())
    }

    async fn quarantine(&self, dir_name: &str) {
        let source = self.instances_dir.join(dir_name);
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let target = self.corrupted_dir.join(format!("{dir_name}-{stamp}"));

        let moved = async {
            tokio::fs::create_dir_all(&self.corrupted_dir).await?;
            tokio::fs::rename(&source, &target).await
        }
        .await;

        match moved {
            Ok(()) => warn!(
                name = %dir_name,
                target = %target.display(),
                "Moved corrupted instance to quarantine"
            ),
            Err(e) => error!(name = %dir_name, error = %e, "Failed to quarantine corrupted instance"),
        }
    }

    // ---- creation ----------------------------------------------------------

    pub async fn create_agent(
        &self,
        name: &str,
        template_name: &str,
        overrides: InstanceOverrides,
    ) -> Result<AgentInstanceMeta> {
        let _guard = self.lock_instance(name).await;
        self.create_locked(name, template_name, overrides).await
    }

    async fn create_locked(
        &self,
        name: &str,
        template_name: &str,
        overrides: InstanceOverrides,
    ) -> Result<AgentInstanceMeta> {
        let meta = self
            .initializer
            .create_instance(name, template_name, overrides)
            .await?;
        Ok(self.store(name, meta))
    }

    pub async fn get_or_create_agent(
        &self,
        name: &str,
        template_name: &str,
        overrides: InstanceOverrides,
    ) -> Result<InstanceLookup> {
        let _guard = self.lock_instance(name).await;
        if let Some(meta) = self.cached(name) {
            return Ok(InstanceLookup {
                meta,
                created: false,
            });
        }
        let lookup = self
            .initializer
            .find_or_create_instance(name, template_name, overrides)
            .await?;
        self.store(name, lookup.meta.clone());
        Ok(lookup)
    }

    // ---- start / stop ------------------------------------------------------

    /// Spawn the backend process of `name`.
    ///
    /// Any failure leaves the instance in `error` with no process behind it,
    /// and the call can simply be retried.
    pub async fn start_agent(&self, name: &str) -> Result<AgentInstanceMeta> {
        let _guard = self.lock_instance(name).await;
        self.start_locked(name).await
    }

    async fn start_locked(&self, name: &str) -> Result<AgentInstanceMeta> {
        let meta = self.require(name)?;
        if meta.status.is_active() {
            return Err(AgentError::AlreadyRunning(name.to_string()).into());
        }

        let starting = self
            .persist(name, InstanceMetaPatch::status(AgentStatus::Starting))
            .await?;

        match self.spawn_and_register(name, &starting).await {
            Ok(running) => Ok(running),
            Err(err) => {
                self.fail_start(name).await;
                let err = match err {
                    launch @ Error::Agent(AgentError::LaunchFailed { .. }) => launch,
                    other => Error::launch_failed(name, other),
                };
                error!(name = %name, error = %err, "Agent failed to start");
                Err(err)
            }
        }
    }

    async fn spawn_and_register(
        &self,
        name: &str,
        starting: &AgentInstanceMeta,
    ) -> Result<AgentInstanceMeta> {
        let process = self
            .launcher
            .launch(&self.workspace_dir(name), starting)
            .await?;
        let pid = process.pid;
        self.processes.lock().insert(name.to_string(), process);

        let running = self
            .persist(
                name,
                InstanceMetaPatch::status(AgentStatus::Running)
                    .with_pid(Some(pid))
                    .with_ownership(ProcessOwnership::Managed)
                    .with_started_at(Some(Utc::now())),
            )
            .await?;

        self.watcher.watch(name, pid);
        self.restart_tracker.record_start(name);
        info!(name = %name, pid, launch_mode = %running.launch_mode, "Agent started");
        Ok(running)
    }

    /// Undo a partial start: kill what was spawned, then record `error`.
    async fn fail_start(&self, name: &str) {
        self.watcher.unwatch(name);
        let spawned = self.processes.lock().remove(name);
        if let Some(process) = spawned {
            if let Err(e) = self.launcher.terminate(&process).await {
                warn!(name = %name, pid = process.pid, error = %e, "Failed to terminate process after failed start");
            }
        }

        let patch = InstanceMetaPatch::status(AgentStatus::Error)
            .with_pid(None)
            .with_started_at(None);
        if let Err(e) = self.persist(name, patch.clone()).await {
            warn!(name = %name, error = %e, "Failed to persist error status");
            if let Some(mut meta) = self.cached(name) {
                patch.apply(&mut meta);
                meta.updated_at = Utc::now();
                self.store(name, meta);
            }
        }
    }

    /// Stop the process of `name`. Stopping a stopped instance is a no-op
    /// that still leaves it `stopped` without a pid.
    pub async fn stop_agent(&self, name: &str) -> Result<AgentInstanceMeta> {
        let _guard = self.lock_instance(name).await;
        self.stop_locked(name).await
    }

    async fn stop_locked(&self, name: &str) -> Result<AgentInstanceMeta> {
        let meta = self.require(name)?;
        // Unwatch before anything else: an intentional stop is not a crash.
        self.watcher.unwatch(name);

        if !meta.status.is_active() {
            debug!(name = %name, status = %meta.status, "Agent not running, marking stopped");
            self.processes.lock().remove(name);
            return self.persist(name, Self::stopped_patch()).await;
        }

        if let Err(e) = self
            .persist(name, InstanceMetaPatch::status(AgentStatus::Stopping))
            .await
        {
            if let Some(pid) = meta.pid {
                self.watcher.watch(name, pid);
            }
            return Err(e);
        }

        let tracked = self.processes.lock().remove(name);
        let process = tracked.or_else(|| {
            meta.pid.map(|pid| AgentProcess {
                pid,
                workspace_dir: self.workspace_dir(name),
                instance_name: name.to_string(),
            })
        });
        if let Some(process) = process {
            if let Err(e) = self.launcher.terminate(&process).await {
                if is_process_alive(process.pid) {
                    self.restore_after_failed_stop(name, meta, process).await;
                    return Err(e);
                }
                warn!(name = %name, pid = process.pid, error = %e, "Terminate failed but process is gone");
            }
        }

        let stopped = self.persist(name, Self::stopped_patch()).await?;
        info!(name = %name, "Agent stopped");
        Ok(stopped)
    }

    /// Put a process that survived a failed stop back under supervision.
    async fn restore_after_failed_stop(
        &self,
        name: &str,
        previous: AgentInstanceMeta,
        process: AgentProcess,
    ) {
        let pid = process.pid;
        let patch = InstanceMetaPatch::status(previous.status).with_pid(Some(pid));
        self.processes.lock().insert(name.to_string(), process);
        if let Err(e) = self.persist(name, patch).await {
            warn!(name = %name, error = %e, "Failed to persist restored status");
            self.store(name, previous);
        }
        self.watcher.watch(name, pid);
        warn!(name = %name, pid, "Stop failed, process still alive and supervised");
    }

    /// Stop every running instance, logging individual failures.
    pub async fn stop_all(&self) -> Result<()> {
        let running: Vec<String> = self
            .cache
            .lock()
            .values()
            .filter(|meta| meta.status.is_active())
            .map(|meta| meta.name.clone())
            .collect();

        let results = futures::future::join_all(running.iter().map(|name| self.stop_agent(name))).await;
        for (name, result) in running.iter().zip(results) {
            if let Err(e) = result {
                error!(name = %name, error = %e, "Error stopping agent");
            }
        }
        Ok(())
    }

    // ---- destroy -----------------------------------------------------------

    pub async fn destroy_agent(&self, name: &str) -> Result<()> {
        let _guard = self.lock_instance(name).await;
        self.destroy_locked(name).await
    }

    async fn destroy_locked(&self, name: &str) -> Result<()> {
        let meta = self.cached(name);
        if meta.is_none() && tokio::fs::symlink_metadata(self.workspace_dir(name)).await.is_err() {
            return Err(Error::not_found(name));
        }

        if meta.as_ref().is_some_and(|m| m.status.is_active()) {
            self.stop_locked(name).await?;
        }

        self.watcher.unwatch(name);
        self.restart_tracker.reset(name);
        self.initializer.destroy_instance(name).await?;
        self.cache.lock().remove(name);
        self.processes.lock().remove(name);
        info!(name = %name, "Agent destroyed");
        Ok(())
    }

    // ---- resolve / attach / detach -----------------------------------------

    /// Spawn information for a client that launches the backend itself.
    ///
    /// A missing instance is created from `template_name` when one is given.
    pub async fn resolve_agent(
        &self,
        name: &str,
        template_name: Option<&str>,
        overrides: InstanceOverrides,
    ) -> Result<ResolveResult> {
        let _guard = self.lock_instance(name).await;

        let (meta, created) = match (self.cached(name), template_name) {
            (Some(meta), _) => (meta, false),
            (None, Some(template)) => (self.create_locked(name, template, overrides).await?, true),
            (None, None) => return Err(Error::not_found(name)),
        };

        let workspace_dir = self.workspace_dir(name);
        let resolved =
            self.resolver
                .resolve(&meta.backend_type, &workspace_dir, meta.backend_config.as_ref())?;

        Ok(ResolveResult {
            workspace_dir,
            command: resolved.command,
            args: resolved.args,
            instance_name: name.to_string(),
            backend_type: meta.backend_type,
            created,
        })
    }

    /// Register a process spawned outside the manager.
    ///
    /// `metadata` is merged over the existing map, caller keys winning.
    pub async fn attach_agent(
        &self,
        name: &str,
        pid: u32,
        metadata: HashMap<String, String>,
    ) -> Result<AgentInstanceMeta> {
        let _guard = self.lock_instance(name).await;
        let meta = self.require(name)?;

        if meta.status == AgentStatus::Running && meta.pid.is_some() {
            return Err(AgentError::AlreadyAttached(name.to_string()).into());
        }
        if !is_process_alive(pid) {
            return Err(Error::launch_failed(
                name,
                format!("process {pid} does not exist"),
            ));
        }

        let mut merged = meta.metadata.clone();
        merged.extend(metadata);

        let attached = self
            .persist(
                name,
                InstanceMetaPatch::status(AgentStatus::Running)
                    .with_pid(Some(pid))
                    .with_ownership(ProcessOwnership::External)
                    .with_started_at(Some(Utc::now()))
                    .with_metadata(merged),
            )
            .await?;

        self.processes.lock().insert(
            name.to_string(),
            AgentProcess {
                pid,
                workspace_dir: self.workspace_dir(name),
                instance_name: name.to_string(),
            },
        );
        self.watcher.watch(name, pid);
        info!(name = %name, pid, "External process attached");
        Ok(attached)
    }

    /// Release an attached process without touching it.
    ///
    /// With `cleanup`, an ephemeral instance is destroyed as well.
    pub async fn detach_agent(&self, name: &str, cleanup: bool) -> Result<DetachResult> {
        let _guard = self.lock_instance(name).await;
        let meta = self.require(name)?;

        if meta.process_ownership != ProcessOwnership::External {
            return Err(AgentError::NotAttached(name.to_string()).into());
        }

        self.watcher.unwatch(name);
        self.processes.lock().remove(name);
        self.persist(
            name,
            Self::stopped_patch().with_ownership(ProcessOwnership::Managed),
        )
        .await?;
        info!(name = %name, pid = ?meta.pid, "External process detached");

        let workspace_cleaned = cleanup && meta.workspace_policy == WorkspacePolicy::Ephemeral;
        if workspace_cleaned {
            self.destroy_locked(name).await?;
        }
        Ok(DetachResult { workspace_cleaned })
    }

    // ---- exit handling -----------------------------------------------------

    /// React to a watched process that died.
    ///
    /// Intentional stops and stale pids are ignored. Otherwise the exit is
    /// recorded and the launch mode decides whether to restart or destroy.
    pub async fn handle_process_exit(&self, info: ProcessExitInfo) -> Result<()> {
        let name = info.instance_name.as_str();
        let follow_up = {
            let _guard = self.lock_instance(name).await;
            self.record_exit_locked(&info).await?
        };

        match follow_up {
            ExitFollowUp::Nothing => {}
            ExitFollowUp::Restart(decision) => {
                info!(
                    name = %name,
                    attempt = decision.attempt,
                    delay_ms = decision.delay_ms,
                    "Restarting agent after backoff"
                );
                delay(decision.delay()).await;
                self.restart_tracker.record_restart(name);
                match self.start_agent(name).await {
                    Ok(meta) => info!(name = %name, pid = ?meta.pid, attempt = decision.attempt, "Agent restarted"),
                    Err(e) => error!(name = %name, error = %e, "Agent restart failed"),
                }
            }
            ExitFollowUp::Destroy => match self.destroy_agent(name).await {
                Ok(()) => info!(name = %name, "One-shot agent destroyed after exit"),
                Err(e) => error!(name = %name, error = %e, "Auto-destroy failed"),
            },
        }
        Ok(())
    }

    async fn record_exit_locked(&self, info: &ProcessExitInfo) -> Result<ExitFollowUp> {
        let name = info.instance_name.as_str();
        let Some(meta) = self.cached(name) else {
            debug!(name = %name, "Exit for unknown instance ignored");
            return Ok(ExitFollowUp::Nothing);
        };
        if matches!(meta.status, AgentStatus::Stopping | AgentStatus::Stopped) {
            debug!(name = %name, status = %meta.status, "Exit after intentional stop ignored");
            return Ok(ExitFollowUp::Nothing);
        }
        if meta.pid != Some(info.pid) {
            debug!(name = %name, pid = info.pid, current = ?meta.pid, "Exit of a superseded process ignored");
            return Ok(ExitFollowUp::Nothing);
        }

        let exit_status = match meta.process_ownership {
            ProcessOwnership::External => AgentStatus::Crashed,
            ProcessOwnership::Managed => AgentStatus::Stopped,
        };
        let action = process_exit_action(meta.launch_mode, Some(&meta));
        warn!(
            name = %name,
            pid = info.pid,
            status = %exit_status,
            launch_mode = %meta.launch_mode,
            ?action,
            "Agent process exited unexpectedly"
        );

        let mut metadata = meta.metadata.clone();
        metadata.insert(EXITED_AT_KEY.to_string(), Utc::now().to_rfc3339());
        self.processes.lock().remove(name);
        self.persist(
            name,
            InstanceMetaPatch::status(exit_status)
                .with_pid(None)
                .with_started_at(None)
                .with_metadata(metadata),
        )
        .await?;

        Ok(match action {
            ProcessExitAction::MarkStopped => ExitFollowUp::Nothing,
            ProcessExitAction::Destroy => ExitFollowUp::Destroy,
            ProcessExitAction::Restart => {
                let decision = self.restart_tracker.should_restart(name);
                if decision.allowed {
                    ExitFollowUp::Restart(decision)
                } else {
                    self.persist(name, InstanceMetaPatch::status(AgentStatus::Error))
                        .await?;
                    error!(
                        name = %name,
                        attempts = decision.attempt,
                        "Restart limit reached, agent left in error state"
                    );
                    ExitFollowUp::Nothing
                }
            }
        })
    }

    // ---- queries -----------------------------------------------------------

    pub fn get_agent(&self, name: &str) -> Option<AgentView> {
        self.cached(name).map(|meta| AgentView {
            workspace_dir: self.workspace_dir(name),
            meta,
        })
    }

    pub fn list_agents(&self) -> Vec<AgentView> {
        let mut metas: Vec<AgentInstanceMeta> = self.cache.lock().values().cloned().collect();
        metas.sort_by(|a, b| a.name.cmp(&b.name));
        metas
            .into_iter()
            .map(|meta| AgentView {
                workspace_dir: self.workspace_dir(&meta.name),
                meta,
            })
            .collect()
    }

    pub fn get_status(&self, name: &str) -> Option<AgentStatus> {
        self.cache.lock().get(name).map(|meta| meta.status)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    /// Put a record adopted from elsewhere into the cache as-is.
    pub fn register_adopted(&self, meta: AgentInstanceMeta) {
        info!(name = %meta.name, status = %meta.status, "Adopted instance registered");
        let name = meta.name.clone();
        self.store(&name, meta);
    }

    pub fn restart_count(&self, name: &str) -> u32 {
        self.restart_tracker.get_restart_count(name)
    }

    pub fn is_watching(&self, name: &str) -> bool {
        self.watcher.is_watching(name)
    }

    /// Whether exit polling is active.
    pub fn is_supervising(&self) -> bool {
        self.watcher.is_running()
    }

    /// Stop the watcher and forget restart history. Running processes and
    /// in-flight operations are left alone.
    pub fn dispose(&self) {
        self.watcher.dispose();
        self.restart_tracker.dispose();
        info!("AgentManager disposed");
    }
}
