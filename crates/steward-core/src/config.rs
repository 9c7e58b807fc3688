//! Manager configuration
//!
//! Loaded from a JSON file (missing file means defaults), then overridden by
//! `STEWARD_*` environment variables.

use crate::error::{ConfigError, Error, Result};
use crate::types::LaunchMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const ENV_INSTANCES_DIR: &str = "STEWARD_INSTANCES_DIR";
pub const ENV_POLL_INTERVAL_MS: &str = "STEWARD_POLL_INTERVAL_MS";
pub const ENV_LOG: &str = "STEWARD_LOG";

/// Restart policy for crashed `acp-service` instances
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RestartPolicy {
    /// Restarts allowed before giving up
    pub max_restarts: u32,
    /// Base of the exponential backoff
    pub backoff_base_ms: u64,
    /// Backoff cap
    pub backoff_max_ms: u64,
    /// Running this long without a crash resets the counter
    pub reset_after_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
            reset_after_ms: 300_000,
        }
    }
}

/// Process launcher timings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct LauncherConfig {
    /// Delay after spawn before checking the process is still alive
    pub spawn_verify_delay_ms: u64,
    /// Grace period between SIGTERM and SIGKILL
    pub terminate_timeout_ms: u64,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            spawn_verify_delay_ms: 500,
            terminate_timeout_ms: 5_000,
        }
    }
}

impl LauncherConfig {
    pub fn spawn_verify_delay(&self) -> Duration {
        Duration::from_millis(self.spawn_verify_delay_ms)
    }

    pub fn terminate_timeout(&self) -> Duration {
        Duration::from_millis(self.terminate_timeout_ms)
    }
}

/// Top-level configuration for an `AgentManager`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagerConfig {
    pub instances_dir: PathBuf,
    /// Quarantine for corrupted instances; `{instances_dir}/.corrupted` when unset
    pub corrupted_dir: Option<PathBuf>,
    pub default_launch_mode: LaunchMode,
    pub watcher_poll_interval_ms: u64,
    pub restart_policy: RestartPolicy,
    pub launcher: LauncherConfig,
    /// Directory of template JSON files (daemon only)
    pub templates_dir: Option<PathBuf>,
    /// Log filter directive (daemon only)
    pub log_level: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            instances_dir: default_home().join("instances"),
            corrupted_dir: None,
            default_launch_mode: LaunchMode::Direct,
            watcher_poll_interval_ms: 5_000,
            restart_policy: RestartPolicy::default(),
            launcher: LauncherConfig::default(),
            templates_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl ManagerConfig {
    /// Config rooted at `instances_dir`, everything else default.
    pub fn with_instances_dir(instances_dir: impl Into<PathBuf>) -> Self {
        Self {
            instances_dir: instances_dir.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON file, apply environment overrides, and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Self>(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(Error::Io(e)),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_INSTANCES_DIR).filter(|v| !v.trim().is_empty()) {
            self.instances_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            self.watcher_poll_interval_ms = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_POLL_INTERVAL_MS} must be an integer, got {raw:?}"))
            })?;
        }
        if let Some(level) = lookup(ENV_LOG).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.instances_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("instancesDir is required".into()).into());
        }
        if self.watcher_poll_interval_ms == 0 {
            return Err(
                ConfigError::Invalid("watcherPollIntervalMs must be greater than zero".into()).into(),
            );
        }
        if self.restart_policy.backoff_base_ms > self.restart_policy.backoff_max_ms {
            return Err(ConfigError::Invalid(
                "restartPolicy.backoffBaseMs must not exceed backoffMaxMs".into(),
            )
            .into());
        }
        Ok(())
    }

    pub fn corrupted_dir(&self) -> PathBuf {
        self.corrupted_dir
            .clone()
            .unwrap_or_else(|| self.instances_dir.join(".corrupted"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watcher_poll_interval_ms)
    }
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".steward")
}
