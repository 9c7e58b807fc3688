//! Exit and recovery policy per launch mode

use crate::types::{AgentInstanceMeta, LaunchMode};
use serde::Serialize;

/// Metadata flag that makes a one-shot instance remove itself on exit.
pub const AUTO_DESTROY_KEY: &str = "autoDestroy";

/// Metadata entry stamped when a watched process exits.
pub const EXITED_AT_KEY: &str = "exitedAt";

/// What to do after a watched process exits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessExitAction {
    MarkStopped,
    Restart,
    Destroy,
}

/// What to do with a stale running record found at daemon start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryAction {
    MarkStopped,
    Restart,
}

pub fn process_exit_action(mode: LaunchMode, meta: Option<&AgentInstanceMeta>) -> ProcessExitAction {
    match mode {
        LaunchMode::Direct | LaunchMode::AcpBackground => ProcessExitAction::MarkStopped,
        LaunchMode::AcpService => ProcessExitAction::Restart,
        LaunchMode::OneShot => {
            let auto_destroy = meta
                .and_then(|m| m.metadata_value(AUTO_DESTROY_KEY))
                .is_some_and(|v| v == "true");
            if auto_destroy {
                ProcessExitAction::Destroy
            } else {
                ProcessExitAction::MarkStopped
            }
        }
    }
}

pub fn recovery_action(mode: LaunchMode) -> RecoveryAction {
    match mode {
        LaunchMode::AcpService => RecoveryAction::Restart,
        LaunchMode::Direct | LaunchMode::AcpBackground | LaunchMode::OneShot => {
            RecoveryAction::MarkStopped
        }
    }
}
