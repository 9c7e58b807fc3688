//! Agent lifecycle management
//!
//! This module handles:
//! - The instance state machine (create/start/stop/destroy/attach/detach)
//! - Crash handling and restart backoff
//! - Exit and recovery policy per launch mode

mod launch_mode;
mod manager;
mod restart;

pub use launch_mode::{
    process_exit_action, recovery_action, ProcessExitAction, RecoveryAction, AUTO_DESTROY_KEY,
    EXITED_AT_KEY,
};
pub use manager::AgentManager;
pub use restart::{RestartDecision, RestartTracker};
