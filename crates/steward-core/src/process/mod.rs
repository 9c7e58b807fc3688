//! OS process supervision
//!
//! This module handles:
//! - Liveness probes and signal delivery
//! - Spawning and terminating backend processes
//! - Resolving backend commands
//! - Polling for process exits

mod launcher;
mod resolver;
mod utils;
mod watcher;

pub use launcher::{AgentLauncher, AgentProcess, ProcessLauncher};
pub use resolver::{CommandResolver, DefaultCommandResolver, ResolvedCommand};
pub use utils::{delay, is_process_alive, send_signal, signal_process_tree, Signal};
pub use watcher::{ProcessExitHandler, ProcessExitInfo, ProcessWatcher, DEFAULT_POLL_INTERVAL};
