//! Polling process watcher
//!
//! A single background task checks every watched pid once per interval and
//! reports dead ones to a [`ProcessExitHandler`]. Exits found in one poll are
//! handled strictly one after another, and a poll never overlaps the next.

use super::utils::is_process_alive;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A watched process that is no longer alive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExitInfo {
    pub instance_name: String,
    pub pid: u32,
}

/// Receives exits detected by the watcher
#[async_trait]
pub trait ProcessExitHandler: Send + Sync + 'static {
    async fn on_process_exit(&self, info: ProcessExitInfo) -> Result<()>;
}

struct WatcherState {
    watches: Mutex<HashMap<String, u32>>,
    handler: Arc<dyn ProcessExitHandler>,
    polling: AtomicBool,
}

/// Clears the in-flight flag even if the poll task is aborted mid-await.
struct PollGuard<'a>(&'a AtomicBool);

impl Drop for PollGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl WatcherState {
    async fn poll(&self) {
        if self.polling.swap(true, Ordering::SeqCst) {
            debug!("Previous poll still in flight, skipping");
            return;
        }
        let _guard = PollGuard(&self.polling);

        // Detection and removal happen under one lock: once a pid is seen
        // dead its handler fires, even if it is unwatched right after.
        let exited: Vec<ProcessExitInfo> = {
            let mut watches = self.watches.lock();
            let dead: Vec<ProcessExitInfo> = watches
                .iter()
                .filter(|(_, pid)| !is_process_alive(**pid))
                .map(|(name, pid)| ProcessExitInfo {
                    instance_name: name.clone(),
                    pid: *pid,
                })
                .collect();
            for info in &dead {
                watches.remove(&info.instance_name);
            }
            dead
        };

        for info in exited {
            info!(name = %info.instance_name, pid = info.pid, "Process exited, removed from watch list");

            let name = info.instance_name.clone();
            let pid = info.pid;
            let handler = Arc::clone(&self.handler);
            // Run on its own task so a panic is contained and an aborted
            // watcher loop does not cancel an exit that is being handled.
            let outcome = tokio::spawn(async move { handler.on_process_exit(info).await }).await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!(name = %name, pid, error = %e, "Error in process exit handler")
                }
                Err(e) => error!(name = %name, pid, error = %e, "Process exit handler panicked"),
            }
        }
    }
}

/// Periodically polls tracked pids and fires the handler on exit
pub struct ProcessWatcher {
    state: Arc<WatcherState>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessWatcher {
    pub fn new(handler: Arc<dyn ProcessExitHandler>, poll_interval: Duration) -> Self {
        Self {
            state: Arc::new(WatcherState {
                watches: Mutex::new(HashMap::new()),
                handler,
                polling: AtomicBool::new(false),
            }),
            poll_interval,
            task: Mutex::new(None),
        }
    }

    /// Start or replace the watch for `instance_name`.
    pub fn watch(&self, instance_name: &str, pid: u32) {
        self.state
            .watches
            .lock()
            .insert(instance_name.to_string(), pid);
        debug!(name = %instance_name, pid, "Watching process");
    }

    /// Returns whether a watch existed.
    pub fn unwatch(&self, instance_name: &str) -> bool {
        let removed = self.state.watches.lock().remove(instance_name).is_some();
        if removed {
            debug!(name = %instance_name, "Unwatched process");
        }
        removed
    }

    pub fn is_watching(&self, instance_name: &str) -> bool {
        self.state.watches.lock().contains_key(instance_name)
    }

    pub fn watched_pid(&self, instance_name: &str) -> Option<u32> {
        self.state.watches.lock().get(instance_name).copied()
    }

    pub fn watch_count(&self) -> usize {
        self.state.watches.lock().len()
    }

    /// Spawn the polling task. Must be called inside a Tokio runtime.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let state = Arc::clone(&self.state);
        let period = self.poll_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                state.poll().await;
            }
        }));

        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "ProcessWatcher started"
        );
    }

    /// Stop the timer. An exit handler already running is left to finish.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            info!("ProcessWatcher stopped");
        }
    }

    pub fn dispose(&self) {
        self.stop();
        self.state.watches.lock().clear();
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Run one poll cycle now; a no-op while another cycle is in flight.
    pub async fn poll_now(&self) {
        self.state.poll().await;
    }
}

impl Drop for ProcessWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
