//! Crash-restart accounting with exponential backoff

use crate::config::RestartPolicy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Answer to "may this instance be restarted now?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartDecision {
    pub allowed: bool,
    pub delay_ms: u64,
    /// 1-based number of the restart about to happen (or the count reached when denied)
    pub attempt: u32,
}

impl RestartDecision {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Default)]
struct RestartState {
    count: u32,
    last_restart_at: Option<Instant>,
    last_start_at: Option<Instant>,
}

/// Per-instance restart counters. Instances never affect each other.
pub struct RestartTracker {
    policy: RestartPolicy,
    states: Mutex<HashMap<String, RestartState>>,
}

impl RestartTracker {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &RestartPolicy {
        &self.policy
    }

    pub fn should_restart(&self, instance_name: &str) -> RestartDecision {
        let mut states = self.states.lock();
        let state = states.entry(instance_name.to_string()).or_default();

        if let Some(started) = state.last_start_at {
            let stable = started.elapsed();
            if stable >= Duration::from_millis(self.policy.reset_after_ms) {
                info!(
                    name = %instance_name,
                    stable_ms = stable.as_millis() as u64,
                    "Resetting restart counter, instance was stable"
                );
                state.count = 0;
            }
        }

        if state.count >= self.policy.max_restarts {
            warn!(
                name = %instance_name,
                count = state.count,
                max_restarts = self.policy.max_restarts,
                "Restart limit exceeded"
            );
            return RestartDecision {
                allowed: false,
                delay_ms: 0,
                attempt: state.count,
            };
        }

        RestartDecision {
            allowed: true,
            delay_ms: self.backoff_ms(state.count),
            attempt: state.count + 1,
        }
    }

    pub fn record_restart(&self, instance_name: &str) {
        let mut states = self.states.lock();
        let state = states.entry(instance_name.to_string()).or_default();
        state.count += 1;
        state.last_restart_at = Some(Instant::now());
        debug!(name = %instance_name, count = state.count, "Restart recorded");
    }

    /// Starts the stability clock once a process is confirmed running.
    pub fn record_start(&self, instance_name: &str) {
        self.states
            .lock()
            .entry(instance_name.to_string())
            .or_default()
            .last_start_at = Some(Instant::now());
    }

    pub fn reset(&self, instance_name: &str) {
        self.states.lock().remove(instance_name);
    }

    pub fn get_restart_count(&self, instance_name: &str) -> u32 {
        self.states
            .lock()
            .get(instance_name)
            .map(|s| s.count)
            .unwrap_or(0)
    }

    pub fn last_restart_at(&self, instance_name: &str) -> Option<Instant> {
        self.states
            .lock()
            .get(instance_name)
            .and_then(|s| s.last_restart_at)
    }

    pub fn dispose(&self) {
        self.states.lock().clear();
    }

    fn backoff_ms(&self, count: u32) -> u64 {
        let factor = 1u64.checked_shl(count).unwrap_or(u64::MAX);
        self.policy
            .backoff_base_ms
            .saturating_mul(factor)
            .min(self.policy.backoff_max_ms)
    }
}
