//! Bounded, sliding-window reconnect budget.
//!
//! Auto-recovery after a transient connection error is rate-limited: at
//! most `max_attempts` reconnects within a rolling `window`, tracked
//! per run in a session-scoped store so a re-created client in the same
//! session cannot sidestep the budget. Once the budget is exhausted the
//! client surfaces a failed state with a manual-retry affordance
//! instead of looping.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use runscope_protocol::{DEFAULT_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_WINDOW_SECS};

/// Reconnect rate limit parameters.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryPolicy {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            window: Duration::from_secs(DEFAULT_RECONNECT_WINDOW_SECS),
        }
    }
}

/// Sliding-window attempt tracker for one run.
#[derive(Debug)]
pub struct ReconnectBudget {
    policy: RecoveryPolicy,
    attempts: VecDeque<Instant>,
}

impl ReconnectBudget {
    pub fn new(policy: RecoveryPolicy) -> Self {
        Self {
            policy,
            attempts: VecDeque::new(),
        }
    }

    /// Record one reconnect attempt if the window allows it.
    pub fn try_acquire(&mut self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&mut self, now: Instant) -> bool {
        while let Some(&front) = self.attempts.front() {
            if now.duration_since(front) > self.policy.window {
                self.attempts.pop_front();
            } else {
                break;
            }
        }
        if self.attempts.len() < self.policy.max_attempts as usize {
            self.attempts.push_back(now);
            true
        } else {
            false
        }
    }

    /// Clear recorded attempts, used by the manual-retry affordance.
    pub fn reset(&mut self) {
        self.attempts.clear();
    }
}

/// Session-scoped store of per-run reconnect budgets.
#[derive(Debug, Default)]
pub struct SessionBudgets {
    budgets: HashMap<String, ReconnectBudget>,
}

impl SessionBudgets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&mut self, run_id: &str, policy: RecoveryPolicy) -> bool {
        self.budgets
            .entry(run_id.to_string())
            .or_insert_with(|| ReconnectBudget::new(policy))
            .try_acquire()
    }

    pub fn reset(&mut self, run_id: &str) {
        if let Some(budget) = self.budgets.get_mut(run_id) {
            budget.reset();
        }
    }
}
