//! Outgoing save payload and the policy deciding when it is sent.
//!
//! ## Dispatch policies
//!
//! - `Immediate`: one save per accepted tap (the default).
//! - `Debounced`: every tap re-arms a quiet window; the latest state goes out
//!   once the window passes without another tap.
//! - `Periodic`: the latest pending state goes out at most once per interval.
//!
//! Time comes from the frame loop via [`SaveScheduler::poll`]; the scheduler
//! never starts timers of its own. A request is stamped by the first poll
//! that sees it. Whatever is pending can be forced out with
//! [`SaveScheduler::flush`] (page hidden, host viewport collapsed).

use serde::{Deserialize, Serialize};

use super::identity::UserId;
use super::state::GameState;

/// Debounce window used when the config selects `debounced` without a value.
pub const DEFAULT_DEBOUNCE_MS: u32 = 1500;

/// Period used when the config selects `periodic` without a value.
pub const DEFAULT_PERIOD_MS: u32 = 10_000;

/// Body of `POST /api/save_score`. Score and energy are floored.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SaveScore {
    pub user_id: UserId,
    pub score: u64,
    pub energy: u64,
    pub level: u32,
}

impl SaveScore {
    pub fn from_state(user_id: UserId, state: &GameState) -> Self {
        Self {
            user_id,
            score: state.score.max(0.0).floor() as u64,
            energy: state.energy.max(0.0).floor() as u64,
            level: state.level,
        }
    }
}

fn default_debounce_ms() -> u32 {
    DEFAULT_DEBOUNCE_MS
}

fn default_period_ms() -> u32 {
    DEFAULT_PERIOD_MS
}

/// When accepted taps turn into save requests.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SavePolicy {
    #[default]
    Immediate,
    Debounced {
        #[serde(default = "default_debounce_ms")]
        quiet_ms: u32,
    },
    Periodic {
        #[serde(default = "default_period_ms")]
        interval_ms: u32,
    },
}

/// Holds at most one pending save and releases it according to the policy.
#[derive(Debug)]
pub struct SaveScheduler {
    policy: SavePolicy,
    pending: Option<SaveScore>,
    /// Debounce: when the latest request was first seen by `poll`.
    stamp_ms: Option<f64>,
    /// Periodic: when the last save left.
    last_sent_ms: Option<f64>,
}

impl SaveScheduler {
    pub fn new(policy: SavePolicy) -> Self {
        Self {
            policy,
            pending: None,
            stamp_ms: None,
            last_sent_ms: None,
        }
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    #[cfg(test)]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Record the state after an accepted tap. Returns the save to send right
    /// now, which only happens under `Immediate`.
    pub fn request(&mut self, save: SaveScore) -> Option<SaveScore> {
        match self.policy {
            SavePolicy::Immediate => Some(save),
            SavePolicy::Debounced { .. } => {
                self.pending = Some(save);
                self.stamp_ms = None;
                None
            }
            SavePolicy::Periodic { .. } => {
                self.pending = Some(save);
                None
            }
        }
    }

    /// Called once per frame. Returns a save whose time has come.
    pub fn poll(&mut self, now_ms: f64) -> Option<SaveScore> {
        self.pending.as_ref()?;
        match self.policy {
            SavePolicy::Immediate => self.pending.take(),
            SavePolicy::Debounced { quiet_ms } => {
                let stamp = *self.stamp_ms.get_or_insert(now_ms);
                if now_ms - stamp >= quiet_ms as f64 {
                    self.stamp_ms = None;
                    self.pending.take()
                } else {
                    None
                }
            }
            SavePolicy::Periodic { interval_ms } => {
                let due = self
                    .last_sent_ms
                    .map_or(true, |sent| now_ms - sent >= interval_ms as f64);
                if due {
                    self.last_sent_ms = Some(now_ms);
                    self.pending.take()
                } else {
                    None
                }
            }
        }
    }

    /// Release whatever is pending, regardless of policy.
    pub fn flush(&mut self) -> Option<SaveScore> {
        self.stamp_ms = None;
        self.pending.take()
    }
}
