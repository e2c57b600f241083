//! Failure policy: what to do with the backing job after a failed report.
//!
//! Pure decision, like the retry decider it replaces: given the counter
//! before the failure, return the new counter and the lifecycle action.
//! Executing the action is the coordinator's job.

use serde::{Deserialize, Serialize};

/// Reset the backing job every this many consecutive failures.
pub const DEFAULT_RESET_EVERY: u32 = 25;

/// Delete the backing job when the counter reaches this value.
pub const DEFAULT_GIVE_UP_AT: u32 = 3500;

/// Lifecycle action requested by one failed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Only bump the counter.
    Record,

    /// Re-issue the backing job; the worker looks wedged.
    ResetJob,

    /// Delete the backing job for good; an operator has to step in.
    GiveUp,

    /// Already gave up earlier; the counter stays where it is.
    AlreadyGivenUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureDecision {
    pub failed_attempts: u32,
    pub action: FailureAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailurePolicy {
    pub reset_every: u32,
    pub give_up_at: u32,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            reset_every: DEFAULT_RESET_EVERY,
            give_up_at: DEFAULT_GIVE_UP_AT,
        }
    }
}

impl FailurePolicy {
    pub fn new(reset_every: u32, give_up_at: u32) -> Self {
        Self {
            reset_every,
            give_up_at,
        }
    }

    /// Decide for one more failure on top of `failed_attempts`.
    ///
    /// Give-up takes precedence over reset when both land on the same count.
    pub fn on_failure(&self, failed_attempts: u32) -> FailureDecision {
        if failed_attempts >= self.give_up_at {
            return FailureDecision {
                failed_attempts,
                action: FailureAction::AlreadyGivenUp,
            };
        }

        let next = failed_attempts + 1;
        let action = if next == self.give_up_at {
            FailureAction::GiveUp
        } else if self.reset_every > 0 && next % self.reset_every == 0 {
            FailureAction::ResetJob
        } else {
            FailureAction::Record
        };

        FailureDecision {
            failed_attempts: next,
            action,
        }
    }
}
