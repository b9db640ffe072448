//! Retry-bounded action formatting.
//!
//! Wraps one "propose an action" call and feeds validator rejections back as
//! corrective guidance until an action is accepted or the attempt ceiling is
//! reached. Feedback is an explicit ordered sequence handed to every
//! attempt — the whole history, not just the latest rejection, so the
//! proposer cannot oscillate between two wrong guesses. Attempts are
//! strictly sequential: each one depends on the previous rejection.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::validator::{ActionValidator, RejectionReason, ValidationVerdict};
use super::ProposedAction;
use crate::errors::BridgeError;
use crate::types::Task;

/// Fixed attempt ceiling.
pub const MAX_FORMAT_ATTEMPTS: u32 = 3;

/// One rejected attempt, as handed back to the proposer on the next try.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionFeedback {
    /// 1-based attempt number.
    pub attempt: u32,
    pub reason: RejectionReason,
    pub correction: String,
    /// Raw textual form of the rejected proposal.
    pub raw: String,
    /// How long the attempt took, proposal plus validation.
    pub attempt_ms: u64,
}

/// Terminal failure carrying the full rejection history. The history length
/// equals the number of attempts made.
#[derive(Debug, Clone, Error)]
#[error("no structurally valid action after {} attempts", .attempts.len())]
pub struct FormattingFailure {
    pub attempts: Vec<RejectionFeedback>,
}

/// An accepted action plus the per-attempt record that led to it. The caller
/// aggregates the timings: a task can look state-frozen from outside while
/// it is cycling through formatting retries in here.
#[derive(Debug, Clone)]
pub struct FormattedAction {
    pub action: ProposedAction,
    /// Rejections that preceded acceptance, oldest first. Empty on a
    /// first-attempt success.
    pub rejections: Vec<RejectionFeedback>,
    pub total_ms: u64,
}

/// Source of action proposals — the remote agent's decision step.
#[async_trait]
pub trait ActionProposer: Send + Sync {
    /// Produce one proposal for the task, given all prior rejections.
    async fn propose(
        &self,
        task: &Task,
        feedback: &[RejectionFeedback],
    ) -> Result<ProposedAction, BridgeError>;
}

#[derive(Debug, Clone)]
pub struct ActionFormatter {
    validator: ActionValidator,
}

impl ActionFormatter {
    pub fn new(validator: ActionValidator) -> Self {
        Self { validator }
    }

    /// Drive the proposer until a proposal validates or the ceiling is hit.
    ///
    /// Returns the accepted action immediately on success — no further
    /// attempts are made. On exhaustion the failure carries every rejection.
    /// Proposer transport errors propagate as-is; they are not formatting
    /// rejections.
    pub async fn format_action(
        &self,
        task: &Task,
        proposer: &dyn ActionProposer,
    ) -> Result<FormattedAction, BridgeError> {
        let started = Instant::now();
        let mut feedback: Vec<RejectionFeedback> = Vec::new();

        for attempt in 1..=MAX_FORMAT_ATTEMPTS {
            let attempt_started = Instant::now();
            let action = proposer.propose(task, &feedback).await?;
            let attempt_ms = attempt_started.elapsed().as_millis() as u64;

            match self.validator.validate(&action, task) {
                ValidationVerdict::Accepted => {
                    if attempt > 1 {
                        debug!(
                            task_id = %task.task_id,
                            attempt,
                            "action accepted after correction"
                        );
                    }
                    return Ok(FormattedAction {
                        action,
                        rejections: feedback,
                        total_ms: started.elapsed().as_millis() as u64,
                    });
                }
                ValidationVerdict::Rejected { reason, correction } => {
                    warn!(
                        task_id = %task.task_id,
                        attempt,
                        max_attempts = MAX_FORMAT_ATTEMPTS,
                        ?reason,
                        %correction,
                        "proposed action rejected"
                    );
                    feedback.push(RejectionFeedback {
                        attempt,
                        reason,
                        correction,
                        raw: action.raw,
                        attempt_ms,
                    });
                }
            }
        }

        Err(FormattingFailure { attempts: feedback }.into())
    }
}
