//! Structural validation of proposed actions.
//!
//! Rules apply in a fixed order: an unrecognized kind is rejected before
//! category fit is judged, since an unknown action cannot be meaningfully
//! judged for category; parameters are checked last.

use serde::{Deserialize, Serialize};

use super::{ActionVocabulary, ProposedAction, COMPLETE_TASK, GENERAL_EXECUTION, LAUNCH_APP};
use crate::types::{Task, TaskComplexity};

/// Structural defect classes the validator can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    UnknownAction,
    WrongCategory,
    MissingParameter,
}

/// Outcome of validating one proposed action. Never persisted; consumed by
/// the retry-bounded formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationVerdict {
    Accepted,
    Rejected {
        reason: RejectionReason,
        /// Human-readable correction naming the expected action, with a
        /// worked example where one helps.
        correction: String,
    },
}

#[derive(Debug, Clone)]
pub struct ActionValidator {
    vocabulary: ActionVocabulary,
}

impl ActionValidator {
    pub fn new(vocabulary: ActionVocabulary) -> Self {
        Self { vocabulary }
    }

    pub fn validate(&self, action: &ProposedAction, task: &Task) -> ValidationVerdict {
        let Some(spec) = self.vocabulary.get(&action.kind) else {
            return ValidationVerdict::Rejected {
                reason: RejectionReason::UnknownAction,
                correction: format!(
                    "\"{}\" is not a recognized action; use one of: {}",
                    action.kind,
                    self.vocabulary.names().join(", ")
                ),
            };
        };

        // The catch-all is reserved for genuinely multi-step work. A single
        // atomic GUI operation must use the specific simple action.
        if action.kind == GENERAL_EXECUTION {
            match task.complexity {
                TaskComplexity::AtomicAppLaunch => {
                    return ValidationVerdict::Rejected {
                        reason: RejectionReason::WrongCategory,
                        correction: format!(
                            "this task opens a single application; use {} instead, e.g. \
                             {{\"action\": \"{}\", \"params\": {{\"app_name\": \"Safari\"}}}}",
                            LAUNCH_APP, LAUNCH_APP
                        ),
                    };
                }
                TaskComplexity::AtomicAcknowledgment => {
                    return ValidationVerdict::Rejected {
                        reason: RejectionReason::WrongCategory,
                        correction: format!(
                            "this task is a plain acknowledgment; use {} instead, e.g. \
                             {{\"action\": \"{}\", \"params\": {{}}}}",
                            COMPLETE_TASK, COMPLETE_TASK
                        ),
                    };
                }
                TaskComplexity::MultiStep => {}
            }
        }

        for param in &spec.required_params {
            let missing = action
                .params
                .get(param)
                .map(|value| value.trim().is_empty())
                .unwrap_or(true);
            if missing {
                return ValidationVerdict::Rejected {
                    reason: RejectionReason::MissingParameter,
                    correction: format!(
                        "action \"{}\" requires a non-empty \"{}\" parameter",
                        action.kind, param
                    ),
                };
            }
        }

        ValidationVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionMode;

    fn validator() -> ActionValidator {
        ActionValidator::new(ActionVocabulary::builtin())
    }

    fn task(request: &str) -> Task {
        Task::new(request, ExecutionMode::Remote)
    }

    fn rejected_with(verdict: ValidationVerdict, expected: RejectionReason) -> String {
        match verdict {
            ValidationVerdict::Rejected { reason, correction } => {
                assert_eq!(reason, expected);
                correction
            }
            ValidationVerdict::Accepted => panic!("expected rejection"),
        }
    }

    #[test]
    fn unknown_action_is_rejected_first() {
        // An unknown kind with "general" flavor is reported as unknown, not
        // as a category problem.
        let action = ProposedAction::new("general-eval");
        let correction = rejected_with(
            validator().validate(&action, &task("Say hello")),
            RejectionReason::UnknownAction,
        );
        assert!(correction.contains("launch-app"));
        assert!(correction.contains("general-execution"));
    }

    #[test]
    fn general_execution_rejected_for_acknowledgment() {
        let action = ProposedAction::new(GENERAL_EXECUTION);
        let correction = rejected_with(
            validator().validate(&action, &task("Say hello")),
            RejectionReason::WrongCategory,
        );
        assert!(correction.contains(COMPLETE_TASK));
    }

    #[test]
    fn general_execution_rejected_for_app_launch() {
        let action = ProposedAction::new(GENERAL_EXECUTION);
        let correction = rejected_with(
            validator().validate(&action, &task("Open Safari")),
            RejectionReason::WrongCategory,
        );
        assert!(correction.contains(LAUNCH_APP));
    }

    #[test]
    fn general_execution_accepted_for_multi_step() {
        let action = ProposedAction::new(GENERAL_EXECUTION);
        let verdict = validator().validate(&action, &task("summarize my inbox and file the receipts"));
        assert_eq!(verdict, ValidationVerdict::Accepted);
    }

    #[test]
    fn missing_required_parameter_is_rejected() {
        let action = ProposedAction::new("launch-app");
        let correction = rejected_with(
            validator().validate(&action, &task("Open Safari")),
            RejectionReason::MissingParameter,
        );
        assert!(correction.contains("app_name"));
    }

    #[test]
    fn empty_parameter_counts_as_missing() {
        let action = ProposedAction::new("type-text").with_param("text", "   ");
        rejected_with(
            validator().validate(&action, &task("type my standard greeting into the chat box")),
            RejectionReason::MissingParameter,
        );
    }

    #[test]
    fn well_formed_action_is_accepted() {
        let action = ProposedAction::new("launch-app").with_param("app_name", "Safari");
        assert_eq!(
            validator().validate(&action, &task("Open Safari")),
            ValidationVerdict::Accepted
        );
    }

    #[test]
    fn corrected_acknowledgment_is_accepted() {
        let action = ProposedAction::new(COMPLETE_TASK);
        assert_eq!(
            validator().validate(&action, &task("Say hello")),
            ValidationVerdict::Accepted
        );
    }
}
