//! Core data model for the dispatch bridge.
//!
//! A `Task` is one delegated unit of work, tracked from submission to a
//! terminal outcome. Tasks are owned by the dispatcher for the duration of a
//! request; once submitted remotely, the authoritative lifecycle state lives
//! in the remote execution state machine (`remote::state`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a request is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Requires GUI automation on the remote host.
    Remote,
    /// Answerable on the edge device without remote execution.
    Local,
}

/// Coarse complexity tag derived from the request phrasing.
///
/// Drives the validator's category rule: the catch-all `general-execution`
/// action is only acceptable for multi-step work, never for a single atomic
/// GUI operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    /// A single "open/launch <app>" style request.
    AtomicAppLaunch,
    /// A pure acknowledgment with no further action required.
    AtomicAcknowledgment,
    /// Anything involving navigation, data manipulation or several steps.
    MultiStep,
}

const LAUNCH_LEADS: &[&str] = &["open", "launch", "start"];
const ACK_PHRASES: &[&str] = &["hello", "hi", "thanks", "thank you", "ok", "okay"];

impl TaskComplexity {
    /// Infer a complexity tag from the raw request text.
    pub fn infer(request: &str) -> Self {
        let lower = request.trim().to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        if let Some(first) = words.first() {
            if LAUNCH_LEADS.contains(first) && words.len() <= 3 {
                return TaskComplexity::AtomicAppLaunch;
            }
            if *first == "say" || ACK_PHRASES.contains(&lower.as_str()) {
                return TaskComplexity::AtomicAcknowledgment;
            }
        }
        TaskComplexity::MultiStep
    }
}

/// One delegated unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    /// The original natural-language request.
    pub request: String,
    pub mode: ExecutionMode,
    pub complexity: TaskComplexity,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with a fresh id and an inferred complexity tag.
    pub fn new(request: impl Into<String>, mode: ExecutionMode) -> Self {
        let request = request.into();
        Self {
            task_id: format!("task_{}", uuid::Uuid::new_v4()),
            complexity: TaskComplexity::infer(&request),
            request,
            mode,
            created_at: Utc::now(),
        }
    }
}

/// Result payload reported by the remote side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub message: String,
    /// Opaque reference to an artifact produced remotely (e.g. a screenshot
    /// URL). Downloading it is the caller's choice.
    #[serde(default)]
    pub artifact_url: Option<String>,
}

impl TaskResult {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact_url: None,
        }
    }
}

/// Terminal outcome of a dispatched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded,
    Failed,
    /// The remote side did not reach a terminal state within the hard
    /// timeout. Distinct from `Failed`: the caller may simply retry later.
    TimedOut,
}

/// Output of the intent classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub mode: ExecutionMode,
    /// True when the deterministic keyword heuristic produced the label
    /// (inference unavailable or returned an unrecognized label).
    pub via_fallback: bool,
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_atomic_app_launch() {
        assert_eq!(
            TaskComplexity::infer("Open Safari"),
            TaskComplexity::AtomicAppLaunch
        );
        assert_eq!(
            TaskComplexity::infer("launch the calculator"),
            TaskComplexity::AtomicAppLaunch
        );
    }

    #[test]
    fn infers_acknowledgment() {
        assert_eq!(
            TaskComplexity::infer("Say hello"),
            TaskComplexity::AtomicAcknowledgment
        );
        assert_eq!(
            TaskComplexity::infer("thanks"),
            TaskComplexity::AtomicAcknowledgment
        );
    }

    #[test]
    fn long_requests_are_multi_step() {
        assert_eq!(
            TaskComplexity::infer("Open Safari and navigate to google.com"),
            TaskComplexity::MultiStep
        );
        assert_eq!(
            TaskComplexity::infer("text my brother that I will be late"),
            TaskComplexity::MultiStep
        );
    }

    #[test]
    fn task_ids_are_unique() {
        let a = Task::new("Open Safari", ExecutionMode::Remote);
        let b = Task::new("Open Safari", ExecutionMode::Remote);
        assert_ne!(a.task_id, b.task_id);
    }
}
