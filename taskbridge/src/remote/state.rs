//! Lifecycle state machine for one delegated task.
//!
//! `submitted → running → done | failed`. Transitions are monotonic: once a
//! terminal state is reached, further events are absorbed (logged, never
//! applied). `last_changed_at` moves on every transition and only on a
//! transition. `advance` is the single mutation point and is meant to be
//! called by the owning execution loop only; `current()` snapshots may be
//! read freely from other tasks' loops.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{Task, TaskResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteTaskState {
    Submitted,
    Running,
    Done,
    Failed,
}

impl RemoteTaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteTaskState::Done | RemoteTaskState::Failed)
    }
}

/// Events the owning execution loop feeds into the machine.
#[derive(Debug, Clone)]
pub enum TaskEvent {
    Started,
    Completed(TaskResult),
    Failed(String),
}

/// Immutable snapshot of the machine at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub state: RemoteTaskState,
    pub last_changed_at: DateTime<Utc>,
    /// Latest result fragment, if any. For `failed` this carries the
    /// terminal reason as the message.
    pub result: Option<TaskResult>,
}

#[derive(Debug)]
struct Inner {
    state: RemoteTaskState,
    last_changed_at: DateTime<Utc>,
    result: Option<TaskResult>,
}

/// Cloneable handle to one task's lifecycle state. Clones share the same
/// underlying machine.
#[derive(Debug, Clone)]
pub struct TaskStateMachine {
    task_id: String,
    inner: Arc<RwLock<Inner>>,
}

impl TaskStateMachine {
    /// Create a machine for a freshly submitted task.
    pub fn submit(task: &Task) -> Self {
        Self {
            task_id: task.task_id.clone(),
            inner: Arc::new(RwLock::new(Inner {
                state: RemoteTaskState::Submitted,
                last_changed_at: Utc::now(),
                result: None,
            })),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn current(&self) -> TaskSnapshot {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        TaskSnapshot {
            state: inner.state,
            last_changed_at: inner.last_changed_at,
            result: inner.result.clone(),
        }
    }

    /// Apply one transition. Returns the snapshot after the event.
    ///
    /// A terminal event arriving while still `submitted` records the implied
    /// `running` transition first, so even a fast failure is observable as
    /// having passed through `running`.
    pub fn advance(&self, event: TaskEvent) -> TaskSnapshot {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        if inner.state.is_terminal() {
            warn!(
                task_id = %self.task_id,
                state = ?inner.state,
                event = ?event,
                "event ignored: task already terminal"
            );
        } else {
            match event {
                TaskEvent::Started => {
                    if inner.state == RemoteTaskState::Submitted {
                        Self::transition(&mut inner, RemoteTaskState::Running, None);
                    } else {
                        debug!(task_id = %self.task_id, "redundant start event ignored");
                    }
                }
                TaskEvent::Completed(result) => {
                    if inner.state == RemoteTaskState::Submitted {
                        Self::transition(&mut inner, RemoteTaskState::Running, None);
                    }
                    Self::transition(&mut inner, RemoteTaskState::Done, Some(result));
                }
                TaskEvent::Failed(reason) => {
                    if inner.state == RemoteTaskState::Submitted {
                        Self::transition(&mut inner, RemoteTaskState::Running, None);
                    }
                    Self::transition(
                        &mut inner,
                        RemoteTaskState::Failed,
                        Some(TaskResult::message(reason)),
                    );
                }
            }
        }

        TaskSnapshot {
            state: inner.state,
            last_changed_at: inner.last_changed_at,
            result: inner.result.clone(),
        }
    }

    fn transition(inner: &mut Inner, next: RemoteTaskState, result: Option<TaskResult>) {
        inner.state = next;
        inner.last_changed_at = Utc::now();
        if result.is_some() {
            inner.result = result;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionMode;

    fn machine() -> TaskStateMachine {
        TaskStateMachine::submit(&Task::new("Open Safari", ExecutionMode::Remote))
    }

    #[test]
    fn normal_lifecycle() {
        let machine = machine();
        assert_eq!(machine.current().state, RemoteTaskState::Submitted);

        let snapshot = machine.advance(TaskEvent::Started);
        assert_eq!(snapshot.state, RemoteTaskState::Running);

        let snapshot = machine.advance(TaskEvent::Completed(TaskResult::message("opened")));
        assert_eq!(snapshot.state, RemoteTaskState::Done);
        assert_eq!(snapshot.result.unwrap().message, "opened");
    }

    #[test]
    fn terminal_states_absorb_further_events() {
        let machine = machine();
        machine.advance(TaskEvent::Started);
        machine.advance(TaskEvent::Failed("window not found".to_string()));
        let failed_at = machine.current().last_changed_at;

        let snapshot = machine.advance(TaskEvent::Completed(TaskResult::message("late")));
        assert_eq!(snapshot.state, RemoteTaskState::Failed);
        assert_eq!(snapshot.result.unwrap().message, "window not found");
        // Absorbed events do not touch the timestamp either.
        assert_eq!(machine.current().last_changed_at, failed_at);
    }

    #[test]
    fn fast_failure_still_passes_through_running() {
        let machine = machine();
        let before = machine.current().last_changed_at;

        // Terminal event straight from `submitted`.
        let snapshot = machine.advance(TaskEvent::Failed("agent crashed".to_string()));
        assert_eq!(snapshot.state, RemoteTaskState::Failed);
        assert!(snapshot.last_changed_at >= before);
    }

    #[test]
    fn redundant_start_does_not_update_timestamp() {
        let machine = machine();
        let snapshot = machine.advance(TaskEvent::Started);
        let running_at = snapshot.last_changed_at;

        let snapshot = machine.advance(TaskEvent::Started);
        assert_eq!(snapshot.state, RemoteTaskState::Running);
        assert_eq!(snapshot.last_changed_at, running_at);
    }

    #[test]
    fn clones_share_state() {
        let machine = machine();
        let reader = machine.clone();
        machine.advance(TaskEvent::Started);
        assert_eq!(reader.current().state, RemoteTaskState::Running);
    }
}
