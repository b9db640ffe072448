//! Stuck detection and bounded polling of a delegated task.
//!
//! Two thresholds: a single long timeout cannot distinguish "slow but
//! progressing" from "wedged". The shorter stuck threshold surfaces an
//! operational warning early; the hard timeout bounds latency for the
//! caller no matter what the remote side is doing (including formatting
//! retries that consume time without a visible state change).

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::state::{RemoteTaskState, TaskSnapshot, TaskStateMachine};
use super::RemoteBackend;
use crate::errors::BridgeError;
use crate::types::TaskResult;

/// Polling budgets for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    pub poll_interval: Duration,
    /// No state change for this long emits a stuck warning (non-terminal).
    pub stuck_threshold: Duration,
    /// Elapsed time since submission after which the poller gives up.
    pub hard_timeout: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            stuck_threshold: Duration::from_secs(30),
            hard_timeout: Duration::from_secs(45),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Done(TaskResult),
    Failed(String),
    TimedOut,
}

/// Poll result plus observability counters.
#[derive(Debug, Clone, PartialEq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Number of stuck warnings emitted (at most one per stall).
    pub stuck_warnings: u32,
    pub elapsed: Duration,
}

/// Where snapshots come from. Lets the poller run against an in-memory
/// state machine in tests and a remote backend in production.
#[async_trait]
pub trait TaskStateSource: Send + Sync {
    async fn snapshot(&self) -> Result<TaskSnapshot, BridgeError>;

    fn task_id(&self) -> &str;
}

#[async_trait]
impl TaskStateSource for TaskStateMachine {
    async fn snapshot(&self) -> Result<TaskSnapshot, BridgeError> {
        Ok(self.current())
    }

    fn task_id(&self) -> &str {
        TaskStateMachine::task_id(self)
    }
}

/// Adapter polling a remote backend for one task id.
pub struct BackendStateSource {
    backend: std::sync::Arc<dyn RemoteBackend>,
    task_id: String,
}

impl BackendStateSource {
    pub fn new(backend: std::sync::Arc<dyn RemoteBackend>, task_id: impl Into<String>) -> Self {
        Self {
            backend,
            task_id: task_id.into(),
        }
    }
}

#[async_trait]
impl TaskStateSource for BackendStateSource {
    async fn snapshot(&self) -> Result<TaskSnapshot, BridgeError> {
        self.backend.get_state(&self.task_id).await
    }

    fn task_id(&self) -> &str {
        &self.task_id
    }
}

/// Poll until the task reaches a terminal state or the hard timeout fires.
///
/// Guaranteed to return within `hard_timeout + poll_interval`. Once the hard
/// timeout fires the outcome is `TimedOut` even if the remote side completed
/// in the meantime; a late completion is logged and discarded, never
/// surfaced as a stale success.
pub async fn poll_until_terminal(
    source: &dyn TaskStateSource,
    settings: PollerSettings,
) -> PollReport {
    let started = Instant::now();
    let mut ticker = interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut stuck_warnings = 0u32;
    let mut warned_for_stall = false;
    let mut last_observed: Option<(RemoteTaskState, chrono::DateTime<chrono::Utc>)> = None;
    // Tracked with the poller's own clock rather than snapshot wall-clock
    // timestamps, so a skewed remote clock cannot hide a stall.
    let mut last_change_seen = Instant::now();

    loop {
        ticker.tick().await;
        let elapsed = started.elapsed();

        if elapsed >= settings.hard_timeout {
            if let Ok(snapshot) = source.snapshot().await {
                if snapshot.state.is_terminal() {
                    debug!(
                        task_id = %source.task_id(),
                        state = ?snapshot.state,
                        "late completion discarded after hard timeout"
                    );
                }
            }
            warn!(
                task_id = %source.task_id(),
                elapsed_secs = elapsed.as_secs(),
                "task did not reach a terminal state within the hard timeout"
            );
            return PollReport {
                outcome: PollOutcome::TimedOut,
                stuck_warnings,
                elapsed,
            };
        }

        let snapshot = match source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Transport retries are the backend's concern; keep polling
                // until the hard timeout bounds the wait.
                warn!(task_id = %source.task_id(), error = %e, "state poll failed");
                continue;
            }
        };

        match snapshot.state {
            RemoteTaskState::Done => {
                return PollReport {
                    outcome: PollOutcome::Done(snapshot.result.unwrap_or_default()),
                    stuck_warnings,
                    elapsed,
                };
            }
            RemoteTaskState::Failed => {
                let reason = snapshot
                    .result
                    .map(|r| r.message)
                    .unwrap_or_else(|| "unspecified remote failure".to_string());
                return PollReport {
                    outcome: PollOutcome::Failed(reason),
                    stuck_warnings,
                    elapsed,
                };
            }
            RemoteTaskState::Submitted | RemoteTaskState::Running => {
                let observed = (snapshot.state, snapshot.last_changed_at);
                if last_observed != Some(observed) {
                    last_observed = Some(observed);
                    last_change_seen = Instant::now();
                    warned_for_stall = false;
                }

                let stalled_for = last_change_seen.elapsed();
                if stalled_for >= settings.stuck_threshold && !warned_for_stall {
                    warn!(
                        task_id = %source.task_id(),
                        state = ?snapshot.state,
                        stalled_secs = stalled_for.as_secs(),
                        "task appears stuck; continuing to poll until the hard timeout"
                    );
                    stuck_warnings += 1;
                    warned_for_stall = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn snapshot(state: RemoteTaskState, result: Option<TaskResult>) -> TaskSnapshot {
        TaskSnapshot {
            state,
            last_changed_at: chrono::Utc::now(),
            result,
        }
    }

    /// Source that replays a function of the call index.
    struct FakeSource<F: Fn(u32) -> Result<TaskSnapshot, BridgeError> + Send + Sync> {
        calls: AtomicU32,
        f: F,
    }

    impl<F: Fn(u32) -> Result<TaskSnapshot, BridgeError> + Send + Sync> FakeSource<F> {
        fn new(f: F) -> Self {
            Self {
                calls: AtomicU32::new(0),
                f,
            }
        }
    }

    #[async_trait]
    impl<F: Fn(u32) -> Result<TaskSnapshot, BridgeError> + Send + Sync> TaskStateSource
        for FakeSource<F>
    {
        async fn snapshot(&self) -> Result<TaskSnapshot, BridgeError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            (self.f)(call)
        }

        fn task_id(&self) -> &str {
            "task_fake"
        }
    }

    fn fast_settings() -> PollerSettings {
        PollerSettings {
            poll_interval: Duration::from_secs(2),
            stuck_threshold: Duration::from_secs(30),
            hard_timeout: Duration::from_secs(45),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_done_with_result() {
        let frozen = snapshot(RemoteTaskState::Running, None);
        let source = FakeSource::new(move |call| {
            if call < 2 {
                Ok(frozen.clone())
            } else {
                Ok(snapshot(
                    RemoteTaskState::Done,
                    Some(TaskResult::message("opened Safari")),
                ))
            }
        });

        let report = poll_until_terminal(&source, fast_settings()).await;
        assert_eq!(
            report.outcome,
            PollOutcome::Done(TaskResult::message("opened Safari"))
        );
        assert_eq!(report.stuck_warnings, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_a_live_state_machine() {
        use crate::types::{ExecutionMode, Task};

        let machine = TaskStateMachine::submit(&Task::new("Open Safari", ExecutionMode::Remote));
        let writer = machine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            writer.advance(crate::remote::TaskEvent::Started);
            tokio::time::sleep(Duration::from_secs(3)).await;
            writer.advance(crate::remote::TaskEvent::Completed(TaskResult::message(
                "opened Safari",
            )));
        });

        let report = poll_until_terminal(&machine, fast_settings()).await;
        assert_eq!(
            report.outcome,
            PollOutcome::Done(TaskResult::message("opened Safari"))
        );
        assert_eq!(report.stuck_warnings, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn returns_failure_reason() {
        let source = FakeSource::new(|_| {
            Ok(snapshot(
                RemoteTaskState::Failed,
                Some(TaskResult::message("window not found")),
            ))
        });

        let report = poll_until_terminal(&source, fast_settings()).await;
        assert_eq!(
            report.outcome,
            PollOutcome::Failed("window not found".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stall_warns_once_then_times_out() {
        // State never changes: one stuck warning at the threshold, then a
        // timeout at the hard budget even though the state is non-terminal.
        let frozen = snapshot(RemoteTaskState::Running, None);
        let source = FakeSource::new(move |_| Ok(frozen.clone()));

        let report = poll_until_terminal(&source, fast_settings()).await;
        assert_eq!(report.outcome, PollOutcome::TimedOut);
        assert_eq!(report.stuck_warnings, 1);
        // Bounded by hard_timeout + poll_interval.
        assert!(report.elapsed <= Duration::from_secs(45 + 2));
    }

    #[tokio::test(start_paused = true)]
    async fn late_completion_is_discarded() {
        // The task completes only after the hard timeout has fired; the
        // outcome must still be TimedOut, not a stale success.
        let source = FakeSource::new(|call| {
            // 2s cadence: calls 0..22 cover the first 44s.
            if call < 23 {
                Ok(TaskSnapshot {
                    state: RemoteTaskState::Running,
                    last_changed_at: chrono::Utc::now(),
                    result: None,
                })
            } else {
                Ok(snapshot(
                    RemoteTaskState::Done,
                    Some(TaskResult::message("too late")),
                ))
            }
        });

        let report = poll_until_terminal(&source, fast_settings()).await;
        assert_eq!(report.outcome, PollOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_errors_do_not_end_polling_early() {
        let source = FakeSource::new(|call| {
            if call < 3 {
                Err(BridgeError::Backend("connection refused".to_string()))
            } else {
                Ok(snapshot(
                    RemoteTaskState::Done,
                    Some(TaskResult::message("recovered")),
                ))
            }
        });

        let report = poll_until_terminal(&source, fast_settings()).await;
        assert_eq!(
            report.outcome,
            PollOutcome::Done(TaskResult::message("recovered"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn progress_resets_the_stall_clock() {
        // A state change at 20s resets the stall window, so no warning is
        // emitted before a terminal state at 40s.
        let early = snapshot(RemoteTaskState::Submitted, None);
        let later = snapshot(RemoteTaskState::Running, None);
        let source = FakeSource::new(move |call| {
            let t = call * 2; // seconds, one call per tick
            if t < 20 {
                Ok(early.clone())
            } else if t < 40 {
                Ok(later.clone())
            } else {
                Ok(snapshot(
                    RemoteTaskState::Done,
                    Some(TaskResult::message("done")),
                ))
            }
        });

        let report = poll_until_terminal(&source, fast_settings()).await;
        assert_eq!(report.outcome, PollOutcome::Done(TaskResult::message("done")));
        assert_eq!(report.stuck_warnings, 0);
    }
}
