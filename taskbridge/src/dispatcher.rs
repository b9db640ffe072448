//! Request orchestration: classify, then answer locally or delegate.
//!
//! The dispatcher owns exactly one task per call and processes it to a
//! terminal outcome. Remote failures are not retried here — a fresh user
//! request produces a fresh task.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::classifier::IntentClassifier;
use crate::errors::BridgeError;
use crate::inference::InferenceProvider;
use crate::remote::{
    poll_until_terminal, BackendStateSource, PollOutcome, PollerSettings, RemoteBackend,
    SubmitOptions,
};
use crate::types::{ExecutionMode, Task, TaskOutcome};

/// The local-answer collaborator: answers a request without any remote
/// side effects.
#[async_trait]
pub trait LocalAnswerer: Send + Sync {
    async fn answer(&self, text: &str) -> Result<String, BridgeError>;
}

/// Local answering through the on-device inference provider.
pub struct InferenceAnswerer {
    provider: Arc<dyn InferenceProvider>,
    max_tokens: u32,
}

impl InferenceAnswerer {
    pub fn new(provider: Arc<dyn InferenceProvider>, max_tokens: u32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }
}

#[async_trait]
impl LocalAnswerer for InferenceAnswerer {
    async fn answer(&self, text: &str) -> Result<String, BridgeError> {
        self.provider
            .infer(text, self.max_tokens)
            .await
            .map_err(BridgeError::from)
    }
}

/// User-facing result of one dispatched request.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub mode: ExecutionMode,
    pub outcome: TaskOutcome,
    pub message: String,
    pub artifact_url: Option<String>,
    /// Present for remote dispatches.
    pub task_id: Option<String>,
}

pub struct Dispatcher {
    classifier: IntentClassifier,
    answerer: Arc<dyn LocalAnswerer>,
    backend: Arc<dyn RemoteBackend>,
    poller: PollerSettings,
    submit_options: SubmitOptions,
}

impl Dispatcher {
    pub fn new(
        classifier: IntentClassifier,
        answerer: Arc<dyn LocalAnswerer>,
        backend: Arc<dyn RemoteBackend>,
        poller: PollerSettings,
        submit_options: SubmitOptions,
    ) -> Self {
        Self {
            classifier,
            answerer,
            backend,
            poller,
            submit_options,
        }
    }

    /// Process one request to a terminal outcome.
    pub async fn handle(&self, text: &str) -> Result<DispatchOutcome, BridgeError> {
        let classification = self.classifier.classify(text).await;
        info!(
            mode = ?classification.mode,
            via_fallback = classification.via_fallback,
            confidence = classification.confidence,
            "request classified"
        );

        match classification.mode {
            ExecutionMode::Local => {
                let message = self.answerer.answer(text).await?;
                Ok(DispatchOutcome {
                    mode: ExecutionMode::Local,
                    outcome: TaskOutcome::Succeeded,
                    message,
                    artifact_url: None,
                    task_id: None,
                })
            }
            ExecutionMode::Remote => self.dispatch_remote(text).await,
        }
    }

    async fn dispatch_remote(&self, text: &str) -> Result<DispatchOutcome, BridgeError> {
        let task = Task::new(text, ExecutionMode::Remote);
        let ack = self
            .backend
            .submit(&task, self.submit_options.clone())
            .await?;

        let source = BackendStateSource::new(self.backend.clone(), ack.task_id.clone());
        let report = poll_until_terminal(&source, self.poller.clone()).await;
        info!(
            task_id = %ack.task_id,
            elapsed_ms = report.elapsed.as_millis() as u64,
            stuck_warnings = report.stuck_warnings,
            "remote task finished polling"
        );

        let (outcome, message, artifact_url) = match report.outcome {
            PollOutcome::Done(result) => {
                let message = if result.message.is_empty() {
                    "Task completed.".to_string()
                } else {
                    result.message
                };
                (TaskOutcome::Succeeded, message, result.artifact_url)
            }
            PollOutcome::Failed(reason) => (
                TaskOutcome::Failed,
                format!("The remote task failed: {}", reason),
                None,
            ),
            PollOutcome::TimedOut => (
                TaskOutcome::TimedOut,
                "The remote side did not complete the task in time.".to_string(),
                None,
            ),
        };

        Ok(DispatchOutcome {
            mode: ExecutionMode::Remote,
            outcome,
            message,
            artifact_url,
            task_id: Some(ack.task_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::inference::StubInferenceProvider;
    use crate::remote::state::RemoteTaskState;
    use crate::remote::{SubmitAck, TaskSnapshot};
    use crate::types::TaskResult;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Backend whose tasks complete immediately with a fixed result.
    struct InstantBackend {
        result: TaskResult,
        submitted: Mutex<Vec<String>>,
    }

    impl InstantBackend {
        fn new(result: TaskResult) -> Self {
            Self {
                result,
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteBackend for InstantBackend {
        async fn submit(
            &self,
            task: &Task,
            _options: SubmitOptions,
        ) -> Result<SubmitAck, BridgeError> {
            self.submitted.lock().unwrap().push(task.task_id.clone());
            Ok(SubmitAck {
                task_id: task.task_id.clone(),
            })
        }

        async fn get_state(&self, _task_id: &str) -> Result<TaskSnapshot, BridgeError> {
            Ok(TaskSnapshot {
                state: RemoteTaskState::Done,
                last_changed_at: chrono::Utc::now(),
                result: Some(self.result.clone()),
            })
        }
    }

    fn dispatcher(backend: Arc<dyn RemoteBackend>) -> Dispatcher {
        let provider: Arc<dyn InferenceProvider> = Arc::new(StubInferenceProvider::new());
        Dispatcher::new(
            IntentClassifier::new(provider.clone(), ClassifierConfig::default()),
            Arc::new(InferenceAnswerer::new(provider, 150)),
            backend,
            PollerSettings {
                poll_interval: Duration::from_millis(10),
                ..PollerSettings::default()
            },
            SubmitOptions::default(),
        )
    }

    #[tokio::test]
    async fn local_requests_never_touch_the_backend() {
        let backend = Arc::new(InstantBackend::new(TaskResult::message("unused")));
        let dispatcher = dispatcher(backend.clone());

        let outcome = dispatcher.handle("What is the capital of France?").await.unwrap();
        assert_eq!(outcome.mode, ExecutionMode::Local);
        assert_eq!(outcome.outcome, TaskOutcome::Succeeded);
        assert!(outcome.task_id.is_none());
        assert!(backend.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remote_requests_submit_exactly_one_task() {
        let backend = Arc::new(InstantBackend::new(TaskResult {
            message: "opened Safari".to_string(),
            artifact_url: Some("http://host/shots/1.png".to_string()),
        }));
        let dispatcher = dispatcher(backend.clone());

        let outcome = dispatcher.handle("Open Safari").await.unwrap();
        assert_eq!(outcome.mode, ExecutionMode::Remote);
        assert_eq!(outcome.outcome, TaskOutcome::Succeeded);
        assert_eq!(outcome.message, "opened Safari");
        assert_eq!(
            outcome.artifact_url.as_deref(),
            Some("http://host/shots/1.png")
        );
        assert_eq!(backend.submitted.lock().unwrap().len(), 1);
    }
}
