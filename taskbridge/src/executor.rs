//! In-process implementation of the remote backend contract.
//!
//! Runs the remote host's half of the bridge — propose, validate with
//! bounded retries, perform, advance the state machine — inside this
//! process. Used by the integration tests and by single-machine setups; the
//! production deployment points the dispatcher at `HttpRemoteBackend`
//! instead.
//!
//! One state machine per task id; a task id is never reused, so a valid
//! action can never be attributed to the wrong task.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::action::{
    ActionFormatter, ActionProposer, ActionValidator, ActionVocabulary, ProposedAction,
    RejectionFeedback, COMPLETE_TASK, FAIL_TASK,
};
use crate::errors::BridgeError;
use crate::inference::InferenceProvider;
use crate::remote::{
    RemoteBackend, SubmitAck, SubmitOptions, TaskEvent, TaskSnapshot, TaskStateMachine,
};
use crate::types::{Task, TaskResult};

/// Output bound for action-proposal calls; a small JSON object is all the
/// agent may produce.
const PROPOSAL_MAX_TOKENS: u32 = 128;

/// Proposes actions by asking an inference provider for a single JSON
/// object, feeding rejection history back into the prompt on retries.
pub struct InferenceProposer {
    provider: Arc<dyn InferenceProvider>,
    vocabulary: ActionVocabulary,
}

#[derive(Debug, Deserialize)]
struct ActionJson {
    action: String,
    #[serde(default)]
    params: HashMap<String, serde_json::Value>,
}

impl InferenceProposer {
    pub fn new(provider: Arc<dyn InferenceProvider>, vocabulary: ActionVocabulary) -> Self {
        Self {
            provider,
            vocabulary,
        }
    }

    fn build_prompt(&self, task: &Task, feedback: &[RejectionFeedback]) -> String {
        let mut prompt = format!(
            "You control a computer's GUI on behalf of a voice assistant. Choose \
             exactly one action for the task below and respond with only a JSON \
             object: {{\"action\": \"<name>\", \"params\": {{\"<key>\": \"<value>\"}}}}\n\n\
             Permitted actions: {}\n\nTask: \"{}\"",
            self.vocabulary.names().join(", "),
            task.request.trim()
        );

        if !feedback.is_empty() {
            prompt.push_str("\n\nPrevious proposals were rejected:");
            for rejection in feedback {
                prompt.push_str(&format!(
                    "\n- attempt {}: {}",
                    rejection.attempt, rejection.correction
                ));
            }
            prompt.push_str("\nApply the corrections above.");
        }

        prompt
    }

    /// Parse the first JSON object out of a possibly chatty response.
    ///
    /// A response that cannot be parsed still becomes a `ProposedAction` (an
    /// unrecognizable kind carrying the raw text), so the validator rejects
    /// it with feedback instead of aborting the formatting loop.
    fn parse_response(response: &str) -> ProposedAction {
        let start = response.find('{').unwrap_or(0);
        let end = response.rfind('}').map(|i| i + 1).unwrap_or(response.len());
        let body = &response[start..end.max(start)];

        match serde_json::from_str::<ActionJson>(body) {
            Ok(parsed) => {
                let params = parsed
                    .params
                    .into_iter()
                    .map(|(key, value)| {
                        let value = match value {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        };
                        (key, value)
                    })
                    .collect();
                ProposedAction {
                    kind: parsed.action,
                    params,
                    raw: response.trim().to_string(),
                }
            }
            Err(e) => {
                warn!(error = %e, "unparseable action proposal");
                ProposedAction {
                    kind: response.trim().to_string(),
                    params: HashMap::new(),
                    raw: response.trim().to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl ActionProposer for InferenceProposer {
    async fn propose(
        &self,
        task: &Task,
        feedback: &[RejectionFeedback],
    ) -> Result<ProposedAction, BridgeError> {
        let prompt = self.build_prompt(task, feedback);
        let response = self
            .provider
            .infer(&prompt, PROPOSAL_MAX_TOKENS)
            .await
            .map_err(BridgeError::from)?;
        Ok(Self::parse_response(&response))
    }
}

/// Where accepted GUI actions land. The real mouse-and-keyboard machinery
/// is out of scope; implementations adapt whatever automation stack the
/// host runs.
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn perform(
        &self,
        task: &Task,
        action: &ProposedAction,
    ) -> Result<TaskResult, BridgeError>;
}

/// Sink that logs each primitive and acknowledges it. Useful for demos and
/// tests; production hosts supply a real automation sink.
pub struct LoggingSink;

#[async_trait]
impl ActionSink for LoggingSink {
    async fn perform(
        &self,
        task: &Task,
        action: &ProposedAction,
    ) -> Result<TaskResult, BridgeError> {
        info!(
            task_id = %task.task_id,
            kind = %action.kind,
            params = ?action.params,
            "performing GUI action"
        );
        let message = match action.params.get("app_name") {
            Some(app) => format!("opened {}", app),
            None => format!("performed {}", action.kind),
        };
        Ok(TaskResult::message(message))
    }
}

/// In-process remote backend.
pub struct InProcessExecutor {
    proposer: Arc<dyn ActionProposer>,
    sink: Arc<dyn ActionSink>,
    formatter: ActionFormatter,
    machines: Arc<RwLock<HashMap<String, TaskStateMachine>>>,
}

impl InProcessExecutor {
    pub fn new(
        proposer: Arc<dyn ActionProposer>,
        sink: Arc<dyn ActionSink>,
        vocabulary: ActionVocabulary,
    ) -> Self {
        Self {
            proposer,
            sink,
            formatter: ActionFormatter::new(ActionValidator::new(vocabulary)),
            machines: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn run_task(
        formatter: ActionFormatter,
        proposer: Arc<dyn ActionProposer>,
        sink: Arc<dyn ActionSink>,
        task: Task,
        machine: TaskStateMachine,
    ) {
        machine.advance(TaskEvent::Started);

        let formatted = match formatter.format_action(&task, proposer.as_ref()).await {
            Ok(formatted) => formatted,
            Err(e) => {
                machine.advance(TaskEvent::Failed(e.to_string()));
                return;
            }
        };

        debug!(
            task_id = %task.task_id,
            kind = %formatted.action.kind,
            rejections = formatted.rejections.len(),
            formatting_ms = formatted.total_ms,
            "action accepted"
        );

        match formatted.action.kind.as_str() {
            FAIL_TASK => {
                let reason = formatted
                    .action
                    .params
                    .get("reason")
                    .cloned()
                    .unwrap_or_else(|| "agent declared failure".to_string());
                machine.advance(TaskEvent::Failed(reason));
            }
            COMPLETE_TASK => {
                machine.advance(TaskEvent::Completed(TaskResult::message(
                    "task acknowledged as complete",
                )));
            }
            _ => match sink.perform(&task, &formatted.action).await {
                Ok(result) => {
                    machine.advance(TaskEvent::Completed(result));
                }
                Err(e) => {
                    machine.advance(TaskEvent::Failed(e.to_string()));
                }
            },
        }
    }
}

#[async_trait]
impl RemoteBackend for InProcessExecutor {
    async fn submit(&self, task: &Task, _options: SubmitOptions) -> Result<SubmitAck, BridgeError> {
        let machine = TaskStateMachine::submit(task);
        {
            let mut machines = self.machines.write().unwrap_or_else(|e| e.into_inner());
            if machines.contains_key(&task.task_id) {
                return Err(BridgeError::Backend(format!(
                    "task id already submitted: {}",
                    task.task_id
                )));
            }
            machines.insert(task.task_id.clone(), machine.clone());
        }

        info!(task_id = %task.task_id, "task accepted by in-process executor");

        tokio::spawn(Self::run_task(
            self.formatter.clone(),
            self.proposer.clone(),
            self.sink.clone(),
            task.clone(),
            machine,
        ));

        Ok(SubmitAck {
            task_id: task.task_id.clone(),
        })
    }

    async fn get_state(&self, task_id: &str) -> Result<TaskSnapshot, BridgeError> {
        let machines = self.machines.read().unwrap_or_else(|e| e.into_inner());
        machines
            .get(task_id)
            .map(|machine| machine.current())
            .ok_or_else(|| BridgeError::Backend(format!("unknown task id: {}", task_id)))
    }
}
