//! Remote execution: backend contract, task state machine, stuck detector.

pub mod client;
pub mod poller;
pub mod state;

pub use client::HttpRemoteBackend;
pub use poller::{
    poll_until_terminal, BackendStateSource, PollOutcome, PollReport, PollerSettings,
    TaskStateSource,
};
pub use state::{RemoteTaskState, TaskEvent, TaskSnapshot, TaskStateMachine};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;
use crate::types::Task;

/// Per-submission options forwarded to the remote host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOptions {
    pub send_screenshot: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            send_screenshot: true,
        }
    }
}

/// Acknowledgment returned by a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub task_id: String,
}

/// The request/response boundary to the remote execution agent.
///
/// Transport retries on network failure are the collaborator's
/// responsibility; the bridge only times out (see `poller`).
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    async fn submit(&self, task: &Task, options: SubmitOptions) -> Result<SubmitAck, BridgeError>;

    async fn get_state(&self, task_id: &str) -> Result<TaskSnapshot, BridgeError>;
}
