//! Taskbridge — task dispatch and execution bridge.
//!
//! Coordinates delegation of natural-language tasks from a
//! resource-constrained voice assistant to a remote host that executes GUI
//! actions on its behalf.
//!
//! ## Architecture
//!
//! One request flows one direction: text in, classification, optional remote
//! round-trip, result out.
//!
//! - [`classifier`] — remote execution vs. local answer, learned model with
//!   a deterministic keyword fallback
//! - [`dispatcher`] — classify, submit, poll to a terminal outcome
//! - [`remote`] — backend contract, per-task lifecycle state machine, stuck
//!   detector with a two-threshold budget
//! - [`action`] — closed action vocabulary, structural validator,
//!   retry-bounded formatter with accumulated corrective feedback
//! - [`executor`] — in-process implementation of the remote side, for tests
//!   and single-machine setups
//! - [`inference`] — bounded-output inference provider abstraction
//!
//! Speech capture, audio output and the GUI automation stack itself are
//! collaborators behind narrow traits, not part of this crate.

pub mod action;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod executor;
pub mod inference;
pub mod remote;
pub mod types;

// Re-export main types for easy access
pub use action::{
    ActionFormatter, ActionProposer, ActionValidator, ActionVocabulary, FormattingFailure,
    ProposedAction, RejectionFeedback, RejectionReason, ValidationVerdict,
};
pub use classifier::IntentClassifier;
pub use config::BridgeConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher, InferenceAnswerer, LocalAnswerer};
pub use errors::BridgeError;
pub use executor::{ActionSink, InProcessExecutor, InferenceProposer, LoggingSink};
pub use inference::{InferenceProvider, InferenceProviderFactory};
pub use remote::{
    HttpRemoteBackend, PollOutcome, PollReport, PollerSettings, RemoteBackend, RemoteTaskState,
    SubmitAck, SubmitOptions, TaskSnapshot, TaskStateMachine,
};
pub use types::{ClassificationResult, ExecutionMode, Task, TaskComplexity, TaskOutcome, TaskResult};
