//! Error taxonomy for the bridge.
//!
//! Validation rejections and stuck warnings are not errors: the former are
//! consumed by the retry-bounded formatter, the latter are observability
//! signals. Only terminal conditions surface here. Remote task failure and
//! timeout are modeled as outcomes (`types::TaskOutcome`), not errors, since
//! the dispatcher reports them as distinct user-facing results.

use thiserror::Error;

use crate::action::FormattingFailure;
use crate::inference::InferenceError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The remote agent never produced a structurally valid action within
    /// the attempt ceiling. Carries the full rejection history.
    #[error(transparent)]
    Formatting(#[from] FormattingFailure),

    /// A collaborator inference call failed outside the classifier (the
    /// classifier recovers via its fallback and never surfaces this).
    #[error("inference provider error: {0}")]
    Inference(#[from] InferenceError),

    /// The remote backend could not be reached or violated the contract.
    #[error("remote backend error: {0}")]
    Backend(String),

    #[error("configuration error: {0}")]
    Config(String),
}
