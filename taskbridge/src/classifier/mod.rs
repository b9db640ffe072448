//! Intent classification: remote GUI execution vs. local answer.
//!
//! The primary path is one bounded inference call constrained to produce
//! exactly one of two labels. The fallback path is a deterministic keyword
//! heuristic over a configurable term list. The fallback is total — it
//! always returns a label — so classification can never block the
//! dispatcher: there is no retry loop here by design.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::inference::InferenceProvider;
use crate::types::{ClassificationResult, ExecutionMode};

/// Label emitted for requests that need the remote host.
pub const LABEL_REMOTE: &str = "remote_execution";
/// Label emitted for requests answerable on the edge device.
pub const LABEL_LOCAL: &str = "local_answer";

/// Default instruction set for the classification call. Deployments can
/// replace this wholesale through `ClassifierConfig::instructions`.
pub const DEFAULT_CLASSIFIER_INSTRUCTIONS: &str = "\
You route requests for a voice assistant that can answer questions itself or \
delegate tasks to a computer it controls remotely.

Answer remote_execution if the request requires interacting with a remote \
graphical environment, multi-step navigation, or a device-specific action \
(opening applications or websites, clicking, typing, sending messages).

Answer local_answer if the request can be answered from general knowledge or \
simple local computation.

Respond with exactly one word: remote_execution or local_answer.";

pub struct IntentClassifier {
    provider: Arc<dyn InferenceProvider>,
    config: ClassifierConfig,
}

impl IntentClassifier {
    pub fn new(provider: Arc<dyn InferenceProvider>, config: ClassifierConfig) -> Self {
        Self { provider, config }
    }

    /// Classify a request. Total: recovers from any provider failure via the
    /// keyword fallback and never returns an error.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        if text.trim().is_empty() {
            return ClassificationResult {
                mode: ExecutionMode::Local,
                via_fallback: true,
                confidence: 0.0,
            };
        }

        let prompt = format!(
            "{}\n\nRequest: \"{}\"\nLabel:",
            self.config.instructions,
            text.trim()
        );

        match self
            .provider
            .infer(&prompt, self.config.max_output_tokens)
            .await
        {
            Ok(response) => {
                let response = response.trim().to_lowercase();
                if response.contains(LABEL_REMOTE) || response.contains("remote") {
                    debug!(label = LABEL_REMOTE, "model classified request");
                    ClassificationResult {
                        mode: ExecutionMode::Remote,
                        via_fallback: false,
                        confidence: 1.0,
                    }
                } else if response.contains(LABEL_LOCAL) || response.contains("local") {
                    debug!(label = LABEL_LOCAL, "model classified request");
                    ClassificationResult {
                        mode: ExecutionMode::Local,
                        via_fallback: false,
                        confidence: 1.0,
                    }
                } else {
                    warn!(%response, "unrecognized classification label, using fallback");
                    self.fallback(text, 0.8)
                }
            }
            Err(e) => {
                warn!(error = %e, "inference unavailable for classification, using fallback");
                self.fallback(text, 0.7)
            }
        }
    }

    fn fallback(&self, text: &str, confidence: f64) -> ClassificationResult {
        ClassificationResult {
            mode: fallback_label(text, &self.config.remote_terms),
            via_fallback: true,
            confidence,
        }
    }
}

/// Deterministic keyword heuristic. Term hit routes to remote execution,
/// anything else defaults to a local answer.
pub fn fallback_label(text: &str, remote_terms: &[String]) -> ExecutionMode {
    let lower = text.to_lowercase();
    if remote_terms.iter().any(|term| lower.contains(term.as_str())) {
        ExecutionMode::Remote
    } else {
        ExecutionMode::Local
    }
}
