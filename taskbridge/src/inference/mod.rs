//! Inference provider abstraction.
//!
//! The bridge talks to the local language model through a narrow contract:
//! one prompt in, bounded text out. Every call carries an explicit output
//! token cap so callers that only need a label (the classifier) stay cheap.
//!
//! Providers:
//! - `StubInferenceProvider` — deterministic responses for tests and CI
//! - `OpenAiInferenceProvider` — OpenAI-compatible chat completions; also
//!   reaches llama.cpp-style local servers through `base_url`

pub mod openai;
pub mod stub;

pub use openai::OpenAiInferenceProvider;
pub use stub::StubInferenceProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{InferenceConfig, InferenceProviderType};

/// Error type for inference calls.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Abstract interface for inference providers.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    /// Generate text from a prompt, capped at `max_output_tokens`.
    async fn infer(&self, prompt: &str, max_output_tokens: u32)
        -> Result<String, InferenceError>;

    /// Provider information for logs and diagnostics.
    fn info(&self) -> ProviderInfo;
}

#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}

/// Creates inference providers from configuration.
pub struct InferenceProviderFactory;

impl InferenceProviderFactory {
    pub fn create(
        config: &InferenceConfig,
    ) -> Result<Box<dyn InferenceProvider>, crate::errors::BridgeError> {
        match config.provider_type {
            InferenceProviderType::Stub => Ok(Box::new(StubInferenceProvider::new())),
            InferenceProviderType::OpenAi => {
                Ok(Box::new(OpenAiInferenceProvider::new(config.clone())?))
            }
        }
    }
}
