//! OpenAI-compatible inference provider.

use serde::{Deserialize, Serialize};

use super::{InferenceError, InferenceProvider, ProviderInfo};
use crate::config::InferenceConfig;
use crate::errors::BridgeError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiInferenceProvider {
    config: InferenceConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiInferenceProvider {
    pub fn new(config: InferenceConfig) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.timeout_seconds.unwrap_or(30),
            ))
            .build()
            .map_err(|e| BridgeError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl InferenceProvider for OpenAiInferenceProvider {
    async fn infer(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, InferenceError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/chat/completions", base_url);

        let request_body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: max_output_tokens,
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| InferenceError::Unavailable(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let raw_body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());

        if !status.is_success() {
            return Err(InferenceError::Unavailable(format!(
                "API request failed ({}): {}",
                status, raw_body
            )));
        }

        let response_body: ChatResponse = serde_json::from_str(&raw_body)
            .map_err(|e| InferenceError::Malformed(format!("failed to parse response: {}", e)))?;

        response_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| InferenceError::Malformed("response missing content".to_string()))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "openai-compatible".to_string(),
            model: self.config.model.clone(),
        }
    }
}
