//! Deterministic stub provider for tests and CI.
//!
//! Routes on recognizable prompt shapes the same way a live model would be
//! asked: classification prompts get one of the two labels, action-proposal
//! prompts get a small JSON action, anything else gets a canned answer.

use super::{InferenceError, InferenceProvider, ProviderInfo};
use crate::classifier::{LABEL_LOCAL, LABEL_REMOTE};

pub struct StubInferenceProvider;

const REMOTE_INDICATORS: &[&str] = &[
    "open", "launch", "go to", "login", "click", "type", "navigate", "website",
];

impl StubInferenceProvider {
    pub fn new() -> Self {
        Self
    }

    /// Extract the quoted value following the last occurrence of `key`.
    fn quoted_after<'a>(prompt: &'a str, key: &str) -> Option<&'a str> {
        let at = prompt.rfind(key)?;
        let after = &prompt[at + key.len()..];
        let open = after.find('"')?;
        let rest = &after[open + 1..];
        let close = rest.find('"')?;
        Some(&rest[..close])
    }

    fn classify(request: &str) -> &'static str {
        let lower = request.to_lowercase();
        if REMOTE_INDICATORS.iter().any(|term| lower.contains(term)) {
            LABEL_REMOTE
        } else {
            LABEL_LOCAL
        }
    }

    fn propose(request: &str) -> String {
        let lower = request.trim().to_lowercase();
        let words: Vec<&str> = request.trim().split_whitespace().collect();

        if (lower.starts_with("open") || lower.starts_with("launch") || lower.starts_with("start"))
            && words.len() >= 2
        {
            let app = words[words.len() - 1];
            format!(r#"{{"action": "launch-app", "params": {{"app_name": "{}"}}}}"#, app)
        } else if let Some(text) = lower.strip_prefix("type ") {
            format!(r#"{{"action": "type-text", "params": {{"text": "{}"}}}}"#, text)
        } else if lower.starts_with("say") || lower.starts_with("tell me") {
            r#"{"action": "complete-task", "params": {}}"#.to_string()
        } else {
            r#"{"action": "general-execution", "params": {}}"#.to_string()
        }
    }
}

impl Default for StubInferenceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InferenceProvider for StubInferenceProvider {
    async fn infer(
        &self,
        prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String, InferenceError> {
        // Classification prompts name both labels; route on the request line.
        if prompt.contains(LABEL_REMOTE) && prompt.contains(LABEL_LOCAL) {
            if let Some(request) = Self::quoted_after(prompt, "Request:") {
                return Ok(Self::classify(request).to_string());
            }
        }

        // Action-proposal prompts carry a task line and ask for JSON.
        if prompt.contains(r#""action""#) {
            if let Some(request) = Self::quoted_after(prompt, "Task:") {
                return Ok(Self::propose(request));
            }
        }

        // Generic question: keep the canned answer within the output bound.
        let words = max_output_tokens.min(16) as usize;
        let answer = "This is a stub answer produced without a model; configure a real provider for live replies.";
        Ok(answer
            .split_whitespace()
            .take(words.max(1))
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "stub".to_string(),
            model: "stub-model".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn classification_prompts_get_a_label() {
        let provider = StubInferenceProvider::new();
        let prompt = format!(
            "Pick {} or {}.\n\nRequest: \"Open Safari\"\nLabel:",
            LABEL_REMOTE, LABEL_LOCAL
        );
        assert_eq!(provider.infer(&prompt, 8).await.unwrap(), LABEL_REMOTE);

        let prompt = format!(
            "Pick {} or {}.\n\nRequest: \"What is Rust?\"\nLabel:",
            LABEL_REMOTE, LABEL_LOCAL
        );
        assert_eq!(provider.infer(&prompt, 8).await.unwrap(), LABEL_LOCAL);
    }

    #[tokio::test]
    async fn proposal_prompts_get_action_json() {
        let provider = StubInferenceProvider::new();
        let prompt = "Respond with JSON: {\"action\": ..., \"params\": ...}\n\nTask: \"Open Safari\"";
        let response = provider.infer(prompt, 64).await.unwrap();
        assert!(response.contains("launch-app"));
        assert!(response.contains("Safari"));
    }
}
