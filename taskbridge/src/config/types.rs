use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::action::ActionSpec;
use crate::classifier::DEFAULT_CLASSIFIER_INSTRUCTIONS;
use crate::errors::BridgeError;
use crate::remote::PollerSettings;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub inference: InferenceConfig,
    pub classifier: ClassifierConfig,
    pub remote: RemoteConfig,
    pub vocabulary: VocabularyConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, BridgeError> {
        toml::from_str(raw).map_err(|e| BridgeError::Config(format!("invalid TOML: {}", e)))
    }
}

/// Supported inference provider types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceProviderType {
    /// Deterministic responses for tests and CI.
    Stub,
    /// OpenAI-compatible chat completions endpoint. Also covers local
    /// llama.cpp-style servers via `base_url`.
    OpenAi,
}

/// Configuration for the local inference collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub provider_type: InferenceProviderType,
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub timeout_seconds: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider_type: InferenceProviderType::Stub,
            model: "stub-model".to_string(),
            api_key: None,
            base_url: None,
            max_tokens: Some(150),
            temperature: Some(0.7),
            timeout_seconds: Some(30),
        }
    }
}

/// Configuration for the intent classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Instruction set distinguishing the two labels. Kept in configuration
    /// so deployments can tune the wording without touching code.
    pub instructions: String,
    /// The classifier only needs one label back; keep the call small.
    pub max_output_tokens: u32,
    /// Terms that route a request to remote execution when the inference
    /// call is unavailable or returns an unrecognized label.
    pub remote_terms: Vec<String>,
    /// Output bound for locally answered requests.
    pub answer_max_tokens: u32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_CLASSIFIER_INSTRUCTIONS.to_string(),
            max_output_tokens: 8,
            remote_terms: default_remote_terms(),
            answer_max_tokens: 150,
        }
    }
}

fn default_remote_terms() -> Vec<String> {
    [
        "open", "launch", "go to", "login", "click", "type", "text", "message", "send",
        "navigate", "website", "app",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Which remote backend implementation to use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Run the remote side's execution loop in-process (tests, demos,
    /// single-machine setups).
    InProcess,
    /// Talk to a remote host over HTTP.
    Http,
}

/// Remote backend endpoint and polling budgets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    /// Per-request timeout for backend HTTP calls, not the task budget.
    pub request_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub stuck_threshold_secs: u64,
    pub hard_timeout_secs: u64,
    pub send_screenshot: bool,
    /// When set, artifacts referenced by results are downloaded here.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::InProcess,
            host: "localhost".to_string(),
            port: 8000,
            request_timeout_seconds: 30,
            poll_interval_ms: 2000,
            stuck_threshold_secs: 30,
            hard_timeout_secs: 45,
            send_screenshot: true,
            artifact_dir: None,
        }
    }
}

impl RemoteConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn poller_settings(&self) -> PollerSettings {
        PollerSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            stuck_threshold: Duration::from_secs(self.stuck_threshold_secs),
            hard_timeout: Duration::from_secs(self.hard_timeout_secs),
        }
    }
}

/// Extra vocabulary entries merged over the built-in action set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub actions: Vec<ActionSpec>,
}
