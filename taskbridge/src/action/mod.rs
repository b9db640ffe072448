//! Action vocabulary shared between the bridge and the remote agent.
//!
//! The remote agent may only emit actions from a closed vocabulary. The set
//! is data, not match arms: deployments extend it through configuration and
//! the validator checks proposals against whatever the vocabulary instance
//! contains.

pub mod formatter;
pub mod validator;

pub use formatter::{
    ActionFormatter, ActionProposer, FormattedAction, FormattingFailure, RejectionFeedback,
    MAX_FORMAT_ATTEMPTS,
};
pub use validator::{ActionValidator, RejectionReason, ValidationVerdict};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const LAUNCH_APP: &str = "launch-app";
pub const TYPE_TEXT: &str = "type-text";
pub const SCROLL: &str = "scroll";
pub const CLICK: &str = "click";
pub const COMPLETE_TASK: &str = "complete-task";
pub const FAIL_TASK: &str = "fail-task";
/// Catch-all for non-trivial data manipulation or multi-step computation.
pub const GENERAL_EXECUTION: &str = "general-execution";

/// One vocabulary entry: an action name and its required parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    #[serde(default)]
    pub required_params: Vec<String>,
}

impl ActionSpec {
    pub fn new(name: &str, required_params: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            required_params: required_params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// The closed set of permitted remote actions.
#[derive(Debug, Clone)]
pub struct ActionVocabulary {
    specs: Vec<ActionSpec>,
}

impl ActionVocabulary {
    /// The built-in action set.
    pub fn builtin() -> Self {
        Self {
            specs: vec![
                ActionSpec::new(LAUNCH_APP, &["app_name"]),
                ActionSpec::new(TYPE_TEXT, &["text"]),
                ActionSpec::new(SCROLL, &[]),
                ActionSpec::new(CLICK, &["target"]),
                ActionSpec::new(COMPLETE_TASK, &[]),
                ActionSpec::new(FAIL_TASK, &["reason"]),
                ActionSpec::new(GENERAL_EXECUTION, &[]),
            ],
        }
    }

    /// Built-in set plus configured extensions. An extension with a known
    /// name replaces the built-in entry.
    pub fn with_extensions(extensions: &[ActionSpec]) -> Self {
        let mut vocabulary = Self::builtin();
        for spec in extensions {
            match vocabulary.specs.iter_mut().find(|s| s.name == spec.name) {
                Some(existing) => *existing = spec.clone(),
                None => vocabulary.specs.push(spec.clone()),
            }
        }
        vocabulary
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }
}

impl Default for ActionVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

/// An action proposed by the remote agent for the current task.
///
/// Ephemeral: lives for one formatting attempt and is discarded after
/// validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    /// Vocabulary member name, or anything else the agent emitted.
    pub kind: String,
    pub params: HashMap<String, String>,
    /// The raw textual form, kept for error reporting.
    pub raw: String,
}

impl ProposedAction {
    pub fn new(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            raw: kind.clone(),
            kind,
            params: HashMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }
}
