//! Completion responses as stored in the cache.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A completion-style response.
///
/// The cache only ever reads `usage`; choices and any provider-specific
/// top-level fields are carried through untouched so a cache hit returns
/// exactly what the model produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Token usage accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl CompletionResponse {
    pub fn new(choices: Vec<Value>) -> Self {
        Self {
            choices,
            ..Default::default()
        }
    }

    /// Single-choice assistant response with plain text content.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(vec![serde_json::json!({
            "index": 0,
            "message": {"role": "assistant", "content": content.into()},
            "finish_reason": "stop"
        })])
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Total tokens reported by the provider, 0 when usage is missing.
    pub fn total_tokens(&self) -> u64 {
        self.usage.map(|u| u.total_tokens).unwrap_or(0)
    }

    /// Text content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()?
            .get("message")?
            .get("content")?
            .as_str()
    }
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}
