//! The request shape the cache fingerprints and gates on.

use crate::types::message::Message;
use crate::types::tool::{FunctionDefinition, ToolDefinition};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chat-completion request, reduced to the fields that determine the
/// model output plus the streaming flag used for eligibility.
///
/// Optional fields stay `None` unless the caller set them; the key
/// derivation relies on that to tell "absent" apart from "set to the
/// provider default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheableRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(default)]
    pub stream: bool,
}

impl CacheableRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            ..Default::default()
        }
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn response_format(mut self, format: Value) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Build from an OpenAI-style request body.
    ///
    /// `max_completion_tokens` is accepted as an alias for `max_tokens`, and
    /// the legacy `functions` array is folded into `tools` when no `tools`
    /// are present. Unrelated fields (user, metadata, ...) are ignored.
    /// A fingerprinted field of the wrong JSON type, or a token limit that
    /// does not fit in `u32`, is a validation error; `null` reads as absent.
    pub fn from_json(body: &Value) -> Result<Self> {
        let model = body
            .get("model")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::validation_with_context(
                    "request is missing a string `model`",
                    ErrorContext::new()
                        .with_field_path("request.model")
                        .with_source("cacheable_request"),
                )
            })?
            .to_string();

        let messages: Vec<Message> = match body.get("messages") {
            Some(v) => serde_json::from_value(v.clone())?,
            None => Vec::new(),
        };

        let max_tokens = match present(body, "max_tokens") {
            Some(v) => Some(token_limit("max_tokens", v)?),
            None => match present(body, "max_completion_tokens") {
                Some(v) => Some(token_limit("max_completion_tokens", v)?),
                None => None,
            },
        };

        let tools = match (body.get("tools"), body.get("functions")) {
            (Some(t), _) if !t.is_null() => Some(serde_json::from_value(t.clone())?),
            (_, Some(f)) if !f.is_null() => {
                let functions: Vec<FunctionDefinition> = serde_json::from_value(f.clone())?;
                Some(
                    functions
                        .into_iter()
                        .map(|function| ToolDefinition {
                            tool_type: "function".to_string(),
                            function,
                        })
                        .collect(),
                )
            }
            _ => None,
        };

        Ok(Self {
            model,
            messages,
            temperature: number(body, "temperature")?,
            max_tokens,
            top_p: number(body, "top_p")?,
            tools,
            response_format: body
                .get("response_format")
                .filter(|v| !v.is_null())
                .cloned(),
            stream: match present(body, "stream") {
                Some(v) => v
                    .as_bool()
                    .ok_or_else(|| mistyped("stream", "a boolean", v))?,
                None => false,
            },
        })
    }
}

/// The member named `name`, treating JSON `null` as absent.
fn present<'a>(body: &'a Value, name: &str) -> Option<&'a Value> {
    body.get(name).filter(|v| !v.is_null())
}

fn number(body: &Value, name: &str) -> Result<Option<f64>> {
    match present(body, name) {
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| mistyped(name, "a number", v)),
        None => Ok(None),
    }
}

fn token_limit(name: &str, v: &Value) -> Result<u32> {
    let n = v
        .as_u64()
        .ok_or_else(|| mistyped(name, "a non-negative integer", v))?;
    u32::try_from(n).map_err(|_| {
        Error::validation_with_context(
            "token limit out of range",
            ErrorContext::new()
                .with_field_path(format!("request.{}", name))
                .with_details(format!("{} exceeds {}", n, u32::MAX))
                .with_source("cacheable_request"),
        )
    })
}

fn mistyped(name: &str, expected: &str, got: &Value) -> Error {
    Error::validation_with_context(
        format!("`{}` must be {}", name, expected),
        ErrorContext::new()
            .with_field_path(format!("request.{}", name))
            .with_details(format!("got {}", got))
            .with_source("cacheable_request"),
    )
}
