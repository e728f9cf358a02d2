//! Chat messages as they appear in a cacheable request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single role/content pair. Message order in a request is significant.
///
/// `content` is `None` for assistant turns that only carry tool calls
/// (`"content": null`). Any other member (`tool_calls`, `tool_call_id`,
/// `name`, ...) is kept in `extra` so it still reaches the fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default)]
    pub content: Option<MessageContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: Some(MessageContent::Text(text.into())),
            extra: Map::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: Some(MessageContent::Text(text.into())),
            extra: Map::new(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: Some(MessageContent::Text(text.into())),
            extra: Map::new(),
        }
    }

    pub fn tool(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Tool,
            content: Some(MessageContent::Text(text.into())),
            extra: Map::new(),
        }
    }

    pub fn with_content(role: MessageRole, content: MessageContent) -> Self {
        Self {
            role,
            content: Some(content),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Text content, if this message has plain-string content.
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(MessageContent::as_text)
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

/// Message content: a plain string or a list of provider-specific parts
/// (multimodal blocks). Parts are kept as raw JSON; the cache never
/// interprets them beyond hashing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<Value>),
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn parts(parts: Vec<Value>) -> Self {
        MessageContent::Parts(parts)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(t) => Some(t),
            MessageContent::Parts(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_roundtrip_shape() {
        let msg = Message::user("hello");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "hello"}));
    }

    #[test]
    fn test_parts_content_deserializes() {
        let msg: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "describe"}, {"type": "image_url", "image_url": {"url": "x"}}]
        }))
        .unwrap();
        assert!(matches!(msg.content, Some(MessageContent::Parts(ref p)) if p.len() == 2));
        assert!(msg.text().is_none());
    }

    #[test]
    fn test_null_content_with_tool_calls() {
        let raw = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{"id": "call_1", "type": "function", "function": {"name": "lookup", "arguments": "{}"}}]
        });
        let msg: Message = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(msg.role, MessageRole::Assistant);
        assert!(msg.content.is_none());
        assert!(msg.extra.contains_key("tool_calls"));
        assert_eq!(serde_json::to_value(&msg).unwrap(), raw);
    }

    #[test]
    fn test_missing_content_reads_as_none() {
        let msg: Message = serde_json::from_value(json!({"role": "tool", "tool_call_id": "call_1"})).unwrap();
        assert!(msg.content.is_none());
        assert_eq!(msg.extra.get("tool_call_id"), Some(&json!("call_1")));
    }
}
