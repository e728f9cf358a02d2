//! Cache key generation.

use crate::types::CacheableRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// A request fingerprint: lowercase hex SHA-256 of the canonical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub hash: String,
    pub model: Option<String>,
}

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            model: None,
        }
    }
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
    pub fn as_str(&self) -> &str {
        &self.hash
    }
    /// First eight hex chars, for log fields.
    pub fn short(&self) -> &str {
        self.hash.get(..8).unwrap_or(&self.hash)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Derives deterministic fingerprints from cacheable requests.
///
/// The canonical form always holds `model` and `messages`; `temperature`,
/// `max_tokens`, `top_p`, `tools` and `response_format` appear only when the
/// request sets them. Object keys are sorted at every depth and the JSON is
/// written with compact separators, so the digest depends on content alone.
/// The `stream` flag is not part of the fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyGenerator;

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, request: &CacheableRequest) -> CacheKey {
        let canonical = self.canonical_string(request);
        let hash: String = Sha256::digest(canonical.as_bytes())
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        CacheKey::new(hash).with_model(request.model.clone())
    }

    /// The exact string that gets hashed.
    pub fn canonical_string(&self, request: &CacheableRequest) -> String {
        serde_json::to_string(&self.canonical_form(request)).unwrap_or_default()
    }

    pub fn canonical_form(&self, request: &CacheableRequest) -> Value {
        let mut parts = Map::new();
        parts.insert("model".into(), Value::String(request.model.clone()));
        parts.insert("messages".into(), to_value(&request.messages));
        if let Some(t) = request.temperature {
            parts.insert("temperature".into(), to_value(&t));
        }
        if let Some(m) = request.max_tokens {
            parts.insert("max_tokens".into(), Value::from(m));
        }
        if let Some(p) = request.top_p {
            parts.insert("top_p".into(), to_value(&p));
        }
        if let Some(ref tools) = request.tools {
            parts.insert("tools".into(), to_value(tools));
        }
        if let Some(ref format) = request.response_format {
            parts.insert("response_format".into(), format.clone());
        }
        canonicalize(Value::Object(parts))
    }

    pub fn generate_from_json(&self, body: &Value) -> crate::Result<CacheKey> {
        Ok(self.generate(&CacheableRequest::from_json(body)?))
    }
}

/// Fingerprint a request with the default generator.
pub fn derive_key(request: &CacheableRequest) -> CacheKey {
    CacheKeyGenerator::new().generate(request)
}

fn to_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

// Rebuild objects with keys inserted in sorted order, so the output is
// ordered whether or not serde_json's `preserve_order` is enabled.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
