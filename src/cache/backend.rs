//! Backend contract shared by the in-process and shared-store caches.

use super::config::MAX_TTL_SECS;
use crate::types::CompletionResponse;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// The stored unit.
///
/// Entries are never mutated; writing the same key again replaces the
/// whole entry. Timestamps are wall-clock so an entry written by one
/// process can be judged by another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    key: String,
    response: CompletionResponse,
    #[serde(with = "unix_seconds")]
    created_at: SystemTime,
    #[serde(with = "unix_seconds")]
    expires_at: SystemTime,
    model: String,
    tokens: u64,
}

impl CacheEntry {
    pub fn new(
        key: impl Into<String>,
        response: CompletionResponse,
        model: impl Into<String>,
        tokens: u64,
        ttl: Duration,
    ) -> Self {
        let now = SystemTime::now();
        // Saturate at the configured ceiling rather than overflow the clock.
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(Duration::from_secs(MAX_TTL_SECS)))
            .unwrap_or(now);
        Self {
            key: key.into(),
            response,
            created_at: now,
            expires_at,
            model: model.into(),
            tokens,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn response(&self) -> &CompletionResponse {
        &self.response
    }
    pub fn into_response(self) -> CompletionResponse {
        self.response
    }
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }
    pub fn model(&self) -> &str {
        &self.model
    }
    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry; zero once expired.
    pub fn remaining_ttl(&self) -> Duration {
        self.expires_at
            .duration_since(SystemTime::now())
            .unwrap_or(Duration::ZERO)
    }
}

mod unix_seconds {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        s.serialize_f64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = f64::deserialize(d)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(de::Error::custom(format!("invalid unix timestamp {}", secs)));
        }
        Duration::try_from_secs_f64(secs)
            .ok()
            .and_then(|d| UNIX_EPOCH.checked_add(d))
            .ok_or_else(|| de::Error::custom(format!("unix timestamp {} out of range", secs)))
    }
}

/// Point-in-time counters and sizes reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub backend: &'static str,
    pub total_entries: usize,
    /// Non-expired entries; only the local backend can count these.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_entries: Option<usize>,
    pub max_size: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    /// Successful writes; tracked by the shared-store backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sets: Option<u64>,
    /// `hits / (hits + misses)`, 0 before the first lookup.
    pub hit_rate: f64,
    pub ttl: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
}

impl CacheStats {
    pub fn hit_rate_percent(&self) -> f64 {
        self.hit_rate * 100.0
    }
}

/// First eight chars of a key, for log fields.
pub(crate) fn short_key(key: &str) -> &str {
    key.get(..8).unwrap_or(key)
}

pub(crate) fn hit_ratio(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

/// Liveness report. Building one never fails; problems land in `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub backend: &'static str,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthReport {
    pub fn healthy(backend: &'static str) -> Self {
        Self {
            backend,
            healthy: true,
            latency_ms: None,
            entries: None,
            store: None,
            key_prefix: None,
            error: None,
        }
    }

    pub fn unhealthy(backend: &'static str, error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            error: Some(error.into()),
            ..Self::healthy(backend)
        }
    }
}

/// Primitive cache operations, keyed by fingerprint.
///
/// Implementations own their entries outright and hand out clones.
/// Errors are reserved for setup problems; transient store trouble is
/// absorbed inside the implementation.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;
    async fn set(
        &self,
        key: &str,
        response: &CompletionResponse,
        model: &str,
        tokens: u64,
    ) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<bool>;
    async fn clear(&self) -> Result<()>;
    async fn stats(&self) -> Result<CacheStats>;
    async fn health_check(&self) -> HealthReport {
        HealthReport::healthy(self.name())
    }
    fn name(&self) -> &'static str;
}
