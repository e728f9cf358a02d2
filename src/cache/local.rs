//! In-process bounded cache: LRU eviction plus TTL expiry.

use super::backend::{hit_ratio, short_key, CacheBackend, CacheEntry, CacheStats, HealthReport};
use super::config::{CacheConfig, DEFAULT_CLEANUP_INTERVAL_SECS};
use crate::types::CompletionResponse;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use lru::LruCache;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;

struct State {
    // Recency order: `get` and `put` move a key to the MRU end.
    entries: LruCache<String, CacheEntry>,
    last_sweep: Instant,
    hits: u64,
    misses: u64,
}

impl State {
    /// Drop every expired entry if the sweep interval has passed.
    /// Runs under the instance lock, so two sweeps never overlap.
    fn maybe_sweep(&mut self, interval: Duration) -> usize {
        let now = Instant::now();
        if now.duration_since(self.last_sweep) <= interval {
            return 0;
        }
        self.last_sweep = now;

        let wall = SystemTime::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.is_expired_at(wall))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired {
            self.entries.pop(key);
        }
        if !expired.is_empty() {
            debug!(removed = expired.len(), "local cache sweep");
        }
        expired.len()
    }
}

/// Single-process cache backend.
///
/// Capacity is enforced by popping least-recently-used entries, never by
/// nearest expiry. Each operation holds one mutex for its whole
/// read-modify-write sequence.
pub struct LocalCache {
    config: Arc<CacheConfig>,
    cleanup_interval: Duration,
    state: Mutex<State>,
}

impl LocalCache {
    pub fn new(config: Arc<CacheConfig>) -> Self {
        Self {
            config,
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            state: Mutex::new(State {
                entries: LruCache::unbounded(),
                last_sweep: Instant::now(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Override how often `get`/`set` sweep out expired entries.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Entry count including not-yet-swept expired entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| {
            Error::runtime_with_context(
                "local cache lock poisoned",
                ErrorContext::new().with_source("local_cache"),
            )
        })
    }
}

#[async_trait]
impl CacheBackend for LocalCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        state.maybe_sweep(self.cleanup_interval);

        let expired = state
            .entries
            .peek(key)
            .map(|e| e.is_expired_at(SystemTime::now()));
        match expired {
            None => {
                state.misses += 1;
                Ok(None)
            }
            Some(true) => {
                state.entries.pop(key);
                state.misses += 1;
                debug!(key = short_key(key), "local cache entry expired");
                Ok(None)
            }
            Some(false) => {
                state.hits += 1;
                Ok(state.entries.get(key).cloned())
            }
        }
    }

    async fn set(
        &self,
        key: &str,
        response: &CompletionResponse,
        model: &str,
        tokens: u64,
    ) -> Result<()> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        state.maybe_sweep(self.cleanup_interval);

        // A replacement must not push out some other entry.
        state.entries.pop(key);
        if let Some(max) = self.config.max_size {
            while state.entries.len() >= max {
                match state.entries.pop_lru() {
                    Some((evicted, _)) => {
                        debug!(key = short_key(&evicted), "evicting LRU entry");
                    }
                    None => break,
                }
            }
        }
        let entry = CacheEntry::new(
            key,
            response.clone(),
            model,
            tokens,
            self.config.ttl_duration(),
        );
        state.entries.put(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.lock()?.entries.pop(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.entries.clear();
        state.hits = 0;
        state.misses = 0;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let state = self.lock()?;
        let now = SystemTime::now();
        let active = state
            .entries
            .iter()
            .filter(|(_, e)| !e.is_expired_at(now))
            .count();
        Ok(CacheStats {
            backend: self.name(),
            total_entries: state.entries.len(),
            active_entries: Some(active),
            max_size: self.config.max_size,
            hits: state.hits,
            misses: state.misses,
            sets: None,
            hit_rate: hit_ratio(state.hits, state.misses),
            ttl: self.config.ttl,
            key_prefix: None,
        })
    }

    async fn health_check(&self) -> HealthReport {
        match self.lock() {
            Ok(state) => HealthReport {
                entries: Some(state.entries.len()),
                ..HealthReport::healthy(self.name())
            },
            Err(e) => HealthReport::unhealthy(self.name(), e.to_string()),
        }
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
