//! Shared-store backend over the Redis protocol.
//!
//! Entries are JSON documents under `<prefix><fingerprint>` with a native
//! per-key TTL, so expiry needs no sweeping on our side. The store exposes
//! no recency order, so `max_size` is enforced approximately: after a
//! write, keys under the prefix are ranked by remaining TTL and the ones
//! closest to expiry are deleted until the count fits.
//!
//! Every store failure is absorbed here. Reads become misses, writes are
//! dropped, and a warning is logged; nothing is retried.

use super::backend::{hit_ratio, short_key, CacheBackend, CacheEntry, CacheStats, HealthReport};
use super::config::{CacheConfig, DistributedConfig};
use crate::types::CompletionResponse;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// After a failed connect, skip new attempts for this long.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);
const SCAN_COUNT: usize = 500;
const DEL_CHUNK: usize = 500;

#[derive(Debug, thiserror::Error)]
enum StoreError {
    #[error("connect to {url} timed out after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },
    #[error("store unavailable (last connect failed {0:?} ago)")]
    Backoff(Duration),
    #[error("store command failed: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("entry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

type StoreResult<T> = std::result::Result<T, StoreError>;

pub struct DistributedCache {
    config: Arc<CacheConfig>,
    store: DistributedConfig,
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    last_connect_failure: Mutex<Option<Instant>>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

impl DistributedCache {
    /// Validates the store parameters; does not connect. The first
    /// operation opens the connection, so an unreachable store at startup
    /// only costs misses.
    pub fn new(config: Arc<CacheConfig>, store: DistributedConfig) -> Result<Self> {
        store.validate()?;
        let client = redis::Client::open(store.url.as_str()).map_err(|e| {
            Error::configuration_with_context(
                "invalid store url",
                ErrorContext::new()
                    .with_field_path("backend.url")
                    .with_details(e.to_string())
                    .with_source("distributed_cache"),
            )
        })?;
        info!(
            store = %store.redacted_url(),
            prefix = %store.key_prefix,
            ttl = config.ttl,
            max_size = ?config.max_size,
            "distributed cache configured"
        );
        Ok(Self {
            config,
            store,
            client,
            conn: OnceCell::new(),
            last_connect_failure: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn key_prefix(&self) -> &str {
        &self.store.key_prefix
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.store.key_prefix, key)
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn.clone());
        }
        if let Ok(last) = self.last_connect_failure.lock() {
            if let Some(at) = *last {
                let since = at.elapsed();
                if since < RECONNECT_BACKOFF {
                    return Err(StoreError::Backoff(since));
                }
            }
        }

        let timeout = self.store.connect_timeout();
        let result = self
            .conn
            .get_or_try_init(|| async {
                match tokio::time::timeout(timeout, ConnectionManager::new(self.client.clone()))
                    .await
                {
                    Ok(Ok(conn)) => Ok(conn),
                    Ok(Err(e)) => Err(StoreError::Redis(e)),
                    Err(_) => Err(StoreError::ConnectTimeout {
                        url: self.store.redacted_url(),
                        timeout,
                    }),
                }
            })
            .await;

        if let Ok(mut last) = self.last_connect_failure.lock() {
            *last = if result.is_err() {
                Some(Instant::now())
            } else {
                None
            };
        }
        result.cloned()
    }

    async fn try_get(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.namespaced(key))
            .query_async(&mut conn)
            .await?;
        match raw {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn try_set(
        &self,
        key: &str,
        response: &CompletionResponse,
        model: &str,
        tokens: u64,
    ) -> StoreResult<()> {
        let entry = CacheEntry::new(
            key,
            response.clone(),
            model,
            tokens,
            self.config.ttl_duration(),
        );
        let data = serde_json::to_string(&entry)?;
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(self.namespaced(key))
            .arg(data)
            .arg("EX")
            .arg(self.config.ttl)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn scan_keys(&self, conn: &mut ConnectionManager) -> StoreResult<Vec<String>> {
        let pattern = format!("{}*", escape_glob(&self.store.key_prefix));
        // SCAN may repeat keys across iterations.
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut *conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(keys.into_iter().collect())
    }

    async fn delete_keys(&self, conn: &mut ConnectionManager, keys: &[String]) -> StoreResult<u64> {
        let mut removed = 0;
        for chunk in keys.chunks(DEL_CHUNK) {
            let n: u64 = redis::cmd("DEL").arg(chunk).query_async(&mut *conn).await?;
            removed += n;
        }
        Ok(removed)
    }

    async fn enforce_capacity(&self, max_size: usize) -> StoreResult<usize> {
        let mut conn = self.connection().await?;
        let keys = self.scan_keys(&mut conn).await?;
        if keys.len() <= max_size {
            return Ok(0);
        }
        let mut pipe = redis::pipe();
        for key in &keys {
            pipe.cmd("TTL").arg(key);
        }
        let ttls: Vec<i64> = pipe.query_async(&mut conn).await?;
        let victims = select_evictions(keys.into_iter().zip(ttls).collect(), max_size);
        if victims.is_empty() {
            return Ok(0);
        }
        let removed = self.delete_keys(&mut conn, &victims).await?;
        debug!(removed, max_size, "distributed cache trimmed to capacity");
        Ok(removed as usize)
    }

    async fn try_delete(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.connection().await?;
        let removed: u64 = redis::cmd("DEL")
            .arg(self.namespaced(key))
            .query_async(&mut conn)
            .await?;
        Ok(removed)
    }

    async fn try_count(&self) -> StoreResult<usize> {
        let mut conn = self.connection().await?;
        Ok(self.scan_keys(&mut conn).await?.len())
    }

    async fn try_clear(&self) -> StoreResult<u64> {
        let mut conn = self.connection().await?;
        let keys = self.scan_keys(&mut conn).await?;
        self.delete_keys(&mut conn, &keys).await
    }

    /// Count a lookup and turn store failures and stale entries into misses.
    fn record_lookup(&self, key: &str, fetched: StoreResult<Option<CacheEntry>>) -> Option<CacheEntry> {
        match fetched {
            Ok(Some(entry)) if entry.is_expired() => {
                // Store TTL lags the entry's own expiry by under a second.
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = short_key(key), "distributed cache entry expired");
                None
            }
            Ok(Some(entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = short_key(key), "distributed cache hit");
                Some(entry)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key = short_key(key), error = %e, "distributed cache read failed, treating as miss");
                None
            }
        }
    }

    async fn try_health(&self) -> StoreResult<(u64, usize)> {
        let started = Instant::now();
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        let latency = started.elapsed().as_millis() as u64;
        let entries = self.scan_keys(&mut conn).await?.len();
        Ok((latency, entries))
    }
}

#[async_trait]
impl CacheBackend for DistributedCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let fetched = self.try_get(key).await;
        Ok(self.record_lookup(key, fetched))
    }

    async fn set(
        &self,
        key: &str,
        response: &CompletionResponse,
        model: &str,
        tokens: u64,
    ) -> Result<()> {
        if let Err(e) = self.try_set(key, response, model, tokens).await {
            warn!(key = short_key(key), error = %e, "distributed cache write dropped");
            return Ok(());
        }
        self.sets.fetch_add(1, Ordering::Relaxed);
        if let Some(max) = self.config.max_size {
            if let Err(e) = self.enforce_capacity(max).await {
                warn!(error = %e, "distributed cache capacity enforcement failed");
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match self.try_delete(key).await {
            Ok(n) => Ok(n > 0),
            Err(e) => {
                warn!(key = short_key(key), error = %e, "distributed cache delete failed");
                Ok(false)
            }
        }
    }

    async fn clear(&self) -> Result<()> {
        match self.try_clear().await {
            Ok(removed) => debug!(removed, "distributed cache cleared"),
            Err(e) => warn!(error = %e, "distributed cache clear failed"),
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.sets.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let total_entries = match self.try_count().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "distributed cache key count failed");
                0
            }
        };
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        Ok(CacheStats {
            backend: self.name(),
            total_entries,
            active_entries: None,
            max_size: self.config.max_size,
            hits,
            misses,
            sets: Some(self.sets.load(Ordering::Relaxed)),
            hit_rate: hit_ratio(hits, misses),
            ttl: self.config.ttl,
            key_prefix: Some(self.store.key_prefix.clone()),
        })
    }

    async fn health_check(&self) -> HealthReport {
        let mut report = match self.try_health().await {
            Ok((latency, entries)) => HealthReport {
                latency_ms: Some(latency),
                entries: Some(entries),
                ..HealthReport::healthy(self.name())
            },
            Err(e) => HealthReport::unhealthy(self.name(), e.to_string()),
        };
        report.store = Some(self.store.redacted_url());
        report.key_prefix = Some(self.store.key_prefix.clone());
        report
    }

    fn name(&self) -> &'static str {
        "distributed"
    }
}

/// Pick the keys to delete so at most `max_size` remain, closest to
/// expiry first. `TTL` replies of -2 (already gone) are skipped and -1
/// (no expiry) ranks last.
fn select_evictions(mut keyed: Vec<(String, i64)>, max_size: usize) -> Vec<String> {
    keyed.retain(|(_, ttl)| *ttl != -2);
    if keyed.len() <= max_size {
        return Vec::new();
    }
    keyed.sort_by_key(|(_, ttl)| if *ttl < 0 { i64::MAX } else { *ttl });
    let excess = keyed.len() - max_size;
    keyed.into_iter().take(excess).map(|(k, _)| k).collect()
}

fn escape_glob(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
