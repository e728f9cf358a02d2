//! Cache manager.

use super::backend::{CacheBackend, CacheEntry, CacheStats, HealthReport};
use super::config::{BackendConfig, CacheConfig, CacheSettings};
use super::key::{CacheKey, CacheKeyGenerator};
use super::local::LocalCache;
use super::policy::{self, Eligibility};
use crate::types::{CacheableRequest, CompletionResponse};
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One cache instance: validated policy, key derivation and a backend.
///
/// Build it once at the composition root and share it as
/// `Arc<CacheManager>`. The policy it was built with cannot change.
pub struct CacheManager {
    config: Arc<CacheConfig>,
    keys: CacheKeyGenerator,
    backend: Box<dyn CacheBackend>,
}

impl CacheManager {
    /// Wrap an existing backend. The backend must have been built from the
    /// same `config`.
    pub fn new(config: Arc<CacheConfig>, backend: Box<dyn CacheBackend>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            keys: CacheKeyGenerator::new(),
            backend,
        })
    }

    /// In-process LRU backend.
    pub fn local(config: CacheConfig) -> Result<Self> {
        let config = Arc::new(config);
        let backend = LocalCache::new(config.clone());
        Self::new(config, Box::new(backend))
    }

    #[cfg(feature = "distributed")]
    pub fn distributed(config: CacheConfig, store: super::config::DistributedConfig) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let backend = super::distributed::DistributedCache::new(config.clone(), store)?;
        Self::new(config, Box::new(backend))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn key_for(&self, request: &CacheableRequest) -> CacheKey {
        self.keys.generate(request)
    }

    pub fn eligibility(&self, request: &CacheableRequest) -> Eligibility {
        policy::evaluate(request, &self.config)
    }

    pub fn should_cache(&self, request: &CacheableRequest) -> bool {
        self.eligibility(request).is_eligible()
    }

    // Primitive operations, straight through to the backend.

    pub async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.backend.get(key).await
    }

    pub async fn set(
        &self,
        key: &str,
        response: &CompletionResponse,
        model: &str,
        tokens: u64,
    ) -> Result<()> {
        self.backend.set(key, response, model, tokens).await
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        self.backend.delete(key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }

    pub async fn get_stats(&self) -> Result<CacheStats> {
        self.backend.stats().await
    }

    pub async fn health_check(&self) -> HealthReport {
        self.backend.health_check().await
    }

    /// Cached response for `request`, if it is eligible and a live entry
    /// exists. Ineligible requests never reach the backend.
    pub async fn get_response(&self, request: &CacheableRequest) -> Result<Option<CompletionResponse>> {
        let eligibility = self.eligibility(request);
        if !eligibility.is_eligible() {
            debug!(model = %request.model, reason = %eligibility, "cache lookup skipped");
            return Ok(None);
        }
        let key = self.keys.generate(request);
        match self.backend.get(key.as_str()).await? {
            Some(entry) if !entry.is_expired() => {
                debug!(key = key.short(), model = %request.model, "cache hit");
                Ok(Some(entry.into_response()))
            }
            Some(_) => {
                debug!(key = key.short(), "cache entry expired");
                Ok(None)
            }
            None => {
                debug!(key = key.short(), model = %request.model, "cache miss");
                Ok(None)
            }
        }
    }

    /// Store `response` for `request` if the request is eligible.
    pub async fn cache_response(
        &self,
        request: &CacheableRequest,
        response: &CompletionResponse,
    ) -> Result<()> {
        let eligibility = self.eligibility(request);
        if !eligibility.is_eligible() {
            debug!(model = %request.model, reason = %eligibility, "cache store skipped");
            return Ok(());
        }
        let key = self.keys.generate(request);
        self.backend
            .set(
                key.as_str(),
                response,
                &request.model,
                response.total_tokens(),
            )
            .await
    }

    /// Return the cached response or run `compute`, caching what it yields.
    ///
    /// A failed computation is passed through as-is and nothing is stored.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        request: &CacheableRequest,
        compute: F,
    ) -> std::result::Result<CompletionResponse, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<CompletionResponse, E>>,
        E: From<crate::Error>,
    {
        if let Some(hit) = self.get_response(request).await? {
            return Ok(hit);
        }
        let response = compute().await?;
        self.cache_response(request, &response).await?;
        Ok(response)
    }
}

impl CacheSettings {
    /// Composition root: build the one cache this deployment runs.
    pub fn build_manager(&self) -> Result<CacheManager> {
        self.validate()?;
        match &self.backend {
            BackendConfig::Local {
                cleanup_interval_secs,
            } => {
                let config = Arc::new(self.cache.clone());
                let backend = LocalCache::new(config.clone())
                    .with_cleanup_interval(Duration::from_secs(*cleanup_interval_secs));
                CacheManager::new(config, Box::new(backend))
            }
            #[cfg(feature = "distributed")]
            BackendConfig::Distributed(store) => {
                CacheManager::distributed(self.cache.clone(), store.clone())
            }
            #[cfg(not(feature = "distributed"))]
            BackendConfig::Distributed(_) => Err(crate::Error::configuration_with_context(
                "distributed backend requested but this build lacks the `distributed` feature",
                crate::ErrorContext::new()
                    .with_field_path("backend.kind")
                    .with_source("cache_settings"),
            )),
        }
    }
}
