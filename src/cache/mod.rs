//! # Response Caching Module
//!
//! Avoids recomputing a model completion when an equivalent request was
//! served recently. A request is fingerprinted (SHA-256 over a canonical
//! JSON form), checked against the admission policy, and looked up in
//! exactly one backend.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheManager`] | Policy + key derivation + backend, with `get_response` / `cache_response` |
//! | [`CacheConfig`] | Validated policy knobs (ttl, max_size, exclusions, ...) |
//! | [`CacheSettings`] | Policy plus backend selection, loadable from YAML or env |
//! | [`CacheBackend`] | Primitive contract implemented by every backend |
//! | [`LocalCache`] | In-process LRU + TTL cache |
//! | `DistributedCache` | Redis-protocol shared cache (feature `distributed`) |
//! | [`CacheKeyGenerator`] | Deterministic request fingerprints |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_cache::cache::{CacheConfig, CacheManager};
//! use ai_lib_cache::types::{CacheableRequest, CompletionResponse, Message};
//!
//! # tokio_test::block_on(async {
//! let cache = CacheManager::local(CacheConfig::new().with_ttl(600).with_max_size(1000))?;
//! let request = CacheableRequest::new("gpt-4o-mini", vec![Message::user("ping")]);
//!
//! assert!(cache.get_response(&request).await?.is_none());
//! cache.cache_response(&request, &CompletionResponse::text("pong")).await?;
//! assert!(cache.get_response(&request).await?.is_some());
//! # Ok::<(), ai_lib_cache::Error>(())
//! # }).unwrap();
//! ```
//!
//! ## Failure semantics
//!
//! The cache is an optimization only. The shared-store backend turns read
//! failures into misses and drops failed writes; only configuration and
//! setup errors are returned to the caller.

mod backend;
mod config;
#[cfg(feature = "distributed")]
mod distributed;
mod key;
mod local;
mod manager;
pub mod policy;

pub use backend::{CacheBackend, CacheEntry, CacheStats, HealthReport};
pub use config::{
    BackendConfig, CacheConfig, CacheSettings, DistributedConfig, DEFAULT_CLEANUP_INTERVAL_SECS,
    DEFAULT_KEY_PREFIX, DEFAULT_TTL_SECS, MAX_TTL_SECS,
};
#[cfg(feature = "distributed")]
pub use distributed::DistributedCache;
pub use key::{derive_key, CacheKey, CacheKeyGenerator};
pub use local::LocalCache;
pub use manager::CacheManager;
pub use policy::{should_cache, Eligibility};
