//! # ai-lib-cache
//!
//! Response caching layer for AI-Protocol gateways.
//!
//! ## Overview
//!
//! A gateway calls [`CacheManager::get_response`] before invoking a model
//! and [`CacheManager::cache_response`] after a successful completion.
//! Between the two sits a deterministic request fingerprint, an admission
//! policy, and one of two interchangeable backends.
//!
//! ## Core Philosophy
//!
//! - **Deterministic keys**: the same request hashes to the same key in every process
//! - **One contract, two backends**: in-process LRU or a shared Redis-protocol store
//! - **Fail-open**: a broken or empty cache changes latency, never results
//! - **Explicit wiring**: no global instance; build one manager and inject it
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_lib_cache::{CacheSettings, CompletionResponse, CacheableRequest, Message};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> ai_lib_cache::Result<()> {
//!     let cache = Arc::new(CacheSettings::from_env()?.build_manager()?);
//!
//!     let request = CacheableRequest::new("gpt-4o-mini", vec![Message::user("Hello")])
//!         .temperature(0.0);
//!     let response = cache
//!         .get_or_compute(&request, || async {
//!             // call the model here
//!             Ok::<_, ai_lib_cache::Error>(CompletionResponse::text("Hi!"))
//!         })
//!         .await?;
//!     println!("{:?}", response.first_content());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Manager, policy, key derivation and backends |
//! | [`types`] | Request and response shapes |
//! | [`error`] | Error type and context |
//!
//! ## Features
//!
//! - `distributed` (default): the Redis-protocol shared backend.

pub mod cache;
pub mod error;
pub mod types;

pub use cache::{
    BackendConfig, CacheBackend, CacheConfig, CacheEntry, CacheKey, CacheManager, CacheSettings,
    CacheStats, DistributedConfig, HealthReport, LocalCache,
};
#[cfg(feature = "distributed")]
pub use cache::DistributedCache;
pub use error::{Error, ErrorContext};
pub use types::{CacheableRequest, CompletionResponse, Message, MessageRole, Usage};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
