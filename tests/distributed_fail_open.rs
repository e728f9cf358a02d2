#![cfg(feature = "distributed")]
//! The shared-store backend against an address nothing listens on.

use ai_lib_cache::cache::{CacheConfig, CacheManager, DistributedConfig};
use ai_lib_cache::types::{CacheableRequest, CompletionResponse, Message};
use std::time::Duration;

fn unreachable_store() -> DistributedConfig {
    DistributedConfig::new("redis://127.0.0.1:1/0")
        .with_key_prefix("test:cache:")
        .with_connect_timeout(Duration::from_millis(300))
}

fn request() -> CacheableRequest {
    CacheableRequest::new("gpt-4o-mini", vec![Message::user("anyone there?")])
}

#[tokio::test]
async fn test_unreachable_store_reads_as_miss() {
    let cache = CacheManager::distributed(CacheConfig::default(), unreachable_store()).unwrap();
    let req = request();

    assert!(cache.get_response(&req).await.unwrap().is_none());
    cache
        .cache_response(&req, &CompletionResponse::text("lost"))
        .await
        .unwrap();
    assert!(cache.get_response(&req).await.unwrap().is_none());

    let stats = cache.get_stats().await.unwrap();
    assert_eq!(stats.backend, "distributed");
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.hits, 0);
    assert_eq!(stats.sets, Some(0));
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.key_prefix.as_deref(), Some("test:cache:"));
}

#[tokio::test]
async fn test_unreachable_store_primitives_do_not_error() {
    let cache = CacheManager::distributed(CacheConfig::default(), unreachable_store()).unwrap();
    assert!(!cache.delete("abc").await.unwrap());
    cache.clear().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_store_reports_unhealthy() {
    let cache = CacheManager::distributed(CacheConfig::default(), unreachable_store()).unwrap();
    let report = cache.health_check().await;
    assert!(!report.healthy);
    assert_eq!(report.backend, "distributed");
    assert!(report.error.is_some());
    assert_eq!(report.store.as_deref(), Some("redis://127.0.0.1:1/0"));
    assert_eq!(report.key_prefix.as_deref(), Some("test:cache:"));
}

#[test]
fn test_invalid_store_url_fails_construction() {
    let store = DistributedConfig::new("http://127.0.0.1:6379");
    assert!(CacheManager::distributed(CacheConfig::default(), store).is_err());
}
