use ai_lib_cache::cache::{policy, CacheConfig, CacheManager, Eligibility};
use ai_lib_cache::types::{CacheableRequest, CompletionResponse, Message};

fn request(model: &str) -> CacheableRequest {
    CacheableRequest::new(model, vec![Message::user("hello")])
}

#[tokio::test]
async fn test_disabled_cache_never_stores() {
    let cache = CacheManager::local(CacheConfig::new().with_enabled(false)).unwrap();
    let req = request("gpt-4o-mini");

    cache
        .cache_response(&req, &CompletionResponse::text("hi"))
        .await
        .unwrap();
    assert!(cache.get_response(&req).await.unwrap().is_none());

    let stats = cache.get_stats().await.unwrap();
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.hits + stats.misses, 0);
}

#[tokio::test]
async fn test_excluded_model_is_bypassed() {
    let config = CacheConfig::new().exclude_model("gpt-4o-realtime");
    let cache = CacheManager::local(config).unwrap();

    let excluded = request("gpt-4o-realtime");
    cache
        .cache_response(&excluded, &CompletionResponse::text("live"))
        .await
        .unwrap();
    assert!(cache.get_response(&excluded).await.unwrap().is_none());
    assert_eq!(cache.eligibility(&excluded), Eligibility::ExcludedModel);

    let other = request("gpt-4o-mini");
    cache
        .cache_response(&other, &CompletionResponse::text("cached"))
        .await
        .unwrap();
    assert!(cache.get_response(&other).await.unwrap().is_some());
    assert_eq!(cache.get_stats().await.unwrap().total_entries, 1);
}

#[tokio::test]
async fn test_streaming_requests_follow_cache_streaming() {
    let req = request("gpt-4o-mini").stream(true);

    let off = CacheManager::local(CacheConfig::default()).unwrap();
    off.cache_response(&req, &CompletionResponse::text("chunked"))
        .await
        .unwrap();
    assert!(off.get_response(&req).await.unwrap().is_none());
    assert_eq!(off.eligibility(&req), Eligibility::StreamingDisabled);

    let on = CacheManager::local(CacheConfig::new().with_cache_streaming(true)).unwrap();
    on.cache_response(&req, &CompletionResponse::text("chunked"))
        .await
        .unwrap();
    assert!(on.get_response(&req).await.unwrap().is_some());
}

#[test]
fn test_rules_apply_in_order() {
    let config = CacheConfig::new()
        .with_enabled(false)
        .exclude_model("gpt-4o-mini");
    let req = request("gpt-4o-mini").stream(true);
    assert_eq!(policy::evaluate(&req, &config), Eligibility::Disabled);

    let config = config.with_enabled(true);
    assert_eq!(policy::evaluate(&req, &config), Eligibility::ExcludedModel);

    let config = CacheConfig::new();
    assert_eq!(policy::evaluate(&req, &config), Eligibility::StreamingDisabled);
    assert!(!policy::should_cache(&req, &config));
    assert!(policy::should_cache(&request("gpt-4o-mini"), &config));
}
