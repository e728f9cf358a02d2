use ai_lib_cache::cache::{BackendConfig, CacheSettings};
use ai_lib_cache::types::{CacheableRequest, CompletionResponse, Message};
use std::path::PathBuf;

fn write_temp(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ai-lib-cache-{}-{}", std::process::id(), name));
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn test_settings_file_builds_working_manager() {
    let path = write_temp(
        "local.yaml",
        r#"
cache:
  ttl: 120
  max_size: 2
  excluded_models: [gpt-4o-realtime]
backend:
  kind: local
  cleanup_interval_secs: 30
"#,
    );
    let settings = CacheSettings::from_yaml_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(settings.cache.ttl, 120);
    assert_eq!(settings.cache.max_size, Some(2));
    assert!(settings.cache.is_excluded("gpt-4o-realtime"));
    assert_eq!(
        settings.backend,
        BackendConfig::Local {
            cleanup_interval_secs: 30
        }
    );

    let manager = settings.build_manager().unwrap();
    assert_eq!(manager.backend_name(), "local");

    let req = CacheableRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
    manager
        .cache_response(&req, &CompletionResponse::text("hello"))
        .await
        .unwrap();
    assert!(manager.get_response(&req).await.unwrap().is_some());
    assert_eq!(manager.get_stats().await.unwrap().ttl, 120);
}

#[test]
fn test_invalid_settings_file_is_rejected() {
    let path = write_temp("bad.yaml", "cache:\n  ttl: 0\n");
    let result = CacheSettings::from_yaml_file(&path);
    std::fs::remove_file(&path).ok();
    let err = result.unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_unknown_setting_is_rejected() {
    let path = write_temp("typo.yaml", "cache:\n  tll: 60\n");
    let result = CacheSettings::from_yaml_file(&path);
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
}

#[test]
fn test_missing_settings_file_is_io_error() {
    let path = std::env::temp_dir().join("ai-lib-cache-does-not-exist.yaml");
    let err = CacheSettings::from_yaml_file(&path).unwrap_err();
    assert!(matches!(err, ai_lib_cache::Error::Io(_)));
}

#[cfg(feature = "distributed")]
#[test]
fn test_distributed_settings_build_without_connecting() {
    let settings = CacheSettings::from_yaml_str(
        r#"
backend:
  kind: distributed
  url: redis://127.0.0.1:1/0
  key_prefix: "gw:cache:"
"#,
    )
    .unwrap();
    let manager = settings.build_manager().unwrap();
    assert_eq!(manager.backend_name(), "distributed");
}
