use ai_lib_cache::cache::{derive_key, CacheKeyGenerator};
use ai_lib_cache::types::{CacheableRequest, Message};
use serde_json::json;

fn base() -> CacheableRequest {
    CacheableRequest::new(
        "gpt-4o-mini",
        vec![Message::system("be brief"), Message::user("What is Rust?")],
    )
    .temperature(0.2)
}

#[test]
fn test_identical_requests_share_a_key() {
    let a = derive_key(&base());
    let b = derive_key(&base());
    assert_eq!(a, b);
    assert_eq!(a.as_str().len(), 64);
    assert!(a
        .as_str()
        .chars()
        .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
}

#[test]
fn test_temperature_change_changes_key() {
    let a = derive_key(&base());
    let b = derive_key(&base().temperature(0.3));
    assert_ne!(a, b);
}

#[test]
fn test_message_order_matters() {
    let forward = CacheableRequest::new(
        "gpt-4o-mini",
        vec![Message::user("first"), Message::user("second")],
    );
    let reversed = CacheableRequest::new(
        "gpt-4o-mini",
        vec![Message::user("second"), Message::user("first")],
    );
    assert_ne!(derive_key(&forward), derive_key(&reversed));
}

#[test]
fn test_absent_parameter_differs_from_explicit_default() {
    let bare = CacheableRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
    let explicit = bare.clone().temperature(1.0);
    assert_ne!(derive_key(&bare), derive_key(&explicit));
}

#[test]
fn test_model_is_part_of_the_key() {
    let a = CacheableRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
    let b = CacheableRequest::new("gpt-4o", vec![Message::user("hi")]);
    assert_ne!(derive_key(&a), derive_key(&b));
}

#[test]
fn test_stream_flag_does_not_change_key() {
    let plain = base();
    let streamed = base().stream(true);
    assert_eq!(derive_key(&plain), derive_key(&streamed));
}

#[test]
fn test_json_field_order_is_irrelevant() {
    let keys = CacheKeyGenerator::new();
    let a = json!({
        "model": "gpt-4o-mini",
        "temperature": 0.2,
        "messages": [{"role": "user", "content": "hi"}],
        "response_format": {"type": "json_object", "strict": true}
    });
    let b = json!({
        "response_format": {"strict": true, "type": "json_object"},
        "messages": [{"content": "hi", "role": "user"}],
        "temperature": 0.2,
        "model": "gpt-4o-mini"
    });
    assert_eq!(
        keys.generate_from_json(&a).unwrap(),
        keys.generate_from_json(&b).unwrap()
    );
}

#[test]
fn test_unrelated_json_fields_are_ignored() {
    let keys = CacheKeyGenerator::new();
    let a = json!({"model": "gpt-4o-mini", "messages": [{"role": "user", "content": "hi"}]});
    let b = json!({
        "model": "gpt-4o-mini",
        "messages": [{"role": "user", "content": "hi"}],
        "user": "tenant-42",
        "stream": true
    });
    assert_eq!(
        keys.generate_from_json(&a).unwrap(),
        keys.generate_from_json(&b).unwrap()
    );
}

#[test]
fn test_request_without_model_is_rejected() {
    let keys = CacheKeyGenerator::new();
    let body = json!({"messages": [{"role": "user", "content": "hi"}]});
    assert!(keys.generate_from_json(&body).is_err());
}

#[test]
fn test_function_strict_flag_changes_key() {
    let keys = CacheKeyGenerator::new();
    let body = |strict: bool| {
        json!({
            "model": "gpt-4o-mini",
            "messages": [{"role": "user", "content": "hi"}],
            "tools": [{"type": "function", "function": {"name": "lookup", "parameters": {"type": "object"}, "strict": strict}}]
        })
    };
    assert_ne!(
        keys.generate_from_json(&body(true)).unwrap(),
        keys.generate_from_json(&body(false)).unwrap()
    );
}

#[test]
fn test_large_token_limits_are_rejected_not_clamped() {
    let keys = CacheKeyGenerator::new();
    for limit in [5_000_000_000u64, 6_000_000_000u64] {
        let body = json!({"model": "m", "messages": [], "max_tokens": limit});
        assert!(keys.generate_from_json(&body).is_err());
    }
}

#[test]
fn test_mistyped_temperature_is_rejected() {
    let keys = CacheKeyGenerator::new();
    let body = json!({"model": "m", "messages": [], "temperature": "0.5"});
    assert!(keys.generate_from_json(&body).is_err());
}

#[test]
fn test_tool_call_history_is_fingerprinted() {
    let keys = CacheKeyGenerator::new();
    let body = |call_id: &str| {
        json!({
            "model": "gpt-4o-mini",
            "messages": [
                {"role": "user", "content": "weather?"},
                {"role": "assistant", "content": null, "tool_calls": [{"id": call_id, "type": "function", "function": {"name": "w", "arguments": "{}"}}]},
                {"role": "tool", "tool_call_id": call_id, "content": "sunny"}
            ]
        })
    };
    let a = keys.generate_from_json(&body("c1")).unwrap();
    let b = keys.generate_from_json(&body("c2")).unwrap();
    assert_ne!(a, b);
}
