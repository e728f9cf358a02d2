//! Benchmarks for request fingerprinting
//!
//! This benchmark measures:
//! - Canonicalization and SHA-256 of short chat requests
//! - Cost growth with conversation length
//! - Requests carrying tool schemas

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ai_lib_cache::cache::CacheKeyGenerator;
use ai_lib_cache::types::{CacheableRequest, Message, ToolDefinition};

fn create_simple_request() -> CacheableRequest {
    CacheableRequest::new("gpt-4o", vec![Message::user("Hello, world!")])
        .temperature(0.7)
        .max_tokens(1000)
}

fn create_tool_request() -> CacheableRequest {
    let tool = ToolDefinition::function(
        "get_weather",
        Some("Get the current weather in a given location".to_string()),
        Some(serde_json::json!({
            "type": "object",
            "properties": {
                "location": {"type": "string", "description": "The city and state"},
                "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
            },
            "required": ["location"]
        })),
    );
    CacheableRequest::new(
        "gpt-4o",
        vec![
            Message::system("You are a helpful assistant that can check the weather."),
            Message::user("What is the weather like in Tokyo?"),
        ],
    )
    .temperature(0.0)
    .tools(vec![tool])
}

fn create_conversation(turns: usize) -> CacheableRequest {
    let mut messages = vec![Message::system("You are a helpful assistant.")];
    for i in 0..turns {
        messages.push(Message::user(format!("User message number {}", i)));
        messages.push(Message::assistant(format!("Assistant response number {}", i)));
    }
    CacheableRequest::new("gpt-4o", messages).temperature(0.7)
}

fn bench_key_generation(c: &mut Criterion) {
    let keys = CacheKeyGenerator::new();
    let mut group = c.benchmark_group("key_generation");

    let simple = create_simple_request();
    let with_tools = create_tool_request();

    group.bench_with_input(BenchmarkId::new("generate", "simple"), &simple, |b, req| {
        b.iter(|| keys.generate(black_box(req)))
    });
    group.bench_with_input(
        BenchmarkId::new("generate", "with_tools"),
        &with_tools,
        |b, req| b.iter(|| keys.generate(black_box(req))),
    );

    group.finish();
}

fn bench_conversation_length(c: &mut Criterion) {
    let keys = CacheKeyGenerator::new();
    let mut group = c.benchmark_group("key_generation_by_turns");

    for turns in [1usize, 10, 50] {
        let request = create_conversation(turns);
        group.throughput(Throughput::Elements(request.messages.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(turns), &request, |b, req| {
            b.iter(|| keys.generate(black_box(req)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_key_generation, bench_conversation_length);
criterion_main!(benches);
