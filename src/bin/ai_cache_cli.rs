//! ai-cache-cli: inspect request fingerprints, validate cache settings, probe backends
//!
//! Usage:
//!   ai-cache-cli key <request.json> [--config <path>]   Print fingerprint and eligibility
//!   ai-cache-cli check <config.yaml>                     Validate a settings file
//!   ai-cache-cli health [config.yaml]                    Probe the configured backend
//!   ai-cache-cli version                                 Show version information

use ai_lib_cache::cache::CacheSettings;
use ai_lib_cache::cache::{policy, CacheKeyGenerator};
use ai_lib_cache::CacheableRequest;
use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "key" => cmd_key(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "health" => cmd_health(&args[2..]),
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"ai-cache-cli - response cache tooling

USAGE:
    ai-cache-cli <COMMAND> [OPTIONS]

COMMANDS:
    key <request.json> [--config <path>]   Print the fingerprint and eligibility of a request
    check <config.yaml>                    Validate a cache settings file
    health [config.yaml]                   Probe the configured backend and print a JSON report
    version                                Show version information
    help                                   Show this help message

ENVIRONMENT:
    AI_CACHE_ENABLED, AI_CACHE_TTL, AI_CACHE_MAX_SIZE, AI_CACHE_STREAMING,
    AI_CACHE_EXCLUDED_MODELS, AI_CACHE_BACKEND, AI_CACHE_REDIS_URL,
    AI_CACHE_KEY_PREFIX                    Override settings from file or defaults
    RUST_LOG                               Log filter (default: warn)"#
    );
}

fn cmd_version() {
    println!("ai-cache-cli {}", env!("CARGO_PKG_VERSION"));
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn positional(args: &[String]) -> Option<&str> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg.starts_with("--") {
            skip_next = true;
            continue;
        }
        return Some(arg.as_str());
    }
    None
}

/// Settings from an optional YAML file, then environment overrides.
fn load_settings(path: Option<&str>) -> anyhow::Result<CacheSettings> {
    let settings = match path {
        Some(p) => CacheSettings::from_yaml_file(p)
            .with_context(|| format!("loading settings from {p}"))?
            .with_env_overrides()?,
        None => CacheSettings::from_env()?,
    };
    Ok(settings)
}

fn cmd_key(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = positional(args) else {
        bail!("usage: ai-cache-cli key <request.json> [--config <path>]");
    };
    let path = PathBuf::from(path);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let body: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    let request = CacheableRequest::from_json(&body)?;

    let settings = load_settings(flag_value(args, "--config"))?;
    let keys = CacheKeyGenerator::new();
    let key = keys.generate(&request);
    let eligibility = policy::evaluate(&request, &settings.cache);

    println!("model:       {}", request.model);
    println!("key:         {key}");
    println!("eligibility: {eligibility}");
    println!("canonical:   {}", keys.canonical_string(&request));
    Ok(())
}

fn cmd_check(args: &[String]) -> anyhow::Result<()> {
    let Some(path) = positional(args) else {
        bail!("usage: ai-cache-cli check <config.yaml>");
    };
    let settings = CacheSettings::from_yaml_file(path)
        .with_context(|| format!("checking {path}"))?;

    println!("{path}: OK");
    println!("  backend:         {}", settings.backend.name());
    println!("  enabled:         {}", settings.cache.enabled);
    println!("  ttl:             {}s", settings.cache.ttl);
    match settings.cache.max_size {
        Some(n) => println!("  max_size:        {n}"),
        None => println!("  max_size:        unbounded"),
    }
    println!("  cache_streaming: {}", settings.cache.cache_streaming);
    if !settings.cache.excluded_models.is_empty() {
        let models: Vec<&str> = settings
            .cache
            .excluded_models
            .iter()
            .map(String::as_str)
            .collect();
        println!("  excluded_models: {}", models.join(", "));
    }
    Ok(())
}

fn cmd_health(args: &[String]) -> anyhow::Result<()> {
    let settings = load_settings(positional(args))?;
    let manager = settings.build_manager()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    let report = runtime.block_on(manager.health_check());

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.healthy {
        std::process::exit(2);
    }
    Ok(())
}
