//! Cache policy configuration and backend selection.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TTL_SECS: u64 = 3600;
pub const DEFAULT_KEY_PREFIX: &str = "cache:";
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
/// Longest accepted entry lifetime: ten years.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Policy knobs shared by every backend.
///
/// Validate with [`CacheConfig::validate`] (or build through
/// [`CacheConfig::build`]); a [`CacheManager`](super::CacheManager) refuses
/// an invalid config at construction and never mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl: u64,
    /// Capacity bound; `None` is unbounded.
    pub max_size: Option<usize>,
    /// Reserved for similarity matching. Validated, otherwise unused.
    pub similarity_threshold: f64,
    pub enabled: bool,
    pub cache_streaming: bool,
    pub excluded_models: BTreeSet<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL_SECS,
            max_size: None,
            similarity_threshold: 1.0,
            enabled: true,
            cache_streaming: false,
            excluded_models: BTreeSet::new(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, secs: u64) -> Self {
        self.ttl = secs;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.max_size = None;
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_cache_streaming(mut self, cache_streaming: bool) -> Self {
        self.cache_streaming = cache_streaming;
        self
    }

    pub fn exclude_model(mut self, model: impl Into<String>) -> Self {
        self.excluded_models.insert(model.into());
        self
    }

    pub fn exclude_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_models
            .extend(models.into_iter().map(Into::into));
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl == 0 {
            return Err(Error::invalid_field(
                "cache.ttl",
                "ttl must be greater than zero",
            ));
        }
        if self.ttl > MAX_TTL_SECS {
            return Err(Error::configuration_with_context(
                "ttl is too large",
                ErrorContext::new()
                    .with_field_path("cache.ttl")
                    .with_details(format!("{} exceeds {} seconds", self.ttl, MAX_TTL_SECS))
                    .with_source("cache_config"),
            ));
        }
        if self.max_size == Some(0) {
            return Err(Error::invalid_field(
                "cache.max_size",
                "max_size must be a positive integer (omit it for an unbounded cache)",
            ));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::configuration_with_context(
                "similarity_threshold must be within [0, 1]",
                ErrorContext::new()
                    .with_field_path("cache.similarity_threshold")
                    .with_details(format!("got {}", self.similarity_threshold))
                    .with_source("cache_config"),
            ));
        }
        Ok(())
    }

    pub fn ttl_duration(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    pub fn is_excluded(&self, model: &str) -> bool {
        self.excluded_models.contains(model)
    }
}

/// Connection parameters for the shared-store backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedConfig {
    /// Store address, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DistributedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: default_key_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url).map_err(|e| {
            Error::configuration_with_context(
                "invalid store url",
                ErrorContext::new()
                    .with_field_path("backend.url")
                    .with_details(e.to_string())
                    .with_source("cache_config"),
            )
        })?;
        if !matches!(parsed.scheme(), "redis" | "rediss" | "redis+unix" | "unix") {
            return Err(Error::configuration_with_context(
                "unsupported store url scheme",
                ErrorContext::new()
                    .with_field_path("backend.url")
                    .with_details(format!("scheme `{}`", parsed.scheme()))
                    .with_source("cache_config"),
            ));
        }
        if self.connect_timeout_ms == 0 {
            return Err(Error::invalid_field(
                "backend.connect_timeout_ms",
                "connect timeout must be greater than zero",
            ));
        }
        Ok(())
    }

    /// The store address with any password stripped, for logs and reports.
    pub fn redacted_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut u) => {
                if u.password().is_some() {
                    let _ = u.set_password(Some("***"));
                }
                u.to_string()
            }
            Err(_) => "<invalid url>".to_string(),
        }
    }
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_cleanup_interval_secs() -> u64 {
    DEFAULT_CLEANUP_INTERVAL_SECS
}

/// Which backend a deployment runs. Exactly one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Local {
        #[serde(default = "default_cleanup_interval_secs")]
        cleanup_interval_secs: u64,
    },
    Distributed(DistributedConfig),
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local {
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
        }
    }
}

impl BackendConfig {
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Local { .. } => "local",
            BackendConfig::Distributed(_) => "distributed",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            BackendConfig::Local {
                cleanup_interval_secs,
            } => {
                if *cleanup_interval_secs == 0 {
                    return Err(Error::invalid_field(
                        "backend.cleanup_interval_secs",
                        "cleanup interval must be greater than zero",
                    ));
                }
                Ok(())
            }
            BackendConfig::Distributed(d) => d.validate(),
        }
    }
}

/// Everything needed to stand up one cache: policy plus backend.
///
/// ```yaml
/// cache:
///   ttl: 600
///   max_size: 10000
///   excluded_models: [gpt-4o-realtime]
/// backend:
///   kind: distributed
///   url: redis://cache.internal:6379/0
///   key_prefix: "gateway:cache:"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl CacheSettings {
    pub fn new(cache: CacheConfig, backend: BackendConfig) -> Self {
        Self { cache, backend }
    }

    pub fn validate(&self) -> Result<()> {
        self.cache.validate()?;
        self.backend.validate()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: CacheSettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Defaults overlaid with `AI_CACHE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `AI_CACHE_*` environment overrides on top of these settings.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Recognized names: `AI_CACHE_ENABLED`, `AI_CACHE_TTL`,
    /// `AI_CACHE_MAX_SIZE` (leave unset for unbounded), `AI_CACHE_STREAMING`, `AI_CACHE_EXCLUDED_MODELS`
    /// (comma-separated), `AI_CACHE_BACKEND` (`local`/`distributed`),
    /// `AI_CACHE_REDIS_URL`, `AI_CACHE_KEY_PREFIX`.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("AI_CACHE_ENABLED") {
            self.cache.enabled = parse_bool("AI_CACHE_ENABLED", &v)?;
        }
        if let Some(v) = lookup("AI_CACHE_TTL") {
            self.cache.ttl = parse_number("AI_CACHE_TTL", &v)?;
        }
        if let Some(v) = lookup("AI_CACHE_MAX_SIZE") {
            self.cache.max_size = Some(parse_number("AI_CACHE_MAX_SIZE", &v)?);
        }
        if let Some(v) = lookup("AI_CACHE_STREAMING") {
            self.cache.cache_streaming = parse_bool("AI_CACHE_STREAMING", &v)?;
        }
        if let Some(v) = lookup("AI_CACHE_EXCLUDED_MODELS") {
            self.cache.excluded_models = v
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
        }

        let url = lookup("AI_CACHE_REDIS_URL");
        let prefix = lookup("AI_CACHE_KEY_PREFIX");
        match lookup("AI_CACHE_BACKEND").as_deref().map(str::trim) {
            None => {}
            Some("local") => {
                if !matches!(self.backend, BackendConfig::Local { .. }) {
                    self.backend = BackendConfig::default();
                }
            }
            Some("distributed") => {
                if !matches!(self.backend, BackendConfig::Distributed(_)) {
                    let url = url.clone().ok_or_else(|| {
                        Error::invalid_field(
                            "AI_CACHE_REDIS_URL",
                            "distributed backend selected but no store url given",
                        )
                    })?;
                    self.backend = BackendConfig::Distributed(DistributedConfig::new(url));
                }
            }
            Some(other) => {
                return Err(Error::configuration_with_context(
                    "unknown cache backend",
                    ErrorContext::new()
                        .with_field_path("AI_CACHE_BACKEND")
                        .with_details(format!("`{}` (expected local or distributed)", other))
                        .with_source("cache_config"),
                ));
            }
        }
        if let BackendConfig::Distributed(ref mut d) = self.backend {
            if let Some(url) = url {
                d.url = url;
            }
            if let Some(prefix) = prefix {
                d.key_prefix = prefix;
            }
        }

        self.validate()?;
        Ok(self)
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::configuration_with_context(
            "expected a boolean",
            ErrorContext::new()
                .with_field_path(name)
                .with_details(format!("got `{}`", other))
                .with_source("cache_config"),
        )),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| {
        Error::configuration_with_context(
            "expected a non-negative integer",
            ErrorContext::new()
                .with_field_path(name)
                .with_details(format!("`{}`: {}", raw, e))
                .with_source("cache_config"),
        )
    })
}
