//! Admission policy: which requests take part in caching at all.

use super::config::CacheConfig;
use crate::types::CacheableRequest;

/// Outcome of the eligibility check, with the rule that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Disabled,
    ExcludedModel,
    StreamingDisabled,
}

impl Eligibility {
    pub fn is_eligible(self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Eligibility::Eligible => "eligible",
            Eligibility::Disabled => "cache_disabled",
            Eligibility::ExcludedModel => "model_excluded",
            Eligibility::StreamingDisabled => "streaming_not_cached",
        }
    }
}

impl std::fmt::Display for Eligibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rules apply in order: enablement, model exclusion, streaming.
pub fn evaluate(request: &CacheableRequest, config: &CacheConfig) -> Eligibility {
    if !config.enabled {
        return Eligibility::Disabled;
    }
    if config.is_excluded(&request.model) {
        return Eligibility::ExcludedModel;
    }
    if request.stream && !config.cache_streaming {
        return Eligibility::StreamingDisabled;
    }
    Eligibility::Eligible
}

/// Used unchanged on both the read and the write path.
pub fn should_cache(request: &CacheableRequest, config: &CacheConfig) -> bool {
    evaluate(request, config).is_eligible()
}
