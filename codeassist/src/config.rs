//! Fixed tuning constants and the bundle the assistant is built from

use std::ops::RangeInclusive;
use std::time::Duration;

use codeassist_core::CacheConfig;

/// Lifetime of the store/model pair
pub const COMPONENT_TTL: Duration = Duration::from_secs(3600);
/// Lifetime of cached retrievals and generations
pub const RESULT_TTL: Duration = Duration::from_secs(300);
/// Smallest length ever passed to the model
pub const GENERATION_LENGTH_FLOOR: usize = 500;
/// Room left for the completion on top of the prompt's word count
pub const GENERATION_LENGTH_MARGIN: usize = 200;
/// Documents retrieved per request
pub const DEFAULT_RETRIEVAL_K: usize = 3;
/// Requested length for the optional explanation
pub const EXPLANATION_MAX_LENGTH: usize = 300;
/// Accepted values for a request's `max_length`
pub const MAX_LENGTH_RANGE: RangeInclusive<usize> = 100..=1000;
/// Default `max_length` for a request
pub const DEFAULT_MAX_LENGTH: usize = 500;
pub const MAX_RESULT_ENTRIES: usize = 1_000;
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub component_ttl: Duration,
    pub result_ttl: Duration,
    pub length_floor: usize,
    pub length_margin: usize,
    pub retrieval_k: usize,
    pub explanation_max_length: usize,
    pub max_result_entries: usize,
    pub cleanup_interval: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            component_ttl: COMPONENT_TTL,
            result_ttl: RESULT_TTL,
            length_floor: GENERATION_LENGTH_FLOOR,
            length_margin: GENERATION_LENGTH_MARGIN,
            retrieval_k: DEFAULT_RETRIEVAL_K,
            explanation_max_length: EXPLANATION_MAX_LENGTH,
            max_result_entries: MAX_RESULT_ENTRIES,
            cleanup_interval: CLEANUP_INTERVAL,
        }
    }
}

impl AssistantConfig {
    /// Cache configuration for the single component slot
    pub fn component_cache(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: self.component_ttl,
            cleanup_interval: self.cleanup_interval,
            ..CacheConfig::components()
        }
    }

    /// Cache configuration shared by the query and generation caches
    pub fn result_cache(&self) -> CacheConfig {
        CacheConfig {
            default_ttl: self.result_ttl,
            max_entries: self.max_result_entries,
            cleanup_interval: self.cleanup_interval,
            ..CacheConfig::results()
        }
    }
}
