//! Configuration for the cache system

use crate::error::{AssistError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`TtlCache`](crate::cache::TtlCache)
///
/// TTLs are fixed at process configuration time. Jitter is off by default so
/// validity follows `now - created_at < ttl` exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for new entries
    pub default_ttl: Duration,

    /// Maximum number of entries in the cache
    pub max_entries: usize,

    /// TTL jitter factor (0.0 - 1.0), spreads expiry of entries stored together
    pub ttl_jitter: f64,

    /// Evict least recently used entries first when full
    pub enable_lru_eviction: bool,

    /// Interval for the background cleanup task
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_entries: 1_000,
            ttl_jitter: 0.0,
            enable_lru_eviction: true,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(config_error("max_entries must be greater than 0"));
        }

        if self.default_ttl.is_zero() {
            return Err(config_error("default_ttl must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(config_error("ttl_jitter must be between 0.0 and 1.0"));
        }

        if self.cleanup_interval.is_zero() {
            return Err(config_error("cleanup_interval must be greater than 0"));
        }

        Ok(())
    }

    /// Calculate actual TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.default_ttl;
        }

        let base_secs = self.default_ttl.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(1.0);

        Duration::from_secs_f64(final_secs)
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    default_ttl: Option<Duration>,
    max_entries: Option<usize>,
    ttl_jitter: Option<f64>,
    enable_lru_eviction: Option<bool>,
    cleanup_interval: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Set default TTL for cache entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set maximum number of cache entries
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable LRU eviction
    pub fn enable_lru_eviction(mut self, enable: bool) -> Self {
        self.enable_lru_eviction = Some(enable);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            max_entries: self.max_entries.unwrap_or(defaults.max_entries),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            enable_lru_eviction: self
                .enable_lru_eviction
                .unwrap_or(defaults.enable_lru_eviction),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
        }
    }
}

fn config_error(message: &str) -> AssistError {
    AssistError::ConfigError(message.to_string())
}

/// Preset configurations for the two cache tiers
impl CacheConfig {
    /// Singleton slot for heavyweight handles: one hour, one entry
    pub fn components() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            max_entries: 1,
            ..Default::default()
        }
    }

    /// Short-lived memoization of retrieval and generation results
    pub fn results() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            max_entries: 1_000,
            ..Default::default()
        }
    }
}
