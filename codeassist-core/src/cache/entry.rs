//! Cache entry management with TTL support

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::Instant;

/// A cached value together with its validity envelope
///
/// Entries are immutable once stored: a re-store under the same key builds a
/// new entry with a fresh `created_at`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached value
    pub value: V,

    /// Entry metadata
    pub metadata: CacheMetadata,
}

/// Metadata associated with a cache entry
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    /// Monotonic creation time, used for validity checks
    pub created_at: Instant,

    /// Time-to-live for this entry
    pub ttl: Duration,

    /// Wall-clock insertion time, for diagnostics only
    pub inserted_at: DateTime<Utc>,

    /// Number of hits served from this entry
    pub access_count: u64,
}

impl<V> CacheEntry<V> {
    /// Create a new entry stamped with the current time
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            metadata: CacheMetadata {
                created_at: Instant::now(),
                ttl,
                inserted_at: Utc::now(),
                access_count: 0,
            },
        }
    }

    /// An entry is valid iff `now - created_at < ttl`
    pub fn is_valid(&self) -> bool {
        self.age() < self.metadata.ttl
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        !self.is_valid()
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        self.metadata.created_at.elapsed()
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        self.metadata.ttl.checked_sub(self.age()).filter(|d| !d.is_zero())
    }

    /// Mark the entry as accessed
    pub fn mark_accessed(&mut self) {
        self.metadata.access_count += 1;
    }
}
