//! Reasons and events for entries leaving a cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Entry expired based on TTL
    Expired,

    /// Replaced by an explicit refresh
    Refreshed,

    /// Evicted due to the entry count limit
    SizeLimit,

    /// Whole cache cleared
    Cleared,
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Expired => write!(f, "TTL expired"),
            InvalidationReason::Refreshed => write!(f, "explicit refresh"),
            InvalidationReason::SizeLimit => write!(f, "cache size limit reached"),
            InvalidationReason::Cleared => write!(f, "cache cleared"),
        }
    }
}

/// A batch of entries removed for the same reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Why the entries were removed
    pub reason: InvalidationReason,

    /// Number of entries removed
    pub count: usize,

    /// When the removal happened
    pub timestamp: DateTime<Utc>,

    /// Optional context
    pub context: Option<String>,
}

impl InvalidationEvent {
    /// Create a new invalidation event
    pub fn new(reason: InvalidationReason, count: usize) -> Self {
        Self {
            reason,
            count,
            timestamp: Utc::now(),
            context: None,
        }
    }

    /// Add context to the event
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
