//! # Result Caching Layer
//!
//! Time-boxed memoization shared by every session in the process.
//!
//! ## Features
//!
//! - **TTL validity**: an entry is valid iff `now - created_at < ttl`
//! - **Single flight**: concurrent misses on one key run one load and share its outcome
//! - **No poisoning**: failed loads store nothing, so the next call retries
//! - **LRU eviction**: bounded entry count
//! - **Cleanup**: optional background task dropping expired entries
//!
//! ## Example
//!
//! ```rust
//! use codeassist_core::cache::{CacheConfig, TtlCache};
//! use std::time::Duration;
//!
//! # async fn example() -> codeassist_core::Result<()> {
//! let config = CacheConfig::builder()
//!     .default_ttl(Duration::from_secs(300))
//!     .max_entries(1_000)
//!     .build();
//!
//! let cache: TtlCache<String, String> = TtlCache::new("answers", config)?;
//!
//! let value = cache
//!     .get_or_try_insert_with("question".to_string(), || async {
//!         Ok("expensive answer".to_string())
//!     })
//!     .await?;
//! assert_eq!(value, "expensive answer");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod invalidation;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, CacheMetadata};
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use store::{start_auto_cleanup, TtlCache};
pub use types::CacheStats;
