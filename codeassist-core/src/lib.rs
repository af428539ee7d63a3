//! # codeassist-core
//!
//! Shared infrastructure for the codeassist request path: everything that has
//! to stay correct when many sessions in one process hit the same expensive
//! resources.
//!
//! ## Features
//!
//! - Keyed TTL caches with single-flight population ([`cache::TtlCache`])
//! - Stateless accelerator lifecycle and host diagnostics ([`resource::ResourceManager`])
//! - Named operation timing with structured log output ([`monitor::PerformanceMonitor`])
//! - A closed error taxonomy scoped to one request ([`error::AssistError`])
//!
//! ## Example
//!
//! ```no_run
//! use codeassist_core::{monitor::PerformanceMonitor, resource::ResourceManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let monitor = PerformanceMonitor::new();
//!     let resources = ResourceManager::cpu_only();
//!
//!     resources.release_unused();
//!     let answer = monitor
//!         .track("heavy_step", async { 6 * 7 })
//!         .await;
//!     resources.release_unused();
//!
//!     println!("{answer}: {:?}", resources.device_info());
//! }
//! ```

pub mod cache;
pub mod error;
pub mod monitor;
pub mod resource;

// Re-export main types for convenience
pub use cache::{
    start_auto_cleanup, CacheConfig, CacheConfigBuilder, CacheEntry, CacheMetadata, CacheStats,
    InvalidationEvent, InvalidationReason, TtlCache,
};
pub use error::{AssistError, Result};
pub use monitor::{OperationSummary, PerformanceMonitor};
pub use resource::{
    Accelerator, DeviceInfo, DeviceReport, DeviceSample, HostStats, MemoryInfo, NoAccelerator,
    NvidiaSmi, ResourceManager, SystemReport,
};
