//! Named operation timing
//!
//! Best-effort instrumentation: `start` opens a record, `end` closes it and
//! emits one log line with the elapsed seconds. Re-opening a name that is
//! already open restarts its clock (last start wins). Closing a name that
//! was never opened only logs a warning. Neither case can fail the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Timing record name for service start-up, up to accepting requests
pub const APP_STARTUP: &str = "app_startup";
/// Timing record name for building the store and model handles
pub const INIT_COMPONENTS: &str = "init_components";
/// Timing record name for rebuilding the store handle
pub const REFRESH_DATABASE: &str = "refresh_database";
/// Timing record name for document retrieval
pub const SIMILARITY_SEARCH: &str = "similarity_search";
/// Timing record name for model generation
pub const CODE_GENERATION: &str = "code_generation";

/// Aggregate of completed timings for one operation name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationSummary {
    pub operation: String,
    pub count: u64,
    pub total_secs: f64,
    pub max_secs: f64,
}

impl OperationSummary {
    pub fn mean_secs(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_secs / self.count as f64
        }
    }
}

#[derive(Default)]
struct MonitorState {
    open: HashMap<String, Instant>,
    completed: HashMap<String, (u64, Duration, Duration)>,
}

/// Process-wide performance monitor
#[derive(Default)]
pub struct PerformanceMonitor {
    state: Mutex<MonitorState>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        // A panic elsewhere must not disable instrumentation
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a record for `name`, replacing any open record of the same name
    pub fn start(&self, name: &str) {
        self.state().open.insert(name.to_string(), Instant::now());
    }

    /// Close the record for `name` and log its elapsed time
    ///
    /// Returns the elapsed duration, or `None` if no record was open.
    pub fn end(&self, name: &str) -> Option<Duration> {
        let elapsed = {
            let mut state = self.state();
            state.open.remove(name).map(|started| {
                let elapsed = started.elapsed();
                let slot = state
                    .completed
                    .entry(name.to_string())
                    .or_insert((0, Duration::ZERO, Duration::ZERO));
                slot.0 += 1;
                slot.1 += elapsed;
                slot.2 = slot.2.max(elapsed);
                elapsed
            })
        };

        match elapsed {
            Some(elapsed) => {
                let secs = elapsed.as_secs_f64();
                info!(operation = name, elapsed_secs = secs, "{} completed in {:.3}s", name, secs);
            }
            None => warn!(operation = name, "end() called for an operation that was never started"),
        }
        elapsed
    }

    /// Run `fut` inside a `start`/`end` pair; the record is closed whatever the outcome
    pub async fn track<F>(&self, name: &str, fut: F) -> F::Output
    where
        F: Future,
    {
        self.start(name);
        let output = fut.await;
        self.end(name);
        output
    }

    /// Names of the records currently open
    pub fn open_operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state().open.keys().cloned().collect();
        names.sort();
        names
    }

    /// Aggregated completed timings, sorted by operation name
    pub fn summary(&self) -> Vec<OperationSummary> {
        let mut summary: Vec<OperationSummary> = self
            .state()
            .completed
            .iter()
            .map(|(name, (count, total, max))| OperationSummary {
                operation: name.clone(),
                count: *count,
                total_secs: total.as_secs_f64(),
                max_secs: max.as_secs_f64(),
            })
            .collect();
        summary.sort_by(|a, b| a.operation.cmp(&b.operation));
        summary
    }
}
