//! Stateless façade over an [`Accelerator`]

use super::{Accelerator, DeviceSample, HostStats, NoAccelerator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Best-effort snapshot of the accelerator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceInfo {
    pub backend: String,
    pub name: Option<String>,
    pub memory_used_mb: Option<f64>,
    pub memory_total_mb: Option<f64>,
    pub utilization_percent: Option<f64>,
    pub runtime_version: Option<String>,
}

/// Outcome of a device query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceReport {
    /// Every field was read
    Full { info: DeviceInfo },
    /// Some queries failed; `failures` says which
    Partial { info: DeviceInfo, failures: Vec<String> },
    /// No accelerator present, or nothing could be read
    Unavailable,
}

impl DeviceReport {
    pub fn info(&self) -> Option<&DeviceInfo> {
        match self {
            DeviceReport::Full { info } | DeviceReport::Partial { info, .. } => Some(info),
            DeviceReport::Unavailable => None,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, DeviceReport::Full { .. })
    }
}

/// Host load plus accelerator status, as shown by the device diagnostics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemReport {
    /// `None` only when sampling could not run at all
    pub host: Option<HostStats>,
    pub accelerator: DeviceReport,
}

/// Resource manager shared by every session
///
/// Holds no state of its own. Invocation policy (release before building the
/// handles, around generation, before a refresh) belongs to the callers.
///
/// Release only frees memory when the backend owns an in-process allocator.
/// Backends that merely observe the device (such as [`NvidiaSmi`]) accept
/// the call and log it, so the lifecycle calls are a no-op there.
///
/// [`NvidiaSmi`]: super::NvidiaSmi
#[derive(Clone)]
pub struct ResourceManager {
    accelerator: Arc<dyn Accelerator>,
}

impl ResourceManager {
    pub fn new(accelerator: Arc<dyn Accelerator>) -> Self {
        Self { accelerator }
    }

    /// Manager for a host without an accelerator
    pub fn cpu_only() -> Self {
        Self::new(Arc::new(NoAccelerator))
    }

    pub fn is_available(&self) -> bool {
        self.accelerator.is_available()
    }

    /// Query the device; never fails, but blocks while the backend is read
    pub fn device_info(&self) -> DeviceReport {
        if !self.accelerator.is_available() {
            return DeviceReport::Unavailable;
        }

        let mut info = DeviceInfo {
            backend: self.accelerator.backend().to_string(),
            runtime_version: self.accelerator.runtime_version(),
            ..Default::default()
        };
        let mut failures = Vec::new();

        let DeviceSample {
            name,
            memory,
            utilization,
        } = self.accelerator.sample();

        match name {
            Ok(name) => info.name = Some(name),
            Err(e) => failures.push(format!("device name: {e}")),
        }
        match memory {
            Ok(memory) => {
                info.memory_used_mb = Some(memory.used_mb);
                info.memory_total_mb = Some(memory.total_mb);
            }
            Err(e) => failures.push(format!("memory: {e}")),
        }
        match utilization {
            Ok(util) => info.utilization_percent = Some(util),
            Err(e) => failures.push(format!("utilization: {e}")),
        }

        if failures.is_empty() {
            return DeviceReport::Full { info };
        }

        for failure in &failures {
            warn!(
                backend = self.accelerator.backend(),
                "Error getting accelerator stats: {}", failure
            );
        }

        if failures.len() == 3 {
            DeviceReport::Unavailable
        } else {
            DeviceReport::Partial { info, failures }
        }
    }

    /// Host and accelerator diagnostics, sampled off the async workers
    pub async fn system_report(&self) -> SystemReport {
        let manager = self.clone();
        match tokio::task::spawn_blocking(move || manager.sample_system()).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "System sampling did not complete");
                SystemReport {
                    host: None,
                    accelerator: DeviceReport::Unavailable,
                }
            }
        }
    }

    /// Blocking form of [`system_report`](Self::system_report)
    pub fn sample_system(&self) -> SystemReport {
        SystemReport {
            host: Some(HostStats::sample()),
            accelerator: self.device_info(),
        }
    }

    /// Ask the accelerator to free unreferenced memory; advisory and idempotent
    pub fn release_unused(&self) {
        if !self.accelerator.is_available() {
            debug!("No accelerator present, skipping memory release");
            return;
        }

        let backend = self.accelerator.backend();
        match self.accelerator.release_unused() {
            Ok(()) => debug!(backend, "Released unused accelerator memory"),
            Err(e) => warn!(backend, error = %e, "Failed to release accelerator memory"),
        }
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::cpu_only()
    }
}
