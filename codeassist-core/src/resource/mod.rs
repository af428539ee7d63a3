//! Accelerator query/control and the stateless resource manager around it
//!
//! Diagnostics never fail the caller: query errors are folded into
//! [`DeviceReport::Partial`] or [`DeviceReport::Unavailable`] and logged.
//! Releasing unused memory is advisory and idempotent.

pub mod host;
pub mod manager;
pub mod nvidia;

use crate::error::Result;

pub use host::HostStats;
pub use manager::{DeviceInfo, DeviceReport, ResourceManager, SystemReport};
pub use nvidia::NvidiaSmi;

/// Memory figures reported by an accelerator, in megabytes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryInfo {
    pub used_mb: f64,
    pub total_mb: f64,
}

/// One reading of every accelerator query, each with its own outcome
#[derive(Debug, Clone)]
pub struct DeviceSample {
    pub name: Result<String>,
    pub memory: Result<MemoryInfo>,
    pub utilization: Result<f64>,
}

/// Query/control interface of the shared accelerator device
///
/// Queries may block (external tools, driver calls); callers on an async
/// runtime go through [`ResourceManager::system_report`].
pub trait Accelerator: Send + Sync {
    /// Short backend identifier for logs and reports
    fn backend(&self) -> &'static str;

    /// Check if an accelerator is present
    fn is_available(&self) -> bool;

    /// Get device name
    fn device_name(&self) -> Result<String>;

    /// Current memory usage
    fn memory_info(&self) -> Result<MemoryInfo>;

    /// Utilization in percent (0.0 - 100.0)
    fn utilization(&self) -> Result<f64>;

    /// Driver/runtime version string, if the backend knows one
    fn runtime_version(&self) -> Option<String> {
        None
    }

    /// Read name, memory and utilization together
    ///
    /// Backends that pay per query override this to read the device once.
    fn sample(&self) -> DeviceSample {
        DeviceSample {
            name: self.device_name(),
            memory: self.memory_info(),
            utilization: self.utilization(),
        }
    }

    /// Free cached allocations that nothing references any more
    fn release_unused(&self) -> Result<()>;
}

/// CPU-only host: no accelerator present
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccelerator;

impl Accelerator for NoAccelerator {
    fn backend(&self) -> &'static str {
        "cpu"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn device_name(&self) -> Result<String> {
        Ok("CPU".to_string())
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        Err(crate::error::AssistError::ResourceQueryFailure(
            "no accelerator present".to_string(),
        ))
    }

    fn utilization(&self) -> Result<f64> {
        Err(crate::error::AssistError::ResourceQueryFailure(
            "no accelerator present".to_string(),
        ))
    }

    fn release_unused(&self) -> Result<()> {
        Ok(())
    }
}
