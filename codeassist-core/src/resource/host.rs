//! Host CPU and RAM usage, reported next to the accelerator

use serde::{Deserialize, Serialize};
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Whole-host load at the time of sampling
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HostStats {
    pub cpu_percent: f32,
    pub ram_percent: f64,
    pub ram_used_mb: f64,
    pub ram_total_mb: f64,
}

impl HostStats {
    /// Sample CPU and memory usage
    ///
    /// Blocks for sysinfo's minimum CPU update interval, since usage is the
    /// difference between two readings.
    pub fn sample() -> Self {
        let mut system = System::new();
        system.refresh_memory();
        system.refresh_cpu_usage();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();

        Self::from_readings(
            system.global_cpu_usage(),
            system.used_memory(),
            system.total_memory(),
        )
    }

    pub(crate) fn from_readings(cpu_percent: f32, used_bytes: u64, total_bytes: u64) -> Self {
        let ram_percent = if total_bytes == 0 {
            0.0
        } else {
            used_bytes as f64 / total_bytes as f64 * 100.0
        };

        Self {
            cpu_percent,
            ram_percent,
            ram_used_mb: used_bytes as f64 / 1024.0 / 1024.0,
            ram_total_mb: total_bytes as f64 / 1024.0 / 1024.0,
        }
    }
}
