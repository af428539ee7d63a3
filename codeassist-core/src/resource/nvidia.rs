//! NVIDIA accelerator backend driven through `nvidia-smi`

use super::{Accelerator, DeviceSample, MemoryInfo};
use crate::error::{AssistError, Result};
use std::process::Command;
use tracing::{debug, info};

const QUERY_FIELDS: &str = "name,memory.used,memory.total,utilization.gpu";

/// One row of `nvidia-smi --query-gpu` output
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GpuRow {
    pub name: String,
    pub memory: MemoryInfo,
    pub utilization: f64,
}

/// Accelerator backed by the `nvidia-smi` tool
///
/// The tool can only observe the device, so `release_unused` is a logged
/// no-op; in-process allocators release their own caches.
#[derive(Debug, Clone)]
pub struct NvidiaSmi {
    binary: String,
    device_index: u32,
    available: bool,
    runtime_version: Option<String>,
}

impl NvidiaSmi {
    /// Look for a device at `device_index`; availability is fixed at detection time
    pub fn detect(device_index: u32) -> Self {
        Self::with_binary("nvidia-smi", device_index)
    }

    pub fn with_binary(binary: impl Into<String>, device_index: u32) -> Self {
        let mut smi = Self {
            binary: binary.into(),
            device_index,
            available: false,
            runtime_version: None,
        };

        match smi.run(&[]) {
            Ok(banner) => {
                smi.runtime_version = parse_cuda_version(&banner);
                smi.available = smi.query().is_ok();
            }
            Err(e) => debug!(error = %e, "nvidia-smi not usable"),
        }

        info!(
            available = smi.available,
            device_index,
            runtime_version = smi.runtime_version.as_deref().unwrap_or("unknown"),
            "Detected NVIDIA accelerator"
        );
        smi
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.binary).args(args).output().map_err(|e| {
            AssistError::ResourceQueryFailure(format!("failed to run {}: {e}", self.binary))
        })?;

        if !output.status.success() {
            return Err(AssistError::ResourceQueryFailure(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn query(&self) -> Result<GpuRow> {
        let index = self.device_index.to_string();
        let stdout = self.run(&[
            &format!("--query-gpu={QUERY_FIELDS}"),
            "--format=csv,noheader,nounits",
            "-i",
            &index,
        ])?;
        parse_query_row(&stdout)
    }
}

impl Accelerator for NvidiaSmi {
    fn backend(&self) -> &'static str {
        "nvidia"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn device_name(&self) -> Result<String> {
        self.query().map(|row| row.name)
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        self.query().map(|row| row.memory)
    }

    fn utilization(&self) -> Result<f64> {
        self.query().map(|row| row.utilization)
    }

    fn runtime_version(&self) -> Option<String> {
        self.runtime_version.clone()
    }

    fn sample(&self) -> DeviceSample {
        match self.query() {
            Ok(row) => DeviceSample {
                name: Ok(row.name),
                memory: Ok(row.memory),
                utilization: Ok(row.utilization),
            },
            Err(e) => DeviceSample {
                name: Err(e.clone()),
                memory: Err(e.clone()),
                utilization: Err(e),
            },
        }
    }

    fn release_unused(&self) -> Result<()> {
        debug!(
            device_index = self.device_index,
            "Memory release requested (advisory for nvidia-smi)"
        );
        Ok(())
    }
}

pub(crate) fn parse_query_row(stdout: &str) -> Result<GpuRow> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| AssistError::ResourceQueryFailure("empty nvidia-smi output".to_string()))?;

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, used, total, util] = fields.as_slice() else {
        return Err(AssistError::ResourceQueryFailure(format!(
            "unexpected nvidia-smi row: {line}"
        )));
    };

    let number = |field: &str, what: &str| {
        field.parse::<f64>().map_err(|_| {
            AssistError::ResourceQueryFailure(format!("unparseable {what}: {field:?}"))
        })
    };

    Ok(GpuRow {
        name: name.to_string(),
        memory: MemoryInfo {
            used_mb: number(*used, "memory.used")?,
            total_mb: number(*total, "memory.total")?,
        },
        utilization: number(*util, "utilization.gpu")?,
    })
}

pub(crate) fn parse_cuda_version(banner: &str) -> Option<String> {
    let rest = banner.split("CUDA Version:").nth(1)?;
    rest.split_whitespace()
        .next()
        .map(|v| v.trim_end_matches('|').to_string())
        .filter(|v| !v.is_empty())
}
