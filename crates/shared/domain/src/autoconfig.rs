use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the detected RAM figure came from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RamSource {
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "cgroup-v2")]
    CgroupV2,
    #[serde(rename = "cgroup-v1")]
    CgroupV1,
    /// Host memory from `/proc/meminfo`; keeps the historical `nproc` label.
    #[serde(rename = "nproc")]
    Host,
}

impl RamSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::CgroupV2 => "cgroup-v2",
            Self::CgroupV1 => "cgroup-v1",
            Self::Host => "nproc",
        }
    }
}

impl fmt::Display for RamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the detected CPU count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpuSource {
    #[serde(rename = "cgroup-v2")]
    CgroupV2,
    #[serde(rename = "nproc")]
    Host,
}

impl fmt::Display for CpuSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CgroupV2 => "cgroup-v2",
            Self::Host => "nproc",
        })
    }
}

/// Detected resources of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub ram_mb: u64,
    pub ram_source: RamSource,
    pub cpu_cores: u32,
    pub cpu_source: CpuSource,
}

/// PostgreSQL tuning values derived from [`Resources`]. Sizes are in MB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tuning {
    pub shared_buffers_mb: u64,
    pub max_connections: u32,
    pub work_mem_mb: u64,
    pub maintenance_work_mem_mb: u64,
    pub effective_cache_size_mb: u64,
    pub max_worker_processes: u32,
    pub max_parallel_workers: u32,
    pub max_parallel_workers_per_gather: u32,
}

impl Tuning {
    /// Settings as `postgresql.conf` key/value pairs, in a stable order.
    #[must_use]
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        vec![
            ("shared_buffers", format!("{}MB", self.shared_buffers_mb)),
            ("max_connections", self.max_connections.to_string()),
            ("work_mem", format!("{}MB", self.work_mem_mb)),
            ("maintenance_work_mem", format!("{}MB", self.maintenance_work_mem_mb)),
            ("effective_cache_size", format!("{}MB", self.effective_cache_size_mb)),
            ("max_worker_processes", self.max_worker_processes.to_string()),
            ("max_parallel_workers", self.max_parallel_workers.to_string()),
            ("max_parallel_workers_per_gather", self.max_parallel_workers_per_gather.to_string()),
        ]
    }
}

/// The outcome of one auto-configuration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoConfigDecision {
    pub resources: Resources,
    pub tuning: Tuning,
}
