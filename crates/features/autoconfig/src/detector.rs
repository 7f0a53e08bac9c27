//! Memory and CPU detection.
//!
//! Sources are probed relative to a filesystem root so tests can point the detector
//! at a fake `/sys` and `/proc` tree.

use crate::env::AutoConfigEnv;
use crate::error::AutoConfigError;
use pgpack_domain::autoconfig::{CpuSource, RamSource, Resources};
use pgpack_domain::constants::{AUTO_CONFIG_TAG, ENV_MEMORY};
use std::path::{Path, PathBuf};
use std::thread::available_parallelism;
use tracing::{debug, info, warn};

const CGROUP_V2_MEMORY: &str = "sys/fs/cgroup/memory.max";
const CGROUP_V2_CPU: &str = "sys/fs/cgroup/cpu.max";
const CGROUP_V1_MEMORY: &str = "sys/fs/cgroup/memory/memory.limit_in_bytes";
const MEMINFO: &str = "proc/meminfo";

/// cgroup v1 reports "unlimited" as a page-aligned `i64::MAX`; anything this large is no limit.
const CGROUP_V1_UNLIMITED: u64 = 1 << 60;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Largest accepted `POSTGRES_MEMORY` (64 TiB). Bigger values are treated as typos.
pub const MAX_MEMORY_OVERRIDE_MB: u64 = 64 * 1024 * 1024;

/// Resolves RAM and CPU figures in precedence order.
#[derive(Debug, Clone)]
pub struct Detector {
    root: PathBuf,
    host_cpus: Option<u32>,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Detector {
    /// Creates a detector probing `sys/...` and `proc/...` below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), host_cpus: None }
    }

    /// Pins the host CPU count instead of asking the OS.
    #[must_use]
    pub const fn with_host_cpus(mut self, cpus: u32) -> Self {
        self.host_cpus = Some(cpus);
        self
    }

    /// Detects RAM (manual > cgroup v2 > cgroup v1 > host) and CPU cores
    /// (cgroup v2 quota > host), logging each choice.
    ///
    /// # Errors
    /// Returns [`AutoConfigError::DetectionFailed`] when no memory source yields a value.
    pub fn detect(&self, env: &AutoConfigEnv) -> Result<Resources, AutoConfigError> {
        let (ram_mb, ram_source) = self.detect_ram(env.memory.as_deref())?;
        info!("{AUTO_CONFIG_TAG} RAM: {ram_mb}MB ({ram_source})");

        let (cpu_cores, cpu_source) = self.detect_cpu();
        info!("{AUTO_CONFIG_TAG} CPU: {cpu_cores} cores ({cpu_source})");

        Ok(Resources { ram_mb, ram_source, cpu_cores, cpu_source })
    }

    fn detect_ram(&self, manual: Option<&str>) -> Result<(u64, RamSource), AutoConfigError> {
        if let Some(raw) = manual {
            match parse_memory_override(raw) {
                Some(mb) => return Ok((mb, RamSource::Manual)),
                None => warn!(
                    "{AUTO_CONFIG_TAG} Invalid {ENV_MEMORY} value '{raw}' (expected MB, e.g. 2048), falling back to detection"
                ),
            }
        }

        if let Some(mb) = self.cgroup_v2_ram() {
            return Ok((mb, RamSource::CgroupV2));
        }

        let host = self.host_ram();
        if let Some(mb) = self.cgroup_v1_ram(host) {
            return Ok((mb, RamSource::CgroupV1));
        }

        host.map(|mb| (mb, RamSource::Host)).ok_or_else(|| AutoConfigError::DetectionFailed {
            message: "no cgroup limit and no readable /proc/meminfo".into(),
            context: Some(format!("probing below {}", self.root.display()).into()),
        })
    }

    fn cgroup_v2_ram(&self) -> Option<u64> {
        let raw = self.read(CGROUP_V2_MEMORY)?;
        if raw == "max" {
            debug!("cgroup v2 memory limit is unlimited");
            return None;
        }
        parse_bytes(&raw, CGROUP_V2_MEMORY).map(|bytes| bytes / BYTES_PER_MB)
    }

    fn cgroup_v1_ram(&self, host_mb: Option<u64>) -> Option<u64> {
        let raw = self.read(CGROUP_V1_MEMORY)?;
        let bytes = parse_bytes(&raw, CGROUP_V1_MEMORY)?;
        let mb = bytes / BYTES_PER_MB;
        if bytes >= CGROUP_V1_UNLIMITED || host_mb.is_some_and(|host| mb >= host) {
            debug!("cgroup v1 memory limit is unlimited");
            return None;
        }
        Some(mb)
    }

    fn host_ram(&self) -> Option<u64> {
        let meminfo = self.read(MEMINFO)?;
        meminfo
            .lines()
            .find_map(|line| line.strip_prefix("MemTotal:"))
            .and_then(|rest| rest.trim().trim_end_matches("kB").trim().parse::<u64>().ok())
            .map(|kb| kb / 1024)
    }

    fn detect_cpu(&self) -> (u32, CpuSource) {
        if let Some(cores) = self.read(CGROUP_V2_CPU).and_then(|raw| parse_cpu_max(&raw)) {
            return (cores, CpuSource::CgroupV2);
        }
        let host = self.host_cpus.unwrap_or_else(|| {
            available_parallelism()
                .ok()
                .and_then(|n| u32::try_from(n.get()).ok())
                .unwrap_or(1)
        });
        (host.max(1), CpuSource::Host)
    }

    fn read(&self, relative: &str) -> Option<String> {
        let path = self.root.join(relative);
        read_trimmed(&path)
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content.trim().to_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Unreadable resource probe");
            None
        },
    }
}

fn parse_bytes(raw: &str, probe: &str) -> Option<u64> {
    raw.parse::<u64>()
        .inspect_err(|e| warn!(probe, value = raw, error = %e, "Unparseable memory limit"))
        .ok()
}

/// Parses a `POSTGRES_MEMORY` value into MB.
///
/// Accepts plain MB (`1536`), MB suffixes (`1536MB`, `1536m`) and GB suffixes (`4G`, `4gb`).
/// Zero, non-numeric values and anything above [`MAX_MEMORY_OVERRIDE_MB`] are rejected.
#[must_use]
pub fn parse_memory_override(raw: &str) -> Option<u64> {
    let lower = raw.trim().to_ascii_lowercase();
    let (digits, multiplier) = if let Some(n) = lower.strip_suffix("gb").or_else(|| lower.strip_suffix('g')) {
        (n, 1024)
    } else if let Some(n) = lower.strip_suffix("mb").or_else(|| lower.strip_suffix('m')) {
        (n, 1)
    } else {
        (lower.as_str(), 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|&n| n > 0)
        .and_then(|n| n.checked_mul(multiplier))
        .filter(|&mb| mb <= MAX_MEMORY_OVERRIDE_MB)
}

/// Parses cgroup v2 `cpu.max` (`"<quota> <period>"`), rounding partial cores up.
fn parse_cpu_max(raw: &str) -> Option<u32> {
    let mut parts = raw.split_whitespace();
    let quota = parts.next()?;
    if quota == "max" {
        return None;
    }
    let quota = quota.parse::<u64>().ok()?;
    let period = parts.next().map_or(Some(100_000), |p| p.parse::<u64>().ok())?;
    if period == 0 {
        return None;
    }
    u32::try_from(quota.div_ceil(period).max(1)).ok()
}
