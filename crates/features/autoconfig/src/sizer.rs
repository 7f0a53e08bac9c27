//! Tiered mapping from detected resources to PostgreSQL tuning values.

use crate::error::AutoConfigError;
use pgpack_domain::autoconfig::Tuning;
use pgpack_domain::constants::MIN_RAM_MB;

const SHARED_BUFFERS_FLOOR_MB: u64 = 128;
const SHARED_BUFFERS_CAP_MB: u64 = 32 * 1024;
const MAINTENANCE_WORK_MEM_MIN_MB: u64 = 32;
const MAINTENANCE_WORK_MEM_MAX_MB: u64 = 2048;
const MAX_WORKER_PROCESSES_CAP: u32 = 64;
const MIN_WORKER_PROCESSES: u32 = 4;

/// Share of RAM given to `shared_buffers`, shrinking as memory grows.
#[must_use]
pub const fn shared_buffers_percent(ram_mb: u64) -> u64 {
    match ram_mb {
        0..=8192 => 25,
        8193..=32768 => 20,
        _ => 15,
    }
}

/// Connection ceiling per memory tier.
#[must_use]
pub const fn max_connections(ram_mb: u64) -> u32 {
    match ram_mb {
        0..1024 => 80,
        1024..4096 => 120,
        _ => 200,
    }
}

/// Derives the tuning for `ram_mb` of memory and `cpu_cores` cores.
///
/// # Errors
/// Returns [`AutoConfigError::InsufficientMemory`] below the supported minimum.
pub fn size(ram_mb: u64, cpu_cores: u32) -> Result<Tuning, AutoConfigError> {
    if ram_mb < MIN_RAM_MB {
        return Err(AutoConfigError::InsufficientMemory { ram_mb, context: None });
    }
    let cores = cpu_cores.max(1);

    let shared_buffers_mb = fraction(ram_mb, shared_buffers_percent(ram_mb), 100)
        .clamp(SHARED_BUFFERS_FLOOR_MB, SHARED_BUFFERS_CAP_MB);
    let max_connections = max_connections(ram_mb);
    let work_mem_mb =
        (ram_mb.saturating_sub(shared_buffers_mb) / (u64::from(max_connections) * 3)).max(1);

    let max_worker_processes =
        cores.saturating_mul(2).clamp(MIN_WORKER_PROCESSES, MAX_WORKER_PROCESSES_CAP);

    Ok(Tuning {
        shared_buffers_mb,
        max_connections,
        work_mem_mb,
        maintenance_work_mem_mb: (ram_mb / 16)
            .clamp(MAINTENANCE_WORK_MEM_MIN_MB, MAINTENANCE_WORK_MEM_MAX_MB),
        effective_cache_size_mb: fraction(ram_mb, 3, 4),
        max_worker_processes,
        max_parallel_workers: cores.min(max_worker_processes),
        max_parallel_workers_per_gather: (cores / 2).max(1),
    })
}

/// `floor(value * num / den)` without overflowing for any `value`.
const fn fraction(value: u64, num: u64, den: u64) -> u64 {
    value / den * num + value % den * num / den
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn literal_tiers() {
        let cases = [
            (512, 128, 80),
            (1536, 384, 120),
            (2048, 512, 120),
            (4096, 1024, 200),
            (8192, 2048, 200),
            (16384, 3276, 200),
            (65536, 9830, 200),
        ];
        for (ram, shared_buffers, connections) in cases {
            let t = size(ram, 4).unwrap();
            assert_eq!(t.shared_buffers_mb, shared_buffers, "shared_buffers at {ram}MB");
            assert_eq!(t.max_connections, connections, "max_connections at {ram}MB");
        }
    }

    #[test]
    fn work_mem_tracks_headroom() {
        assert_eq!(size(4096, 2).unwrap().work_mem_mb, 5);
        assert_eq!(size(8192, 2).unwrap().work_mem_mb, 10);
        let sixteen = size(16384, 2).unwrap().work_mem_mb;
        assert!((16..=24).contains(&sixteen), "work_mem {sixteen}");
    }

    #[test]
    fn below_minimum_is_fatal() {
        let err = size(256, 2).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            err.to_string(),
            "FATAL: detected 256MB RAM is below the minimum of 512MB REQUIRED"
        );
    }

    #[test]
    fn workers_scale_with_cores() {
        let t = size(4096, 2).unwrap();
        assert_eq!(t.max_worker_processes, 4);
        assert_eq!(t.max_parallel_workers, 2);
        assert_eq!(t.max_parallel_workers_per_gather, 1);

        let t = size(4096, 16).unwrap();
        assert_eq!(t.max_worker_processes, 32);
        assert_eq!(t.max_parallel_workers, 16);
        assert_eq!(t.max_parallel_workers_per_gather, 8);

        let t = size(4096, 200).unwrap();
        assert_eq!(t.max_worker_processes, 64);
        assert_eq!(t.max_parallel_workers, 64);
    }

    #[test]
    fn zero_cores_counts_as_one() {
        assert_eq!(size(2048, 0).unwrap(), size(2048, 1).unwrap());
    }

    #[test]
    fn huge_memory_does_not_overflow() {
        let t = size(u64::MAX, 8).unwrap();
        assert_eq!(t.shared_buffers_mb, 32768);
        assert_eq!(t.maintenance_work_mem_mb, 2048);
        assert_eq!(t.effective_cache_size_mb, u64::MAX / 4 * 3 + 2);
    }

    #[test]
    fn fraction_matches_plain_arithmetic() {
        for value in [0, 1, 99, 512, 1536, 16384, 65536, 1_000_003] {
            assert_eq!(fraction(value, 25, 100), value * 25 / 100);
            assert_eq!(fraction(value, 3, 4), value * 3 / 4);
        }
    }

    #[test]
    fn shared_buffers_is_capped() {
        assert_eq!(size(1024 * 1024, 64).unwrap().shared_buffers_mb, 32768);
    }

    proptest! {
        #[test]
        fn sub_minimum_always_fails(ram in 0u64..512, cores in 0u32..128) {
            prop_assert!(size(ram, cores).is_err());
        }

        #[test]
        fn shared_buffers_never_exceed_ram(ram in 512u64..4_000_000, cores in 1u32..256) {
            let t = size(ram, cores).unwrap();
            prop_assert!(t.shared_buffers_mb <= ram);
            prop_assert!(t.effective_cache_size_mb <= ram);
            prop_assert!(t.work_mem_mb >= 1);
            prop_assert!(t.max_parallel_workers <= t.max_worker_processes);
        }

        #[test]
        fn tiers_are_monotonic(a in 512u64..4_000_000, b in 512u64..4_000_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(shared_buffers_percent(lo) >= shared_buffers_percent(hi));
            prop_assert!(max_connections(lo) <= max_connections(hi));
            prop_assert!(max_connections(hi) <= 200);
        }
    }
}
