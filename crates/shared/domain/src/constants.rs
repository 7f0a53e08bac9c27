//! Environment variable names and fixed limits of the packaged image.

/// Manual memory override in MB (`1536`, `2048MB`, `4G`).
pub const ENV_MEMORY: &str = "POSTGRES_MEMORY";
pub const ENV_SKIP_AUTOCONFIG: &str = "POSTGRES_SKIP_AUTOCONFIG";
pub const ENV_SHARED_PRELOAD_LIBRARIES: &str = "POSTGRES_SHARED_PRELOAD_LIBRARIES";
pub const ENV_BIND_IP: &str = "POSTGRES_BIND_IP";
pub const ENV_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_HOST_AUTH_METHOD: &str = "POSTGRES_HOST_AUTH_METHOD";
pub const ENV_DB: &str = "POSTGRES_DB";
pub const ENV_USER: &str = "POSTGRES_USER";

/// Prefix of every auto-configuration log line.
pub const AUTO_CONFIG_TAG: &str = "[AUTO-CONFIG]";

/// Smallest amount of RAM the image supports.
pub const MIN_RAM_MB: u64 = 512;

/// Port PostgreSQL listens on inside the container.
pub const POSTGRES_PORT: u16 = 5432;
