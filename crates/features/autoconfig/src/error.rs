use pgpack_domain::constants::MIN_RAM_MB;
use std::borrow::Cow;

/// A specialized [`AutoConfigError`] enum of this crate.
#[pgpack_derive::pgpack_error]
pub enum AutoConfigError {
    /// Fatal: the container has less memory than the image supports.
    #[error(
        "FATAL: detected {ram_mb}MB RAM is below the minimum of {}MB REQUIRED{}",
        MIN_RAM_MB,
        format_context(.context)
    )]
    InsufficientMemory { ram_mb: u64, context: Option<Cow<'static, str>> },

    /// Fatal: no superuser password and trust authentication was not requested.
    #[error(
        "FATAL: POSTGRES_PASSWORD is REQUIRED unless POSTGRES_HOST_AUTH_METHOD=trust{}",
        format_context(.context)
    )]
    MissingPassword { context: Option<Cow<'static, str>> },

    #[error("Resource detection failed{}: {message}", format_context(.context))]
    DetectionFailed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Config file I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Internal auto-config error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl AutoConfigError {
    /// Whether the container must refuse to start.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InsufficientMemory { .. } | Self::MissingPassword { .. })
    }
}
