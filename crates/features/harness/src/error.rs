use pgpack_docker::DockerError;
use pgpack_manifest::ManifestError;
use std::borrow::Cow;

/// A specialized [`HarnessError`] enum of this crate.
#[pgpack_derive::pgpack_error]
pub enum HarnessError {
    #[error("{source}{}", format_context(.context))]
    Docker { source: DockerError, context: Option<Cow<'static, str>> },

    #[error("{source}{}", format_context(.context))]
    Manifest { source: ManifestError, context: Option<Cow<'static, str>> },

    /// psql ran and reported an error.
    #[error("psql failed{}: {stderr}", format_context(.context))]
    Psql { stderr: String, context: Option<Cow<'static, str>> },

    #[error("Timed out after {secs}s waiting for {what}{}", format_context(.context))]
    Timeout { what: Cow<'static, str>, secs: u64, context: Option<Cow<'static, str>> },

    /// The container stopped while the harness expected it to serve queries.
    #[error(
        "Container '{name}' exited with code {exit_code}{}; last log lines:\n{logs}",
        format_context(.context)
    )]
    ContainerExited { name: String, exit_code: i32, logs: String, context: Option<Cow<'static, str>> },

    #[error("Fixture I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Fixture discovery error{}: {source}", format_context(.context))]
    Walk { source: walkdir::Error, context: Option<Cow<'static, str>> },

    #[error("Invalid harness input{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
