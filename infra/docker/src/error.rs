use std::borrow::Cow;

/// A specialized [`DockerError`] enum of this crate.
#[pgpack_derive::pgpack_error]
pub enum DockerError {
    /// The CLI could not be spawned or its pipes failed.
    #[error("Failed to run docker{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    /// The CLI ran and exited unsuccessfully.
    #[error("`{command}` failed with {status}{}: {stderr}", format_context(.context))]
    Command {
        command: String,
        status: String,
        stderr: String,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unexpected docker output{}: {message}", format_context(.context))]
    Parse { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Container '{name}' is not running{}", format_context(.context))]
    NotRunning { name: String, context: Option<Cow<'static, str>> },
}
