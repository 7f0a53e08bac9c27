//! # CLI Argument Definitions
//!
//! The `pgpack` command line, declared with `clap` derive. `autoconfig` runs inside the
//! image entrypoint; `manifest` and `test` run on the build host.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "pgpack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
#[command(about = "PostgreSQL image tooling: auto-configuration, extension manifest and container tests")]
pub struct Cli {
    /// Harness configuration file (defaults to ./pgpack.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Also write rolling log files into this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Size the server to its container and write the managed postgresql.conf block
    Autoconfig(AutoconfigArgs),
    /// Inspect the extension manifest
    Manifest {
        /// Manifest file (defaults to `manifest.path` from the harness config)
        #[arg(long, global = true, value_name = "PATH")]
        manifest: Option<PathBuf>,

        #[command(subcommand)]
        action: ManifestAction,
    },
    /// Run a container test suite
    Test {
        #[command(subcommand)]
        suite: TestSuite,
    },
}

#[derive(Debug, Args)]
pub struct AutoconfigArgs {
    /// Data directory holding postgresql.conf (falls back to $PGDATA)
    #[arg(long, value_name = "DIR")]
    pub pgdata: Option<PathBuf>,

    /// Config file receiving the managed block (defaults to <pgdata>/postgresql.conf)
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Extension manifest providing the default shared_preload_libraries
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Where the computed settings go
    #[arg(long, value_enum, default_value_t = Emit::File)]
    pub emit: Emit,

    /// Filesystem root for the cgroup and procfs probes
    #[arg(long, value_name = "DIR", default_value = "/")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Emit {
    /// Rewrite the managed block of the config file
    File,
    /// Print `-c key=value` server arguments, one per line
    Args,
    /// Print the detected resources and tuning as JSON
    Json,
}

#[derive(Debug, Subcommand)]
pub enum ManifestAction {
    /// Print enabled entries in dependency order, one per line
    Order {},
    /// Print every entry with its kind, category, status and source pin
    List {},
    /// Print the comma separated shared_preload_libraries value
    Preload {},
    /// Validate entries and dependencies
    Validate {},
}

#[derive(Debug, Subcommand)]
pub enum TestSuite {
    /// Memory and CPU sizing scenarios, one container each
    #[command(name = "auto-config")]
    AutoConfig {
        #[command(flatten)]
        image: ImageArgs,

        /// Run a single scenario by name
        #[arg(long, value_name = "SCENARIO")]
        only: Option<String>,
    },
    /// CREATE EXTENSION for every manifest entry in dependency order
    Extensions {
        #[command(flatten)]
        image: ImageArgs,

        /// Reuse a running container instead of starting one
        #[arg(long, value_name = "NAME", conflicts_with_all = ["tag", "image"])]
        container: Option<String>,

        /// Manifest file (defaults to `manifest.path` from the harness config)
        #[arg(long, value_name = "PATH")]
        manifest: Option<PathBuf>,
    },
    /// Expected-output SQL fixtures
    Regress {
        #[command(flatten)]
        image: ImageArgs,

        /// Reuse a running container instead of starting one
        #[arg(long, value_name = "NAME", conflicts_with_all = ["tag", "image"])]
        container: Option<String>,

        /// Directory holding sql/ and expected/
        #[arg(long, value_name = "DIR")]
        fixtures: PathBuf,
    },
}

/// The image under test, positional or `--image=<tag>`.
#[derive(Debug, Args)]
pub struct ImageArgs {
    /// Image tag to test
    #[arg(value_name = "IMAGE")]
    pub tag: Option<String>,

    #[arg(long = "image", value_name = "TAG", conflicts_with = "tag")]
    pub image: Option<String>,
}

impl ImageArgs {
    #[must_use]
    pub fn resolve(&self) -> Option<&str> {
        self.tag.as_deref().or(self.image.as_deref())
    }
}
