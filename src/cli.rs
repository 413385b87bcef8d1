// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `sluice`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sluice",
    version,
    about = "Dispatch pipeline work from watched files to polling workers.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Sluice.toml` in the current working directory. A missing
    /// default file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Sluice.toml", global = true)]
    pub config: String,

    /// Read pipeline documents from `<DIR>/<name>.json` instead of the store.
    #[arg(long, value_name = "DIR", global = true)]
    pub documents: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SLUICE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Watch the pipeline's directories and record file status until Ctrl-C.
    Watch {
        #[arg(long, short)]
        pipeline: String,
    },

    /// Top up the pipeline's work queue.
    Fill {
        #[arg(long, short)]
        pipeline: String,

        /// Queue budget; defaults to `[dispatch].max_items`.
        #[arg(long)]
        max_items: Option<usize>,

        /// Keep filling every SECS seconds until Ctrl-C.
        #[arg(long, value_name = "SECS")]
        every: Option<u64>,
    },

    /// Claim one queued item as a worker would and print it as JSON.
    Claim {
        #[arg(long, short)]
        pipeline: String,

        /// Worker identity, `container:version:hostname`.
        #[arg(long)]
        key: String,
    },

    /// Store a pipeline document in the namespace.
    Import {
        #[arg(long, short)]
        pipeline: String,

        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },

    /// Print the names of all known pipelines.
    List,

    /// Load a pipeline and print its graph without touching the queue.
    Show {
        #[arg(long, short)]
        pipeline: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
