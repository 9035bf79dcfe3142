//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Drive the fuzzing-platform control panel from the command line.
#[derive(Debug, Parser)]
#[command(name = "fuzzctl", version, about, long_about = None)]
pub struct Cli {
    /// API base URL. Overrides `FUZZCTL_API_URL`.
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Per-request timeout in seconds. Overrides `FUZZCTL_TIMEOUT_SECS`.
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Login name. Falls back to `FUZZCTL_USERNAME`.
    #[arg(long, global = true)]
    pub username: Option<String>,

    /// Login password. Falls back to `FUZZCTL_PASSWORD`.
    #[arg(long, global = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check a resource selection against pool limits, offline
    Check {
        #[command(flatten)]
        resources: ResourceArgs,
        /// Pool RAM total in MiB; defaults apply when omitted
        #[arg(long)]
        ram_total: Option<u32>,
        /// Per-fuzzer RAM maximum in MiB
        #[arg(long)]
        fuzzer_max_ram: Option<u32>,
        /// Pool CPU total in mcpu
        #[arg(long)]
        cpu_total: Option<u32>,
    },
    /// Show the resource limits of the current project
    Limits,
    /// List images usable with an engine
    Images {
        #[arg(long)]
        engine: String,
    },
    /// Create a fuzzer together with its first version
    CreateFuzzer {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        lang: String,
        #[arg(long)]
        engine: String,
        #[arg(long)]
        image: String,
        #[command(flatten)]
        resources: ResourceArgs,
        #[command(flatten)]
        files: FileArgs,
    },
    /// Add a version to an existing fuzzer
    CreateVersion {
        #[arg(long)]
        fuzzer: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        image: String,
        #[command(flatten)]
        resources: ResourceArgs,
        #[command(flatten)]
        files: FileArgs,
    },
    /// Change a version's name, description, resources or archives
    ModifyVersion {
        #[arg(long)]
        fuzzer: String,
        #[arg(long)]
        revision: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        cpu: Option<u32>,
        #[arg(long)]
        ram: Option<u32>,
        #[arg(long)]
        tmpfs: Option<u32>,
        #[command(flatten)]
        files: FileArgs,
    },
}

/// CPU, RAM and tmpfs selection.
#[derive(Debug, Clone, Copy, Args)]
pub struct ResourceArgs {
    /// CPU usage in mcpu
    #[arg(long, default_value_t = 1000)]
    pub cpu: u32,
    /// RAM usage in MiB
    #[arg(long, default_value_t = 1000)]
    pub ram: u32,
    /// Tmpfs size in MiB
    #[arg(long, default_value_t = 200)]
    pub tmpfs: u32,
}

/// Archives to upload into a version.
#[derive(Debug, Clone, Default, Args)]
pub struct FileArgs {
    #[arg(long, value_name = "PATH")]
    pub binaries: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    pub seeds: Option<PathBuf>,
}
