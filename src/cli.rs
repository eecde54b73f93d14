// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollkeeper")]
#[command(about = "Keep Proxmox containers running their declared image digests")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to rollkeeper.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile all services now and then on every interval until interrupted
    Run,

    /// Reconcile all services once; exits non-zero if any service failed
    Once,

    /// Parse and validate service specs without touching anything
    Validate {
        /// Directory of service specs (defaults to runner.services_path)
        #[arg(short, long)]
        services: Option<PathBuf>,
    },

    /// Show the recorded state of every container
    Status,
}
