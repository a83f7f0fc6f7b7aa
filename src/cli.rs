//! CLI argument parsing for taskclock

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for replay reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "taskclock")]
#[command(version)]
#[command(about = "Per-task time attribution for cooperative schedulers", long_about = None)]
pub struct Cli {
    /// Emit diagnostic output (one line per transition) to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a JSON Lines trace and report per-task time
    Replay(ReplayArgs),
    /// Generate a synthetic multi-worker trace
    Simulate(SimulateArgs),
    /// Run a few tasks on real threads with live accounting
    LiveDemo(LiveDemoArgs),
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Trace file, one event per line
    #[arg(value_name = "FILE")]
    pub trace: PathBuf,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Workers to pre-allocate (overrides the config file)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Add the category summary and hotspots to the report
    #[arg(long)]
    pub hotspots: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of tasks to spawn
    #[arg(long, default_value = "8")]
    pub tasks: usize,

    /// Number of workers
    #[arg(long, default_value = "2")]
    pub workers: u32,

    /// RNG seed; the same seed yields the same trace
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Mean nanoseconds between collections (0 disables them)
    #[arg(long = "gc-interval", value_name = "NANOS", default_value = "5000000")]
    pub gc_interval: u64,

    /// Write the trace here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LiveDemoArgs {
    /// Number of demo tasks, each on its own thread
    #[arg(long, default_value = "3")]
    pub tasks: u64,

    /// Scale of every sleep and busy loop in milliseconds
    #[arg(long = "unit-ms", default_value = "5")]
    pub unit_ms: u64,
}
