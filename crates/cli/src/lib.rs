//! pmcheck CLI -- generate, check, and format persistent-memory traces.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pmcheck_core::{CheckerConfig, CrossTxPolicy};

#[derive(Debug, Parser)]
#[command(
    name = "pmcheck",
    about = "Runtime consistency checking for persistent-memory programs"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate random well-formed traces
    Generate(GenerateArgs),
    /// Replay traces through the checker and report violations
    Check(CheckArgs),
    /// Format compact trace (.trace) files
    Fmt(FmtArgs),
    /// Print the JSON Schema for the trace input format to stdout
    Schema,
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Number of traces to generate
    #[arg(long)]
    pub n_trace: u64,
    /// Number of threads
    #[arg(long)]
    pub n_thread: u64,
    /// Number of transactions per thread
    #[arg(long)]
    pub n_tx: u64,
    /// Number of stores per transaction
    #[arg(long)]
    pub n_op: u64,
    /// Size of the mapped pool, in 64-byte lines
    #[arg(long, default_value_t = 64)]
    pub pool_size: u64,
    /// Output directory for generated trace files
    #[arg(long)]
    pub output_dir: PathBuf,
    /// Write compact .trace files instead of JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Trace files (.json or .trace) or directories containing them
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Only check transactions; stores are not tracked for durability
    #[arg(long)]
    pub transactions_only: bool,
    /// Capacity of each warning register
    #[arg(long, default_value_t = 10_000)]
    pub warning_limit: usize,
    /// Report stores that overwrite bytes not yet flushed
    #[arg(long)]
    pub multiple_stores: bool,
    /// Report flushes that cover no dirty byte
    #[arg(long)]
    pub redundant_flushes: bool,
    /// Policy for regions owned by two live transactions
    #[arg(long, value_enum, default_value_t = CrossTxArg::Report)]
    pub cross_tx: CrossTxArg,
    /// Print every held warning and unflushed store
    #[arg(long)]
    pub verbose: bool,
    /// Output results as JSON (one object per file)
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CrossTxArg {
    Allow,
    Report,
}

#[derive(Debug, Parser)]
pub struct FmtArgs {
    /// Input files or directories to format
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
    /// Check formatting without modifying files (exit 1 if unformatted)
    #[arg(long)]
    pub check: bool,
}

impl From<CrossTxArg> for CrossTxPolicy {
    fn from(arg: CrossTxArg) -> Self {
        match arg {
            CrossTxArg::Allow => Self::Allow,
            CrossTxArg::Report => Self::Report,
        }
    }
}

impl From<&CheckArgs> for CheckerConfig {
    fn from(args: &CheckArgs) -> Self {
        Self::builder()
            .transactions_only(args.transactions_only)
            .warning_limit(args.warning_limit)
            .track_multiple_stores(args.multiple_stores)
            .check_redundant_flushes(args.redundant_flushes)
            .cross_tx_policy(args.cross_tx.into())
            .build()
    }
}
