pub mod budget;
pub mod close;
pub mod gates;
pub mod parse;
pub mod progress;
pub mod schema;
pub mod velocity;

use clap::{Parser, Subcommand};
use epicflow::hierarchy::Level;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "epicflow")]
#[command(
    author,
    version,
    about = "Control plane for Epic → Roadmap → Phase → Task delegation"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Roll up completion for an epic, roadmap or phase
    Progress(ProgressArgs),

    /// Estimate completion rate from recorded progress samples
    Velocity(VelocityArgs),

    /// Run quality gates for a roadmap
    Gates(GatesArgs),

    /// Parse executor output into a delegation message
    Parse(ParseArgs),

    /// Manage the token budget ledger
    Budget(BudgetArgs),

    /// Close the tracker issue of a fully completed epic or roadmap
    Close(CloseArgs),

    /// Print JSON Schema for config validation
    Schema,
}

#[derive(Parser, Clone)]
pub struct ProgressArgs {
    /// EPIC.json, ROADMAP.json, PROGRESS.json, or a directory holding one
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Skip detection and aggregate at this level (epic, roadmap, phase)
    #[arg(long)]
    pub level: Option<Level>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Append the completion to this history file for `velocity`
    #[arg(long, value_name = "HISTORY")]
    pub record: Option<PathBuf>,
}

#[derive(Parser, Clone)]
pub struct VelocityArgs {
    /// JSON array of {timestamp, completion} samples
    #[arg(value_name = "HISTORY")]
    pub history: PathBuf,

    /// Print the estimate as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct GatesArgs {
    /// Roadmap directory or ROADMAP.json
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Path to config file
    #[arg(short, long, default_value = "epicflow.yaml")]
    pub config: PathBuf,

    /// Require the test gate regardless of config
    #[arg(long)]
    pub tests: bool,

    /// Require the docs gate regardless of config
    #[arg(long)]
    pub docs: bool,

    /// Override failing gates with this reason (critical gates stay failing)
    #[arg(long = "override", value_name = "REASON")]
    pub override_reason: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Clone)]
pub struct ParseArgs {
    /// File holding executor output (stdin when omitted)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Re-emit the parsed message in its wire form instead of JSON
    #[arg(long)]
    pub wire: bool,
}

#[derive(Parser, Clone)]
pub struct BudgetArgs {
    /// Path to config file
    #[arg(short, long, default_value = "epicflow.yaml")]
    pub config: PathBuf,

    /// Ledger file (default: budget.state_file from config)
    #[arg(long)]
    pub ledger: Option<PathBuf>,

    #[command(subcommand)]
    pub action: BudgetCommand,
}

#[derive(Subcommand, Clone)]
pub enum BudgetCommand {
    /// Create a new ledger
    Init {
        /// Total tokens (default: budget.default_total from config)
        #[arg(long)]
        total: Option<i64>,

        /// Replace an existing ledger
        #[arg(long)]
        force: bool,
    },

    /// Allocate tokens to a child
    Allocate {
        child: String,
        amount: i64,

        /// Arbitrary JSON stored with the allocation
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Record tokens consumed by a child
    Track { child: String, amount: i64 },

    /// Show a child's allocation
    Check {
        child: String,

        /// Compaction threshold to test against instead of the ledger's
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Return a child's unspent tokens to the pool
    Release { child: String },

    /// Move allocated tokens between children
    Reallocate { from: String, to: String, amount: i64 },

    /// Print ledger totals and per-child allocations
    Summary {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Parser, Clone)]
pub struct CloseArgs {
    /// EPIC.json, ROADMAP.json, or a directory holding one
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Repository (owner/repo); falls back to github.repo in config
    #[arg(long)]
    pub repo: Option<String>,

    /// Path to config file
    #[arg(short, long, default_value = "epicflow.yaml")]
    pub config: PathBuf,

    /// Show what would be closed without calling gh
    #[arg(long)]
    pub dry_run: bool,
}

/// Load and validate config, falling back to defaults when the file is absent
pub fn load_config(path: &std::path::Path) -> anyhow::Result<epicflow::config::Config> {
    let config = epicflow::config::Config::load_or_default(path)?;
    config.validate()?;
    Ok(config)
}
