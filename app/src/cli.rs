use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "paineel",
    version,
    about = "Monitors SEI ANEEL processes and keeps the tracking spreadsheet up to date"
)]
pub struct Cli {
    /// Configuration file (defaults to PAINEEL_CONFIG, then ~/.config/paineel/config.toml)
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging for the paineel crates
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Accept console commands while running (p, s, q, i, h)
    #[arg(long, short)]
    pub interactive: bool,

    /// Wait for ENTER before each process number
    #[arg(long)]
    pub step_mode: bool,

    /// Process at most this many numbers
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Process these numbers instead of the ledger's
    #[arg(long = "processo", num_args = 1.., value_name = "NUMBER")]
    pub processes: Option<Vec<String>>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitor (default)
    Run(RunArgs),
    /// Edit the tracked process list
    Manage {
        #[command(subcommand)]
        action: ManageAction,
    },
    /// Check connectivity with the external services
    Check {
        #[arg(long)]
        skip_captcha: bool,
        #[arg(long)]
        skip_smtp: bool,
        #[arg(long)]
        skip_ledger: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ManageAction {
    /// Start tracking a process number
    Add { number: String },
    /// Stop tracking a process number
    Remove { number: String },
    /// Replace a tracked process number
    Rename { old: String, new: String },
}
