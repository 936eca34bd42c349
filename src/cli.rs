//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands;
use crate::config::{CostMode, CONFIG_DIR_ENV};


/// claude-stats - analyze Claude Code usage logs
#[derive(Parser)]
#[command(name = "claude-stats")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Disable ANSI colors in table output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}


#[derive(Subcommand)]
enum Commands {
    /// Full usage report: tokens, models, costs, quota estimate
    Analyze {
        #[command(flatten)]
        common: CommonArgs,

        /// Only include models whose name contains this substring
        #[arg(long)]
        model: Option<String>,

        /// Include daily, project, and session breakdowns
        #[arg(short, long)]
        details: bool,
    },

    /// Per-calendar-day usage table
    Daily {
        #[command(flatten)]
        common: CommonArgs,

        /// Date order
        #[arg(long, value_enum, default_value = "desc")]
        order: SortOrder,
    },

    /// 5-hour billing block analysis
    Blocks {
        #[command(flatten)]
        common: CommonArgs,

        /// Refresh continuously until interrupted
        #[arg(long)]
        live: bool,

        /// Token limit per block: a number, or "max" for the largest block
        /// seen in the data
        #[arg(short = 't', long)]
        token_limit: Option<String>,

        /// Seconds between live refreshes
        #[arg(long, default_value_t = crate::config::DEFAULT_REFRESH_INTERVAL)]
        refresh_interval: u64,

        /// Only show the currently active block
        #[arg(long)]
        active: bool,

        /// Only show blocks from the last 24 hours
        #[arg(long)]
        recent: bool,
    },
}


/// Flags shared by every subcommand.
#[derive(Args, Clone, Default)]
pub struct CommonArgs {
    /// Directory of JSONL logs (skips auto-detection)
    pub dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only include entries on or after this date (YYYYMMDD, YYYY-MM-DD,
    /// YYYY/MM/DD)
    #[arg(long)]
    pub since: Option<String>,

    /// Only include entries on or before this date
    #[arg(long)]
    pub until: Option<String>,

    /// Abort on the first malformed line instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// How to compute and label costs
    #[arg(long, value_enum, default_value = "auto")]
    pub mode: CostMode,

    /// Comma-separated data directories
    #[arg(long, value_name = "DIR1,DIR2", env = CONFIG_DIR_ENV)]
    pub config_dirs: Option<String>,
}


#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    Asc,
    Desc,
}


/// Run the CLI. Without a subcommand, `analyze` runs with defaults.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let color = !cli.no_color;

    match cli.command {
        Some(Commands::Analyze { common, model, details }) => {
            commands::analyze::run(&common, model.as_deref(), details, color)
        }
        Some(Commands::Daily { common, order }) => {
            commands::daily::run(&common, order == SortOrder::Asc, color)
        }
        Some(Commands::Blocks { common, live, token_limit, refresh_interval, active, recent }) => {
            let options = commands::blocks::BlockOptions {
                live,
                token_limit,
                refresh_interval,
                active,
                recent,
            };
            commands::blocks::run(&common, &options, color)
        }
        None => commands::analyze::run(&CommonArgs::default(), None, false, color),
    }
}
