//! claude-stats CLI
//!
//! Usage and cost analysis for Claude Code conversation logs.

mod aggregation;
mod analysis;
mod cli;
mod commands;
mod config;
mod data;
mod models;
mod output;
mod pricing;


fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
