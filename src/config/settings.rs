//! Application settings: cost-mode option, data-directory discovery, and
//! date-argument parsing.

use std::path::PathBuf;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::ValueEnum;


/// Default refresh interval for live block monitoring (seconds).
pub const DEFAULT_REFRESH_INTERVAL: u64 = 3;

/// Token-limit fallback when `--token-limit max` finds no history.
pub const DEFAULT_TOKEN_LIMIT: u64 = 500_000;

/// Environment variable holding comma-separated data directories.
pub const CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";


/// How costs should be computed and labeled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CostMode {
    /// Costs are estimates when the logs look subscription-billed.
    #[default]
    Auto,
    /// Always treat the figures as metered pay-per-token math.
    Calculate,
    /// Always label the figures as estimates.
    Display,
}


/// Resolve the data directories to analyze.
///
/// Precedence: positional argument, then `--config-dirs`, then the
/// `CLAUDE_CONFIG_DIR` environment variable (comma-separated, `~` expanded),
/// then platform auto-detection.
pub fn resolve_data_dirs(
    positional: Option<&PathBuf>,
    config_dirs: Option<&str>,
) -> Vec<PathBuf> {
    if let Some(dir) = positional {
        return vec![dir.clone()];
    }

    if let Some(dirs) = config_dirs.and_then(split_dir_list) {
        return dirs;
    }

    if let Some(dirs) = std::env::var(CONFIG_DIR_ENV)
        .ok()
        .as_deref()
        .and_then(split_dir_list)
    {
        return dirs;
    }

    vec![default_data_dir()]
}


/// Split a comma-separated directory list, dropping blanks and expanding a
/// leading `~/`. Returns `None` when nothing usable remains.
fn split_dir_list(list: &str) -> Option<Vec<PathBuf>> {
    let dirs: Vec<PathBuf> = list
        .split(',')
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(expand_tilde)
        .collect();
    if dirs.is_empty() {
        None
    } else {
        Some(dirs)
    }
}


fn expand_tilde(dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(dir)
}


/// Default data directory: `~/.claude/projects`, falling back to a few
/// other locations Claude Code has used when that one does not exist.
pub fn default_data_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let primary = home.join(".claude").join("projects");

    let mut candidates = vec![primary.clone()];
    if let Some(config) = dirs::config_dir() {
        candidates.push(config.join("claude").join("projects"));
    }
    candidates.push(home.join("claude-logs"));

    candidates
        .into_iter()
        .find(|dir| dir.is_dir())
        .unwrap_or(primary)
}


/// Parse a date argument in `YYYYMMDD`, `YYYY-MM-DD`, or `YYYY/MM/DD` form.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    for format in ["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Ok(date);
        }
    }
    bail!("invalid date '{s}' (expected YYYYMMDD, YYYY-MM-DD, or YYYY/MM/DD)");
}
