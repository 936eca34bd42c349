//! CLI command implementations.

pub mod analyze;
pub mod blocks;
pub mod daily;

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, LocalResult, NaiveDate, TimeZone, Utc};

use crate::aggregation;
use crate::cli::CommonArgs;
use crate::config;
use crate::data::{parse_directory, DateFilter, LineDecoder};
use crate::models::UsageStats;


/// Parse every resolved directory and merge the results. Missing or
/// unreadable directories are skipped with a warning; the run fails only
/// when no directory yields data (or on any error under `--strict`).
pub(crate) fn load_stats(common: &CommonArgs) -> Result<UsageStats> {
    let dirs = config::resolve_data_dirs(common.dir.as_ref(), common.config_dirs.as_deref());
    let decoder = LineDecoder::new();
    let filter = date_filter(common)?;

    let mut merged = UsageStats::default();
    let mut loaded = 0usize;
    for dir in &dirs {
        if !dir.is_dir() {
            eprintln!("Warning: skipping missing directory {}", dir.display());
            continue;
        }
        match parse_directory(dir, &decoder, &filter, common.strict) {
            Ok(stats) => {
                aggregation::merge(&mut merged, stats);
                loaded += 1;
            }
            // Line errors already carry the file path and line number.
            Err(e) if common.strict => return Err(e.into()),
            Err(e) => {
                eprintln!("Warning: skipping {}: {e}", dir.display());
            }
        }
    }

    if loaded == 0 {
        bail!(
            "no usable data directories found (checked: {})",
            dirs.iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(merged)
}


/// Build the entry date filter from `--since`/`--until`. Bounds are local
/// calendar days, inclusive on both ends.
pub(crate) fn date_filter(common: &CommonArgs) -> Result<DateFilter> {
    let mut filter = DateFilter::default();
    if let Some(s) = &common.since {
        filter.since = Some(local_day_bound(config::parse_date_arg(s)?, false));
    }
    if let Some(u) = &common.until {
        filter.until = Some(local_day_bound(config::parse_date_arg(u)?, true));
    }
    Ok(filter)
}


fn local_day_bound(date: NaiveDate, end_of_day: bool) -> DateTime<Utc> {
    let naive = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .expect("fixed time of day is always valid");

    match chrono::Local.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => t.with_timezone(&Utc),
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}


/// Write a rendered report to `--output` or stdout.
pub(crate) fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{rendered}"),
    }
    Ok(())
}


pub(crate) fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}
