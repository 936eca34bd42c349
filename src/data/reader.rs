//! File and directory parsing: streams JSONL lines through the decoder and
//! folds the decoded entries into a `UsageStats` aggregate.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, Utc};

use super::decoder::LineDecoder;
use super::ParseError;
use crate::aggregation::accumulate;
use crate::models::{ConversationEntry, UsageStats};


/// Inclusive date-range filter applied per entry before accumulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}


impl DateFilter {
    /// An entry with no parsable timestamp sorts before any real bound, so a
    /// lower bound excludes it; an upper bound alone keeps it.
    pub fn includes(&self, entry: &ConversationEntry) -> bool {
        match entry.timestamp {
            Some(ts) => {
                if self.since.is_some_and(|since| ts < since) {
                    return false;
                }
                !self.until.is_some_and(|until| ts > until)
            }
            None => self.since.is_none(),
        }
    }
}


/// Parse a single JSONL file into a fresh aggregate. Blank lines are
/// skipped; malformed lines are skipped with a warning, or abort the file
/// when `strict` is set.
pub fn parse_file(
    path: &Path,
    decoder: &LineDecoder,
    filter: &DateFilter,
    strict: bool,
) -> Result<UsageStats, ParseError> {
    let file = File::open(path).map_err(|source| ParseError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let mut stats = UsageStats::default();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| ParseError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match decoder.decode_line(line) {
            Ok(entry) => {
                if filter.includes(&entry) {
                    accumulate(&mut stats, &entry);
                }
            }
            Err(e) => {
                if strict {
                    return Err(ParseError::Line {
                        path: path.to_path_buf(),
                        line: line_no + 1,
                        source: Box::new(e),
                    });
                }
                eprintln!(
                    "Warning: skipping malformed line {}:{}: {}",
                    path.display(),
                    line_no + 1,
                    e
                );
            }
        }
    }

    Ok(stats)
}


/// Parse every `.jsonl` file found under `dir` (recursively) and merge the
/// per-file aggregates. Unreadable files are skipped with a warning unless
/// strict mode is on.
pub fn parse_directory(
    dir: &Path,
    decoder: &LineDecoder,
    filter: &DateFilter,
    strict: bool,
) -> Result<UsageStats, ParseError> {
    let mut files = Vec::new();
    collect_jsonl_files(dir, &mut files);
    files.sort();

    let mut stats = UsageStats::default();
    for path in &files {
        match parse_file(path, decoder, filter, strict) {
            Ok(file_stats) => crate::aggregation::merge(&mut stats, file_stats),
            Err(e) => {
                if strict {
                    return Err(e);
                }
                eprintln!("Warning: skipping file {}: {}", path.display(), e);
            }
        }
    }

    Ok(stats)
}


/// Recursively collect files whose name ends in `.jsonl` (case-insensitive).
/// Unreadable subdirectories are silently skipped.
fn collect_jsonl_files(dir: &Path, files: &mut Vec<std::path::PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_jsonl_files(&path, files);
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"))
        {
            files.push(path);
        }
    }
}
