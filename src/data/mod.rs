//! Data access layer: tolerant JSONL decoding and file/directory parsing.

mod decoder;
mod reader;

pub use decoder::{parse_timestamp, LineDecoder};
pub use reader::{parse_directory, parse_file, DateFilter};

use std::path::PathBuf;
use thiserror::Error;


/// Errors from the parsing layer. Line-level failures are recoverable
/// (skip-with-warning) unless strict mode is on; file-level failures are
/// recoverable at the directory level.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },

    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("failed to read {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {source}")]
    Line {
        path: PathBuf,
        line: usize,
        #[source]
        source: Box<ParseError>,
    },
}
