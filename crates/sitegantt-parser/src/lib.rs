//! # sitegantt-parser
//!
//! Loads construction task tables into [`TaskRecord`](sitegantt_core::TaskRecord)s.
//!
//! This crate provides:
//! - Readers for CSV, JSON and TOML task tables ([`rows`])
//! - Row validation with per-row rejections ([`ingest`])
//! - Format detection and one-call file loading
//!
//! ## Example
//!
//! ```rust
//! use sitegantt_parser::{load_str, FileFormat, IngestOptions};
//!
//! let input = "\
//! Activity,Room,Start Date,End Date,Status
//! Plumbing,Kitchen,2025-03-03,2025-03-07,In Progress
//! ,Bath,2025-03-04,2025-03-05,Finished
//! ";
//!
//! let loaded = load_str(input, FileFormat::Csv, &IngestOptions::default()).unwrap();
//! assert_eq!(loaded.records.len(), 1);
//! assert_eq!(loaded.rejections.len(), 1);
//! ```

pub mod ingest;
pub mod rows;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use ingest::{
    ingest, parse_date, parse_progress, CoercionWarning, IngestOptions, Ingested, RejectReason,
    Rejection, UnknownStatusPolicy,
};
pub use rows::{Column, RawRow};

/// Loading error.
///
/// Covers problems with the file as a whole; problems with single rows are
/// reported as [`Rejection`]s instead.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid structure: {0}")]
    InvalidStructure(String),
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated table with a header row (.csv)
    Csv,
    /// Array of task objects (.json)
    Json,
    /// `[[task]]` tables (.toml)
    Toml,
}

impl std::str::FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            "toml" => Ok(FileFormat::Toml),
            other => Err(format!("unknown input format '{}'", other)),
        }
    }
}

/// Detect file format from extension
pub fn detect_format(path: &Path) -> FileFormat {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("json") => FileFormat::Json,
        Some("toml") => FileFormat::Toml,
        _ => FileFormat::Csv,
    }
}

/// Read untyped rows in the given format
pub fn read_rows(input: &str, format: FileFormat) -> Result<Vec<RawRow>, ParseError> {
    match format {
        FileFormat::Csv => rows::read_csv(input),
        FileFormat::Json => rows::read_json(input),
        FileFormat::Toml => rows::read_toml(input),
    }
}

/// Read and validate a task table held in memory
pub fn load_str(
    input: &str,
    format: FileFormat,
    options: &IngestOptions,
) -> Result<Ingested, ParseError> {
    let rows = read_rows(input, format)?;
    Ok(ingest(&rows, options))
}

/// Load a task table from a path (auto-detects format)
pub fn load_file(path: &Path, options: &IngestOptions) -> Result<Ingested, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&content, detect_format(path), options)
}
