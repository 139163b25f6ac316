//! Row validation
//!
//! Turns [`RawRow`]s into [`TaskRecord`]s. Problems with a single row never
//! abort the load: the row is either rejected with a [`RejectReason`] or kept
//! with a [`CoercionWarning`] for a cell that could not be read.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sitegantt_core::{OrderStatus, TaskRecord, TaskStatus};
use thiserror::Error;

use crate::rows::{Column, RawRow};

// ============================================================================
// Options
// ============================================================================

/// What to do with a status label outside the known vocabulary
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnknownStatusPolicy {
    /// Reject the row
    #[default]
    Reject,
    /// Keep the row with the given status
    Assume(TaskStatus),
}

impl std::str::FromStr for UnknownStatusPolicy {
    type Err = String;

    /// `"reject"` or any known status label
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("reject") {
            return Ok(UnknownStatusPolicy::Reject);
        }
        TaskStatus::from_label(s)
            .map(UnknownStatusPolicy::Assume)
            .ok_or_else(|| format!("expected \"reject\" or a task status, got '{}'", s))
    }
}

/// Ingestion settings
#[derive(Clone, Debug, Default)]
pub struct IngestOptions {
    pub unknown_status: UnknownStatusPolicy,
    /// When set, unfinished tasks that ended before this date become overdue
    pub status_date: Option<NaiveDate>,
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unknown_status(mut self, policy: UnknownStatusPolicy) -> Self {
        self.unknown_status = policy;
        self
    }

    pub fn status_date(mut self, date: NaiveDate) -> Self {
        self.status_date = Some(date);
        self
    }
}

// ============================================================================
// Results
// ============================================================================

/// Why a row was not accepted
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing activity")]
    MissingActivity,

    #[error("start date {start} is after end date {end}")]
    InvertedDates { start: NaiveDate, end: NaiveDate },

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// A rejected row
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub row: usize,
    pub reason: RejectReason,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.reason)
    }
}

/// A cell that could not be read and was treated as empty
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoercionWarning {
    pub row: usize,
    pub column: Column,
    pub value: String,
}

impl std::fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "row {}: unreadable {} '{}'",
            self.row,
            self.column.as_str(),
            self.value
        )
    }
}

/// Outcome of ingesting a table
#[derive(Clone, Debug, Default)]
pub struct Ingested {
    pub records: Vec<TaskRecord>,
    pub rejections: Vec<Rejection>,
    pub warnings: Vec<CoercionWarning>,
}

impl Ingested {
    /// Rows seen, accepted or not
    pub fn total_rows(&self) -> usize {
        self.records.len() + self.rejections.len()
    }

    /// No rejections and no warnings
    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty() && self.warnings.is_empty()
    }
}

// ============================================================================
// Cell parsing
// ============================================================================

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Parse a date cell, dropping any time of day
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }
    if let Some(datetime) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
    {
        return Some(datetime.date());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parse a progress cell (`40`, `40.5`, `40%`), clamped to 0-100
pub fn parse_progress(value: &str) -> Option<f64> {
    let number = value.trim().trim_end_matches('%').trim();
    match number.parse::<f64>() {
        Ok(pct) if pct.is_finite() => Some(pct.clamp(0.0, 100.0)),
        _ => None,
    }
}

// ============================================================================
// Ingestion
// ============================================================================

/// Validate rows into task records.
///
/// Every row ends up in exactly one of `records` or `rejections`, in input
/// order.
pub fn ingest(rows: &[RawRow], options: &IngestOptions) -> Ingested {
    let mut out = Ingested::default();
    for raw in rows {
        match ingest_row(raw, options, &mut out.warnings) {
            Ok(record) => out.records.push(record),
            Err(reason) => out.rejections.push(Rejection {
                row: raw.row,
                reason,
            }),
        }
    }
    out
}

fn date_cell(
    raw: &RawRow,
    column: Column,
    value: Option<&str>,
    warnings: &mut Vec<CoercionWarning>,
) -> Option<NaiveDate> {
    let value = value?;
    let date = parse_date(value);
    if date.is_none() {
        warnings.push(CoercionWarning {
            row: raw.row,
            column,
            value: value.to_string(),
        });
    }
    date
}

fn text_cell(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn ingest_row(
    raw: &RawRow,
    options: &IngestOptions,
    warnings: &mut Vec<CoercionWarning>,
) -> Result<TaskRecord, RejectReason> {
    let activity = text_cell(raw.activity.as_ref()).ok_or(RejectReason::MissingActivity)?;

    let mut row_warnings = Vec::new();
    let start_date = date_cell(raw, Column::StartDate, raw.start_date.as_deref(), &mut row_warnings);
    let end_date = date_cell(raw, Column::EndDate, raw.end_date.as_deref(), &mut row_warnings);
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(RejectReason::InvertedDates { start, end });
        }
    }

    let label = raw.status.as_deref().unwrap_or("");
    let mut status = match (TaskStatus::from_label(label), options.unknown_status) {
        (Some(status), _) => status,
        (None, UnknownStatusPolicy::Assume(status)) => status,
        (None, UnknownStatusPolicy::Reject) => {
            return Err(RejectReason::UnknownStatus(label.trim().to_string()))
        }
    };

    if let (Some(today), Some(end)) = (options.status_date, end_date) {
        if matches!(status, TaskStatus::NotStarted | TaskStatus::InProgress) && end < today {
            status = TaskStatus::Overdue;
        }
    }

    let progress = if status.is_finished() {
        100.0
    } else {
        match raw.progress.as_deref() {
            None => 0.0,
            Some(value) => parse_progress(value).unwrap_or_else(|| {
                row_warnings.push(CoercionWarning {
                    row: raw.row,
                    column: Column::Progress,
                    value: value.to_string(),
                });
                0.0
            }),
        }
    };

    // Unreadable order labels fall back to "Not Ordered"
    let order_status = match raw.order_status.as_deref() {
        None => OrderStatus::NotOrdered,
        Some(value) => OrderStatus::from_label(value).unwrap_or_else(|| {
            row_warnings.push(CoercionWarning {
                row: raw.row,
                column: Column::OrderStatus,
                value: value.to_string(),
            });
            OrderStatus::NotOrdered
        }),
    };

    warnings.append(&mut row_warnings);
    Ok(TaskRecord {
        activity,
        room: text_cell(raw.room.as_ref()),
        item: text_cell(raw.item.as_ref()),
        task: text_cell(raw.task.as_ref()),
        start_date,
        end_date,
        status,
        order_status,
        progress,
        row: raw.row,
    })
}

// ============================================================================
// Tests
// ============================================================================
