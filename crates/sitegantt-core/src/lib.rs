//! # sitegantt-core
//!
//! Core domain model for the sitegantt construction timeline toolkit.
//!
//! This crate provides:
//! - Domain types: `TaskRecord`, `TaskStatus`, `FilterSpec`, `AggregatedSegment`
//! - The aggregator that rolls tasks up into one timeline segment per activity
//! - Dashboard KPIs (`status` module)
//! - Core traits: `Renderer`, `Exporter`
//! - Error types
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sitegantt_core::{aggregate, FilterSpec, TaskRecord, TaskStatus};
//!
//! let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
//! let tasks = vec![
//!     TaskRecord::new("Plumbing").dates(d(3), d(7)).status(TaskStatus::FinishedOnTime),
//!     TaskRecord::new("Plumbing").dates(d(5), d(12)).status(TaskStatus::Overdue),
//!     TaskRecord::new("Electrical").dates(d(10), d(14)),
//! ];
//!
//! let segments = aggregate(&tasks, &FilterSpec::default());
//! assert_eq!(segments.len(), 2);
//! assert_eq!(segments[0].activity, "Plumbing");
//! assert_eq!(segments[0].rolled_up_status, TaskStatus::Overdue);
//! assert_eq!(segments[0].bucket_end, d(12));
//! ```

pub mod aggregate;
pub mod status;

pub use aggregate::{aggregate, aggregate_with, filter_tasks};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// ============================================================================
// Task Status
// ============================================================================

/// Status of a single task, mapped from the free-form spreadsheet label
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    FinishedOnTime,
    FinishedLate,
    Overdue,
}

impl TaskStatus {
    /// Every status, in declaration order
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::FinishedOnTime,
        TaskStatus::FinishedLate,
        TaskStatus::Overdue,
    ];

    /// Display label
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::FinishedOnTime => "Finished On Time",
            TaskStatus::FinishedLate => "Finished Late",
            TaskStatus::Overdue => "Overdue",
        }
    }

    /// Rank used when rolling a group of tasks up into one status.
    ///
    /// Overdue > InProgress > FinishedLate > NotStarted > FinishedOnTime
    pub fn rollup_rank(&self) -> u8 {
        match self {
            TaskStatus::Overdue => 4,
            TaskStatus::InProgress => 3,
            TaskStatus::FinishedLate => 2,
            TaskStatus::NotStarted => 1,
            TaskStatus::FinishedOnTime => 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::FinishedOnTime | TaskStatus::FinishedLate)
    }

    /// Map a spreadsheet label to a status.
    ///
    /// Matching is case-insensitive on the trimmed label. An empty label means
    /// "Not Started". Returns `None` for labels outside the known vocabulary.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['_', '-'], " ");
        let status = match normalized.as_str() {
            "" | "not started" | "not delivered" | "pending" => TaskStatus::NotStarted,
            "in progress" | "just started" | "ongoing" | "started" => TaskStatus::InProgress,
            "finished" | "finished on time" | "delivered" | "done" | "complete" | "completed" => {
                TaskStatus::FinishedOnTime
            }
            "finished late" | "late" => TaskStatus::FinishedLate,
            "overdue" | "delayed" => TaskStatus::Overdue,
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::from_label(s).ok_or_else(|| format!("unknown task status '{}'", s))
    }
}

/// Whether the material for a task has been ordered
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    NotOrdered,
    Ordered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::NotOrdered => "Not Ordered",
            OrderStatus::Ordered => "Ordered",
        }
    }

    /// Map a spreadsheet label; an empty label means "Not Ordered"
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "" | "not ordered" | "no" => Some(OrderStatus::NotOrdered),
            "ordered" | "yes" => Some(OrderStatus::Ordered),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::from_label(s).ok_or_else(|| format!("unknown order status '{}'", s))
    }
}

// ============================================================================
// Task Record
// ============================================================================

/// One validated row of the construction task table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Work area or trade used as the primary grouping key
    pub activity: String,
    pub room: Option<String>,
    pub item: Option<String>,
    /// Task description
    pub task: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: TaskStatus,
    /// Material ordering state; missing in older tables, read as not ordered
    #[serde(default)]
    pub order_status: OrderStatus,
    /// Completion percentage (0-100)
    pub progress: f64,
    /// 1-based row in the source table (0 when built in code)
    pub row: usize,
}

impl TaskRecord {
    /// Create an undated, not-started record for an activity
    pub fn new(activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
            room: None,
            item: None,
            task: None,
            start_date: None,
            end_date: None,
            status: TaskStatus::NotStarted,
            order_status: OrderStatus::NotOrdered,
            progress: 0.0,
            row: 0,
        }
    }

    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Set both start and end date
    pub fn dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn order_status(mut self, order_status: OrderStatus) -> Self {
        self.order_status = order_status;
        self
    }

    /// Set progress, clamped to 0-100
    pub fn progress(mut self, pct: f64) -> Self {
        self.progress = pct.clamp(0.0, 100.0);
        self
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = row;
        self
    }

    /// The date span of this task, if both dates exist and are ordered.
    ///
    /// Records without a span never take part in aggregation.
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= end => Some((start, end)),
            _ => None,
        }
    }

    /// Whether the task is overdue as of `date`: explicitly marked overdue, or
    /// unfinished with an end date already in the past.
    pub fn is_overdue_on(&self, date: NaiveDate) -> bool {
        if self.status == TaskStatus::Overdue {
            return true;
        }
        !self.status.is_finished() && self.end_date.map_or(false, |end| end < date)
    }
}

// ============================================================================
// Filters
// ============================================================================

/// Inclusive date window
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn is_valid(&self) -> bool {
        self.from <= self.to
    }

    /// A task span satisfies the range when it lies entirely inside it
    pub fn contains(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.from <= start && end <= self.to
    }
}

/// User-selected constraints applied before aggregation.
///
/// Every dimension left as `None` does not filter. Label dimensions match
/// case-insensitively on trimmed values. `Some` of an empty set matches nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub activity: Option<BTreeSet<String>>,
    pub room: Option<BTreeSet<String>>,
    pub item: Option<BTreeSet<String>>,
    pub task: Option<BTreeSet<String>>,
    pub status: Option<BTreeSet<TaskStatus>>,
    #[serde(default)]
    pub order_status: Option<BTreeSet<OrderStatus>>,
    pub date_range: Option<DateRange>,
    /// Drop finished tasks (on time or late)
    #[serde(default)]
    pub hide_finished: bool,
}

fn label_set<I, S>(labels: I) -> Option<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let set: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

pub(crate) fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

fn label_allowed(allowed: &Option<BTreeSet<String>>, value: Option<&str>) -> bool {
    match allowed {
        None => true,
        Some(set) => match value {
            Some(value) => {
                let value = normalize_label(value);
                set.iter().any(|s| normalize_label(s) == value)
            }
            None => false,
        },
    }
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to these activities (an empty list leaves the dimension unfiltered)
    pub fn activities<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activity = label_set(labels);
        self
    }

    pub fn rooms<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.room = label_set(labels);
        self
    }

    pub fn items<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.item = label_set(labels);
        self
    }

    pub fn tasks<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.task = label_set(labels);
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        let set: BTreeSet<TaskStatus> = statuses.into_iter().collect();
        self.status = if set.is_empty() { None } else { Some(set) };
        self
    }

    pub fn order_statuses(mut self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        let set: BTreeSet<OrderStatus> = statuses.into_iter().collect();
        self.order_status = if set.is_empty() { None } else { Some(set) };
        self
    }

    pub fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(from, to));
        self
    }

    pub fn hide_finished(mut self) -> Self {
        self.hide_finished = true;
        self
    }

    /// A filter is invalid when its date range is inverted
    pub fn is_valid(&self) -> bool {
        self.date_range.map_or(true, |r| r.is_valid())
    }

    /// Whether no dimension filters anything
    pub fn is_empty(&self) -> bool {
        self.activity.is_none()
            && self.room.is_none()
            && self.item.is_none()
            && self.task.is_none()
            && self.status.is_none()
            && self.order_status.is_none()
            && self.date_range.is_none()
            && !self.hide_finished
    }

    /// Conjunction of every supplied dimension
    pub fn matches(&self, task: &TaskRecord) -> bool {
        if !label_allowed(&self.activity, Some(&task.activity))
            || !label_allowed(&self.room, task.room.as_deref())
            || !label_allowed(&self.item, task.item.as_deref())
            || !label_allowed(&self.task, task.task.as_deref())
        {
            return false;
        }

        if let Some(statuses) = &self.status {
            if !statuses.contains(&task.status) {
                return false;
            }
        }

        if let Some(orders) = &self.order_status {
            if !orders.contains(&task.order_status) {
                return false;
            }
        }

        if self.hide_finished && task.status.is_finished() {
            return false;
        }

        match self.date_range {
            None => true,
            Some(range) => task
                .span()
                .map_or(false, |(start, end)| range.contains(start, end)),
        }
    }

    /// Human-readable description of the active filters
    pub fn summary(&self) -> String {
        fn join(set: &BTreeSet<String>) -> String {
            set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        }

        let mut parts = Vec::new();
        if let Some(set) = &self.activity {
            parts.push(format!("Activities: {}", join(set)));
        }
        if let Some(set) = &self.item {
            parts.push(format!("Items: {}", join(set)));
        }
        if let Some(set) = &self.task {
            parts.push(format!("Tasks: {}", join(set)));
        }
        if let Some(set) = &self.room {
            parts.push(format!("Rooms: {}", join(set)));
        }
        if let Some(statuses) = &self.status {
            let labels: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
            parts.push(format!("Status: {}", labels.join(", ")));
        }
        if let Some(orders) = &self.order_status {
            let labels: Vec<&str> = orders.iter().map(|s| s.as_str()).collect();
            parts.push(format!("Order Status: {}", labels.join(", ")));
        }
        if self.hide_finished {
            parts.push("Finished: hidden".to_string());
        }
        if let Some(range) = &self.date_range {
            // Calendar limits stand in for an open end
            let text = match (range.from == NaiveDate::MIN, range.to == NaiveDate::MAX) {
                (true, true) => "any".to_string(),
                (false, true) => format!("from {}", range.from),
                (true, false) => format!("until {}", range.to),
                (false, false) => format!("{} to {}", range.from, range.to),
            };
            parts.push(format!("Date Range: {}", text));
        }

        if parts.is_empty() {
            "No filters applied.".to_string()
        } else {
            parts.join("; ")
        }
    }
}

// ============================================================================
// Aggregation Output
// ============================================================================

/// Calendar bucketing for timeline segments
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucketing {
    /// One segment per group covering its min start to max end
    #[default]
    Span,
    /// One segment per group per calendar day of task start
    Day,
    /// One segment per group per ISO week (Monday-Sunday) of task start
    Week,
}

impl Bucketing {
    /// Fixed calendar bucket containing `date`, or `None` for span bucketing
    pub fn bucket_of(&self, date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Bucketing::Span => None,
            Bucketing::Day => Some((date, date)),
            Bucketing::Week => {
                let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                Some((monday, monday + Duration::days(6)))
            }
        }
    }
}

impl std::str::FromStr for Bucketing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "span" => Ok(Bucketing::Span),
            "day" => Ok(Bucketing::Day),
            "week" => Ok(Bucketing::Week),
            other => Err(format!("unknown bucketing '{}' (expected span, day or week)", other)),
        }
    }
}

/// Grouping options for `aggregate_with`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Group by (activity, room) instead of activity alone
    pub group_by_room: bool,
    pub bucket: Bucketing,
}

impl AggregateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_by_room(mut self) -> Self {
        self.group_by_room = true;
        self
    }

    pub fn bucket(mut self, bucket: Bucketing) -> Self {
        self.bucket = bucket;
        self
    }
}

/// One rolled-up timeline bar
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedSegment {
    pub activity: String,
    /// Set only when grouping by room
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub bucket_start: NaiveDate,
    pub bucket_end: NaiveDate,
    pub rolled_up_status: TaskStatus,
    pub task_count: usize,
    /// Mean progress of the constituent tasks (0-100)
    pub mean_progress: f64,
}

impl AggregatedSegment {
    /// Row label: `activity` or `activity | room`
    pub fn label(&self) -> String {
        match &self.room {
            Some(room) => format!("{} | {}", self.activity, room),
            None => self.activity.clone(),
        }
    }

    /// Inclusive length in days
    pub fn duration_days(&self) -> i64 {
        (self.bucket_end - self.bucket_start).num_days() + 1
    }

    /// End date of the completed part of a partially done in-progress bar.
    ///
    /// Returns `None` unless the segment is in progress with progress strictly
    /// between 0 and 100 and spans at least one day.
    pub fn progress_split(&self) -> Option<NaiveDate> {
        if self.rolled_up_status != TaskStatus::InProgress {
            return None;
        }
        if self.mean_progress <= 0.0 || self.mean_progress >= 100.0 {
            return None;
        }
        let span_days = (self.bucket_end - self.bucket_start).num_days();
        if span_days <= 0 {
            return None;
        }
        let done_days = (span_days as f64 * self.mean_progress / 100.0).floor() as i64;
        Some(self.bucket_start + Duration::days(done_days))
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering of aggregated timeline segments
pub trait Renderer {
    type Output;

    /// Render segments under a chart title
    fn render(&self, title: &str, segments: &[AggregatedSegment]) -> Result<Self::Output, RenderError>;
}

/// Export of the filtered task table (not the aggregated one)
pub trait Exporter {
    fn export(&self, tasks: &[&TaskRecord]) -> Result<Vec<u8>, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================
