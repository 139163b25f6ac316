//! Project dashboard KPIs
//!
//! Answers "how is the site doing right now?" from the task table:
//! completion, overdue work, the next few days of starts and the spread of
//! tasks over activities.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sitegantt_core::status::{Dashboard, Health};
//! use sitegantt_core::{filter_tasks, FilterSpec, TaskRecord, TaskStatus};
//!
//! let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
//! let tasks = vec![
//!     TaskRecord::new("Plumbing").dates(d(1), d(4)).status(TaskStatus::FinishedOnTime),
//!     TaskRecord::new("Electrical").dates(d(2), d(20)).status(TaskStatus::InProgress),
//! ];
//! let filters = FilterSpec::default();
//! let filtered = filter_tasks(&tasks, &filters);
//!
//! let dashboard = Dashboard::build(&tasks, &filtered, &filters, d(10), 7);
//! assert_eq!(dashboard.completion_percent, 50.0);
//! assert_eq!(dashboard.health(), Health::OnTrack);
//! ```

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{normalize_label, FilterSpec, TaskRecord, TaskStatus};

// ============================================================================
// Core Types
// ============================================================================

/// Overall health classification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// No unfinished task is overdue
    OnTrack,
    /// Up to 20% of unfinished tasks are overdue
    AtRisk,
    /// More than 20% of unfinished tasks are overdue
    Behind,
}

impl Health {
    pub fn as_str(&self) -> &'static str {
        match self {
            Health::OnTrack => "On Track",
            Health::AtRisk => "At Risk",
            Health::Behind => "Behind",
        }
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task count for one activity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCount {
    pub activity: String,
    pub count: usize,
}

/// Dashboard metrics for a task table
///
/// Totals are computed over the whole table; lists (overdue, upcoming,
/// distribution) over the filtered view.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Dashboard {
    /// As-of date
    pub status_date: NaiveDate,

    pub total_tasks: usize,

    /// Finished on time or late
    pub finished_tasks: usize,

    pub in_progress_tasks: usize,

    pub not_started_tasks: usize,

    /// Unfinished tasks overdue at the status date
    pub overdue_tasks: usize,

    /// finished / total * 100
    pub completion_percent: f64,

    /// Filtered tasks overdue at the status date
    pub overdue: Vec<TaskRecord>,

    /// Filtered tasks starting within the upcoming window
    pub upcoming: Vec<TaskRecord>,

    /// Filtered task count per activity, in first-appearance order
    pub distribution: Vec<ActivityCount>,

    pub filter_summary: String,
}

impl Dashboard {
    /// Build the dashboard.
    ///
    /// # Arguments
    ///
    /// * `all` - The complete task table
    /// * `filtered` - The view selected by `filters`
    /// * `filters` - Used for the summary line only
    /// * `status_date` - The as-of date ("today")
    /// * `upcoming_days` - Size of the upcoming-starts window
    pub fn build(
        all: &[TaskRecord],
        filtered: &[&TaskRecord],
        filters: &FilterSpec,
        status_date: NaiveDate,
        upcoming_days: u32,
    ) -> Self {
        let mut finished_tasks = 0usize;
        let mut in_progress_tasks = 0usize;
        let mut not_started_tasks = 0usize;
        let mut overdue_tasks = 0usize;

        for task in all {
            match task.status {
                TaskStatus::FinishedOnTime | TaskStatus::FinishedLate => finished_tasks += 1,
                TaskStatus::InProgress => in_progress_tasks += 1,
                TaskStatus::NotStarted => not_started_tasks += 1,
                TaskStatus::Overdue => {}
            }
            if task.is_overdue_on(status_date) {
                overdue_tasks += 1;
            }
        }

        let total_tasks = all.len();
        let completion_percent = if total_tasks > 0 {
            finished_tasks as f64 / total_tasks as f64 * 100.0
        } else {
            0.0
        };

        let overdue = filtered
            .iter()
            .filter(|t| t.is_overdue_on(status_date))
            .map(|t| (*t).clone())
            .collect();

        // Saturates at the calendar limit for very large windows
        let window_end = status_date
            .checked_add_signed(Duration::days(i64::from(upcoming_days)))
            .unwrap_or(NaiveDate::MAX);
        let upcoming = filtered
            .iter()
            .filter(|t| {
                t.start_date
                    .map_or(false, |start| status_date <= start && start <= window_end)
            })
            .map(|t| (*t).clone())
            .collect();

        let mut distribution: Vec<ActivityCount> = Vec::new();
        for task in filtered {
            let key = normalize_label(&task.activity);
            match distribution
                .iter_mut()
                .find(|c| normalize_label(&c.activity) == key)
            {
                Some(entry) => entry.count += 1,
                None => distribution.push(ActivityCount {
                    activity: task.activity.clone(),
                    count: 1,
                }),
            }
        }

        Self {
            status_date,
            total_tasks,
            finished_tasks,
            in_progress_tasks,
            not_started_tasks,
            overdue_tasks,
            completion_percent,
            overdue,
            upcoming,
            distribution,
            filter_summary: filters.summary(),
        }
    }

    /// Health from the overdue share of unfinished tasks
    pub fn health(&self) -> Health {
        let unfinished = self.total_tasks - self.finished_tasks;
        if unfinished == 0 || self.overdue_tasks == 0 {
            return Health::OnTrack;
        }
        let share = self.overdue_tasks as f64 / unfinished as f64;
        if share <= 0.2 {
            Health::AtRisk
        } else {
            Health::Behind
        }
    }

    /// Text progress bar, e.g. `[#####-----] 50.0%`
    pub fn progress_bar(&self, width: usize) -> String {
        let filled = ((self.completion_percent / 100.0) * width as f64).round() as usize;
        let filled = filled.min(width);
        format!(
            "[{}{}] {:.1}%",
            "#".repeat(filled),
            "-".repeat(width - filled),
            self.completion_percent
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_tasks;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn create_test_table() -> Vec<TaskRecord> {
        vec![
            TaskRecord::new("Demolition")
                .dates(date(2025, 3, 1), date(2025, 3, 3))
                .status(TaskStatus::FinishedOnTime),
            TaskRecord::new("Plumbing")
                .dates(date(2025, 3, 4), date(2025, 3, 8))
                .status(TaskStatus::InProgress),
            TaskRecord::new("Electrical")
                .dates(date(2025, 3, 12), date(2025, 3, 20))
                .status(TaskStatus::NotStarted),
            TaskRecord::new("Plumbing")
                .dates(date(2025, 3, 9), date(2025, 3, 25))
                .status(TaskStatus::NotStarted),
            TaskRecord::new("Tiling").status(TaskStatus::FinishedLate),
        ]
    }

    #[test]
    fn test_huge_upcoming_window_saturates() {
        let tasks = create_test_table();
        let filters = FilterSpec::default();
        let filtered = filter_tasks(&tasks, &filters);
        let dashboard = Dashboard::build(&tasks, &filtered, &filters, date(2025, 3, 10), u32::MAX);

        // Every dated task starting on or after the status date is upcoming
        assert_eq!(dashboard.upcoming.len(), 1);
        assert_eq!(dashboard.upcoming[0].activity, "Electrical");
    }

    #[test]
    fn test_counts_and_completion() {
        let tasks = create_test_table();
        let filters = FilterSpec::default();
        let filtered = filter_tasks(&tasks, &filters);
        let dashboard = Dashboard::build(&tasks, &filtered, &filters, date(2025, 3, 10), 7);

        assert_eq!(dashboard.total_tasks, 5);
        assert_eq!(dashboard.finished_tasks, 2);
        assert_eq!(dashboard.in_progress_tasks, 1);
        assert_eq!(dashboard.not_started_tasks, 2);
        assert_eq!(dashboard.completion_percent, 40.0);
    }

    #[test]
    fn test_overdue_uses_status_date() {
        let tasks = create_test_table();
        let filters = FilterSpec::default();
        let filtered = filter_tasks(&tasks, &filters);
        let dashboard = Dashboard::build(&tasks, &filtered, &filters, date(2025, 3, 10), 7);

        // Plumbing (ends 03-08, in progress) is overdue; finished work never is
        assert_eq!(dashboard.overdue_tasks, 1);
        assert_eq!(dashboard.overdue.len(), 1);
        assert_eq!(dashboard.overdue[0].activity, "Plumbing");
    }

    #[test]
    fn test_upcoming_window() {
        let tasks = create_test_table();
        let filters = FilterSpec::default();
        let filtered = filter_tasks(&tasks, &filters);

        let dashboard = Dashboard::build(&tasks, &filtered, &filters, date(2025, 3, 9), 3);
        let starts: Vec<NaiveDate> = dashboard.upcoming.iter().filter_map(|t| t.start_date).collect();
        assert_eq!(starts, vec![date(2025, 3, 12), date(2025, 3, 9)]);

        let narrow = Dashboard::build(&tasks, &filtered, &filters, date(2025, 3, 9), 0);
        assert_eq!(narrow.upcoming.len(), 1);
    }

    #[test]
    fn test_distribution_follows_first_appearance() {
        let tasks = create_test_table();
        let filters = FilterSpec::new().hide_finished();
        let filtered = filter_tasks(&tasks, &filters);
        let dashboard = Dashboard::build(&tasks, &filtered, &filters, date(2025, 3, 10), 7);

        assert_eq!(
            dashboard.distribution,
            vec![
                ActivityCount { activity: "Plumbing".into(), count: 2 },
                ActivityCount { activity: "Electrical".into(), count: 1 },
            ]
        );
        assert_eq!(dashboard.filter_summary, "Finished: hidden");
        // Totals ignore the filter
        assert_eq!(dashboard.total_tasks, 5);
    }

    #[test]
    fn test_distribution_merges_spellings() {
        let tasks = vec![
            TaskRecord::new("Plumbing"),
            TaskRecord::new(" plumbing"),
            TaskRecord::new("Tiling"),
        ];
        let filters = FilterSpec::default();
        let filtered = filter_tasks(&tasks, &filters);
        let dashboard = Dashboard::build(&tasks, &filtered, &filters, date(2025, 3, 10), 7);

        assert_eq!(
            dashboard.distribution,
            vec![
                ActivityCount { activity: "Plumbing".into(), count: 2 },
                ActivityCount { activity: "Tiling".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_empty_table() {
        let dashboard = Dashboard::build(&[], &[], &FilterSpec::default(), date(2025, 1, 1), 7);
        assert_eq!(dashboard.completion_percent, 0.0);
        assert_eq!(dashboard.health(), Health::OnTrack);
        assert_eq!(dashboard.filter_summary, "No filters applied.");
    }

    #[test]
    fn test_health_thresholds() {
        let mut tasks: Vec<TaskRecord> = (0..10)
            .map(|_| {
                TaskRecord::new("Framing")
                    .dates(date(2025, 3, 1), date(2025, 3, 30))
                    .status(TaskStatus::InProgress)
            })
            .collect();
        let filters = FilterSpec::default();
        let today = date(2025, 3, 10);

        let health = |tasks: &[TaskRecord]| Dashboard::build(tasks, &[], &filters, today, 7).health();
        assert_eq!(health(&tasks), Health::OnTrack);

        tasks[0].status = TaskStatus::Overdue;
        tasks[1].status = TaskStatus::Overdue;
        assert_eq!(health(&tasks), Health::AtRisk);

        tasks[2].status = TaskStatus::Overdue;
        assert_eq!(health(&tasks), Health::Behind);
    }

    #[test]
    fn test_progress_bar() {
        let tasks = vec![
            TaskRecord::new("a").status(TaskStatus::FinishedOnTime),
            TaskRecord::new("b"),
        ];
        let dashboard = Dashboard::build(&tasks, &[], &FilterSpec::default(), date(2025, 1, 1), 7);
        assert_eq!(dashboard.progress_bar(10), "[#####-----] 50.0%");
    }

    #[test]
    fn test_health_display() {
        assert_eq!(Health::OnTrack.as_str(), "On Track");
        assert_eq!(format!("{}", Health::Behind), "Behind");
    }
}
