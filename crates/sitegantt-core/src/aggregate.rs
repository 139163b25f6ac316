//! Task aggregation for the timeline view
//!
//! Turns a flat task table into one rolled-up segment per activity (or per
//! activity and room, or per calendar bucket), ready to be drawn as a bar.
//!
//! Output order is the order in which each group first appears in the input,
//! so repeated runs over the same table always produce the same chart.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::{normalize_label, AggregateOptions, AggregatedSegment, FilterSpec, TaskRecord, TaskStatus};

/// Filter the task table.
///
/// Unlike [`aggregate`], undated records are kept unless a date range is
/// supplied. An invalid filter yields no tasks.
pub fn filter_tasks<'a>(tasks: &'a [TaskRecord], filters: &FilterSpec) -> Vec<&'a TaskRecord> {
    if !filters.is_valid() {
        return Vec::new();
    }
    tasks.iter().filter(|t| filters.matches(t)).collect()
}

/// Roll tasks up into one segment per activity.
///
/// Records without a valid date span are dropped. An invalid filter (inverted
/// date range) yields an empty result.
pub fn aggregate(tasks: &[TaskRecord], filters: &FilterSpec) -> Vec<AggregatedSegment> {
    aggregate_with(tasks, filters, &AggregateOptions::default())
}

/// Roll tasks up using explicit grouping and bucketing options
pub fn aggregate_with(
    tasks: &[TaskRecord],
    filters: &FilterSpec,
    options: &AggregateOptions,
) -> Vec<AggregatedSegment> {
    if !filters.is_valid() {
        return Vec::new();
    }

    // lane = (activity, room) row of the chart, numbered by first appearance.
    // Keys are trimmed and lowercased like filter labels; the first spelling
    // seen is the one displayed.
    let mut lanes: HashMap<(String, Option<String>), usize> = HashMap::new();
    let mut slots: HashMap<(usize, Option<NaiveDate>), usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for task in tasks {
        let Some((start, end)) = task.span() else {
            continue;
        };
        if !filters.matches(task) {
            continue;
        }

        let room = if options.group_by_room {
            task.room.clone()
        } else {
            None
        };
        let key = (
            normalize_label(&task.activity),
            room.as_deref().map(normalize_label),
        );
        let next_lane = lanes.len();
        let lane = *lanes.entry(key).or_insert(next_lane);

        let bucket = options.bucket.bucket_of(start);
        let slot = *slots.entry((lane, bucket.map(|(s, _)| s))).or_insert_with(|| {
            groups.push(Group::new(lane, task.activity.clone(), room, bucket));
            groups.len() - 1
        });

        groups[slot].add(start, end, task.status, task.progress);
    }

    // Stable: span bucketing keeps first-appearance order untouched
    groups.sort_by_key(|g| (g.lane, g.bucket.map(|(s, _)| s)));

    groups.into_iter().map(Group::finish).collect()
}

/// Accumulator for one output segment
struct Group {
    lane: usize,
    activity: String,
    room: Option<String>,
    bucket: Option<(NaiveDate, NaiveDate)>,
    min_start: NaiveDate,
    max_end: NaiveDate,
    status: Option<TaskStatus>,
    count: usize,
    progress_sum: f64,
}

impl Group {
    fn new(
        lane: usize,
        activity: String,
        room: Option<String>,
        bucket: Option<(NaiveDate, NaiveDate)>,
    ) -> Self {
        Self {
            lane,
            activity,
            room,
            bucket,
            min_start: NaiveDate::MAX,
            max_end: NaiveDate::MIN,
            status: None,
            count: 0,
            progress_sum: 0.0,
        }
    }

    fn add(&mut self, start: NaiveDate, end: NaiveDate, status: TaskStatus, progress: f64) {
        self.min_start = self.min_start.min(start);
        self.max_end = self.max_end.max(end);
        self.status = Some(match self.status {
            Some(current) if current.rollup_rank() >= status.rollup_rank() => current,
            _ => status,
        });
        self.count += 1;
        self.progress_sum += progress;
    }

    fn finish(self) -> AggregatedSegment {
        let (bucket_start, bucket_end) = self.bucket.unwrap_or((self.min_start, self.max_end));
        AggregatedSegment {
            activity: self.activity,
            room: self.room,
            bucket_start,
            bucket_end,
            rolled_up_status: self.status.unwrap_or_default(),
            task_count: self.count,
            mean_progress: self.progress_sum / self.count as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bucketing;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn task(activity: &str, start: (u32, u32), end: (u32, u32), status: TaskStatus) -> TaskRecord {
        TaskRecord::new(activity)
            .dates(date(2025, start.0, start.1), date(2025, end.0, end.1))
            .status(status)
    }

    /// Deterministic mixed table: several activities, rooms, statuses and a
    /// few undated or inverted rows.
    fn sample_tables() -> Vec<Vec<TaskRecord>> {
        let activities = ["Demolition", "Plumbing", "Electrical", "Tiling"];
        let rooms = ["Kitchen", "Bath", "Hall"];
        let mut tables = Vec::new();

        let mut seed: u64 = 42;
        let mut next = move |m: u64| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 33) % m
        };

        for size in [1usize, 5, 17, 40] {
            let mut table = Vec::new();
            for row in 0..size {
                let activity = activities[next(4) as usize];
                let status = TaskStatus::ALL[next(5) as usize];
                let start = date(2025, 1, 1) + chrono::Duration::days(next(60) as i64);
                let end = start + chrono::Duration::days(next(20) as i64);
                let mut record = TaskRecord::new(activity)
                    .room(rooms[next(3) as usize])
                    .dates(start, end)
                    .status(status)
                    .progress(next(101) as f64)
                    .at_row(row + 1);
                match next(10) {
                    0 => record.end_date = None,
                    1 => record.start_date = None,
                    2 => record.end_date = Some(start - chrono::Duration::days(1)),
                    _ => {}
                }
                table.push(record);
            }
            tables.push(table);
        }
        tables
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(aggregate(&[], &FilterSpec::default()), Vec::new());
    }

    #[test]
    fn task_count_conserved_without_filters() {
        for table in sample_tables() {
            let valid = table.iter().filter(|t| t.span().is_some()).count();
            let segments = aggregate(&table, &FilterSpec::default());
            let total: usize = segments.iter().map(|s| s.task_count).sum();
            assert_eq!(total, valid);
        }
    }

    #[test]
    fn bucket_bounds_are_ordered() {
        for table in sample_tables() {
            for bucket in [Bucketing::Span, Bucketing::Day, Bucketing::Week] {
                let options = AggregateOptions::new().bucket(bucket);
                for seg in aggregate_with(&table, &FilterSpec::default(), &options) {
                    assert!(seg.bucket_start <= seg.bucket_end, "{:?}", seg);
                }
            }
        }
    }

    #[test]
    fn status_filter_conserves_matching_tasks() {
        for table in sample_tables() {
            for status in TaskStatus::ALL {
                let filters = FilterSpec::new().statuses([status]);
                let segments = aggregate(&table, &filters);

                let reference = table
                    .iter()
                    .filter(|t| t.span().is_some() && t.status == status)
                    .count();
                let total: usize = segments.iter().map(|s| s.task_count).sum();
                assert_eq!(total, reference);
                // A group built only from tasks with one status rolls up to it
                assert!(segments.iter().all(|s| s.rolled_up_status == status));
            }
        }
    }

    #[test]
    fn multi_status_filter_conserves_matching_tasks() {
        let wanted = [TaskStatus::InProgress, TaskStatus::Overdue];
        for table in sample_tables() {
            let filters = FilterSpec::new().statuses(wanted);
            let segments = aggregate(&table, &filters);

            let reference = table
                .iter()
                .filter(|t| t.span().is_some() && wanted.contains(&t.status))
                .count();
            let total: usize = segments.iter().map(|s| s.task_count).sum();
            assert_eq!(total, reference);
            assert!(segments.iter().all(|s| wanted.contains(&s.rolled_up_status)));
        }
    }

    #[test]
    fn finished_statuses_never_roll_up_to_open_ones() {
        let wanted = [TaskStatus::FinishedOnTime, TaskStatus::FinishedLate];
        for table in sample_tables() {
            let segments = aggregate(&table, &FilterSpec::new().statuses(wanted));
            let reference = table
                .iter()
                .filter(|t| t.span().is_some() && t.status.is_finished())
                .count();
            let total: usize = segments.iter().map(|s| s.task_count).sum();
            assert_eq!(total, reference);
            assert!(segments.iter().all(|s| s.rolled_up_status.is_finished()));
        }
    }

    #[test]
    fn aggregation_is_idempotent() {
        for table in sample_tables() {
            let filters = FilterSpec::new().rooms(["kitchen", "bath"]);
            assert_eq!(aggregate(&table, &filters), aggregate(&table, &filters));
        }
    }

    #[test]
    fn at_most_one_segment_per_activity() {
        for table in sample_tables() {
            let segments = aggregate(&table, &FilterSpec::default());
            let mut seen = std::collections::HashSet::new();
            for seg in &segments {
                assert!(seen.insert(seg.activity.clone()), "duplicate {}", seg.activity);
            }
        }
    }

    #[test]
    fn overdue_beats_finished_on_time() {
        let tasks = vec![
            task("Roofing", (1, 1), (1, 5), TaskStatus::FinishedOnTime),
            task("Roofing", (1, 3), (1, 9), TaskStatus::Overdue),
        ];
        let segments = aggregate(&tasks, &FilterSpec::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].rolled_up_status, TaskStatus::Overdue);
        assert_eq!(segments[0].bucket_start, date(2025, 1, 1));
        assert_eq!(segments[0].bucket_end, date(2025, 1, 9));
        assert_eq!(segments[0].task_count, 2);
    }

    #[test]
    fn full_priority_chain() {
        let chain = [
            (TaskStatus::FinishedOnTime, TaskStatus::FinishedOnTime),
            (TaskStatus::NotStarted, TaskStatus::NotStarted),
            (TaskStatus::FinishedLate, TaskStatus::FinishedLate),
            (TaskStatus::InProgress, TaskStatus::InProgress),
            (TaskStatus::Overdue, TaskStatus::Overdue),
        ];
        let mut tasks = Vec::new();
        for (added, expected) in chain {
            tasks.push(task("Framing", (2, 1), (2, 3), added));
            let segments = aggregate(&tasks, &FilterSpec::default());
            assert_eq!(segments[0].rolled_up_status, expected);
        }
    }

    #[test]
    fn missing_end_date_is_dropped() {
        let mut undated = task("Paint", (3, 1), (3, 4), TaskStatus::InProgress);
        undated.end_date = None;
        let tasks = vec![
            task("Paint", (3, 2), (3, 6), TaskStatus::NotStarted),
            undated,
        ];
        let segments = aggregate(&tasks, &FilterSpec::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].task_count, 1);
        assert_eq!(segments[0].rolled_up_status, TaskStatus::NotStarted);
    }

    #[test]
    fn output_follows_first_appearance() {
        let tasks = vec![
            task("B", (1, 1), (1, 2), TaskStatus::NotStarted),
            task("A", (1, 1), (1, 2), TaskStatus::NotStarted),
            task("B", (1, 3), (1, 4), TaskStatus::NotStarted),
        ];
        let order: Vec<String> = aggregate(&tasks, &FilterSpec::default())
            .into_iter()
            .map(|s| s.activity)
            .collect();
        assert_eq!(order, vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn inverted_date_range_yields_nothing() {
        let tasks = vec![task("A", (1, 1), (1, 2), TaskStatus::NotStarted)];
        let filters = FilterSpec::new().date_range(date(2025, 6, 1), date(2025, 1, 1));
        assert!(aggregate(&tasks, &filters).is_empty());
        assert!(filter_tasks(&tasks, &filters).is_empty());
    }

    #[test]
    fn date_range_keeps_contained_tasks_only() {
        let tasks = vec![
            task("A", (1, 5), (1, 10), TaskStatus::NotStarted),
            task("A", (1, 25), (2, 3), TaskStatus::Overdue),
        ];
        let filters = FilterSpec::new().date_range(date(2025, 1, 1), date(2025, 1, 31));
        let segments = aggregate(&tasks, &filters);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].task_count, 1);
        assert_eq!(segments[0].rolled_up_status, TaskStatus::NotStarted);
    }

    #[test]
    fn mean_progress_is_averaged() {
        let tasks = vec![
            task("A", (1, 1), (1, 2), TaskStatus::InProgress).progress(20.0),
            task("A", (1, 1), (1, 2), TaskStatus::InProgress).progress(60.0),
        ];
        let segments = aggregate(&tasks, &FilterSpec::default());
        assert_eq!(segments[0].mean_progress, 40.0);
    }

    #[test]
    fn group_by_room_splits_lanes() {
        let tasks = vec![
            task("Tiling", (1, 1), (1, 2), TaskStatus::NotStarted).room("Bath"),
            task("Tiling", (1, 3), (1, 6), TaskStatus::InProgress).room("Kitchen"),
            task("Tiling", (1, 2), (1, 4), TaskStatus::FinishedOnTime).room("Bath"),
        ];
        let options = AggregateOptions::new().group_by_room();
        let segments = aggregate_with(&tasks, &FilterSpec::default(), &options);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].label(), "Tiling | Bath");
        assert_eq!(segments[0].task_count, 2);
        assert_eq!(segments[0].bucket_end, date(2025, 1, 4));
        assert_eq!(segments[1].label(), "Tiling | Kitchen");
        assert_eq!(segments[1].rolled_up_status, TaskStatus::InProgress);
    }

    #[test]
    fn lanes_ignore_case_and_padding() {
        let tasks = vec![
            task("Tiling", (1, 1), (1, 2), TaskStatus::NotStarted).room("Kitchen"),
            task("tiling ", (1, 3), (1, 6), TaskStatus::InProgress).room(" kitchen"),
            task("TILING", (1, 2), (1, 4), TaskStatus::FinishedOnTime).room("Bath"),
        ];

        let by_activity = aggregate(&tasks, &FilterSpec::default());
        assert_eq!(by_activity.len(), 1);
        assert_eq!(by_activity[0].activity, "Tiling");
        assert_eq!(by_activity[0].task_count, 3);

        let options = AggregateOptions::new().group_by_room();
        let by_room = aggregate_with(&tasks, &FilterSpec::default(), &options);
        assert_eq!(by_room.len(), 2);
        assert_eq!(by_room[0].label(), "Tiling | Kitchen");
        assert_eq!(by_room[0].task_count, 2);
        assert_eq!(by_room[0].rolled_up_status, TaskStatus::InProgress);
        assert_eq!(by_room[1].label(), "TILING | Bath");
    }

    #[test]
    fn week_buckets_use_calendar_bounds_and_order() {
        // 2025-01-06 and 2025-01-13 are Mondays
        let tasks = vec![
            task("Paint", (1, 15), (1, 17), TaskStatus::NotStarted),
            task("Floor", (1, 7), (1, 8), TaskStatus::NotStarted),
            task("Paint", (1, 8), (1, 20), TaskStatus::Overdue),
            task("Paint", (1, 16), (1, 16), TaskStatus::InProgress),
        ];
        let options = AggregateOptions::new().bucket(Bucketing::Week);
        let segments = aggregate_with(&tasks, &FilterSpec::default(), &options);

        let summary: Vec<(String, NaiveDate, NaiveDate, usize, TaskStatus)> = segments
            .iter()
            .map(|s| {
                (
                    s.activity.clone(),
                    s.bucket_start,
                    s.bucket_end,
                    s.task_count,
                    s.rolled_up_status,
                )
            })
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Paint".into(), date(2025, 1, 6), date(2025, 1, 12), 1, TaskStatus::Overdue),
                ("Paint".into(), date(2025, 1, 13), date(2025, 1, 19), 2, TaskStatus::InProgress),
                ("Floor".into(), date(2025, 1, 6), date(2025, 1, 12), 1, TaskStatus::NotStarted),
            ]
        );
    }

    #[test]
    fn filter_tasks_keeps_undated_without_range() {
        let mut undated = TaskRecord::new("A");
        undated.status = TaskStatus::InProgress;
        let tasks = vec![undated, task("B", (1, 1), (1, 2), TaskStatus::InProgress)];

        assert_eq!(filter_tasks(&tasks, &FilterSpec::default()).len(), 2);
        let ranged = FilterSpec::new().date_range(date(2025, 1, 1), date(2025, 12, 31));
        assert_eq!(filter_tasks(&tasks, &ranged).len(), 1);
    }
}
