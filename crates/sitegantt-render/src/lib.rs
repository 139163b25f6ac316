//! # sitegantt-render
//!
//! Output backends for sitegantt timelines and task tables.
//!
//! This crate provides:
//! - SVG Gantt chart rendering of aggregated segments
//! - MermaidJS Gantt chart rendering (for Markdown/docs)
//! - Text table output for the console
//! - Excel and CSV export of the filtered task table
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use sitegantt_core::{aggregate, FilterSpec, Renderer, TaskRecord, TaskStatus};
//! use sitegantt_render::{MermaidRenderer, SvgRenderer, TextRenderer};
//!
//! let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
//! let tasks = vec![
//!     TaskRecord::new("Plumbing").dates(d(3), d(7)).status(TaskStatus::InProgress).progress(50.0),
//!     TaskRecord::new("Electrical").dates(d(10), d(14)),
//! ];
//! let segments = aggregate(&tasks, &FilterSpec::default());
//!
//! let svg = SvgRenderer::default().render("Site", &segments).unwrap();
//! assert!(svg.contains("Plumbing"));
//!
//! let mermaid = MermaidRenderer::new().render("Site", &segments).unwrap();
//! assert!(mermaid.starts_with("gantt"));
//!
//! let text = TextRenderer.render("Site", &segments).unwrap();
//! assert!(text.contains("Electrical"));
//! ```

pub mod excel;
pub mod mermaid;
pub mod table;

pub use excel::ExcelExporter;
pub use mermaid::MermaidRenderer;
pub use table::CsvExporter;

use chrono::{Datelike, Duration, NaiveDate};
use sitegantt_core::{AggregatedSegment, Bucketing, RenderError, Renderer, TaskStatus};
use svg::node::element::{Group, Line, Rectangle, Text, Title};
use svg::Document;

/// SVG Gantt chart renderer configuration
#[derive(Clone, Debug)]
pub struct SvgRenderer {
    /// Width of the chart area (excluding labels) in pixels
    pub chart_width: u32,
    /// Height per segment row in pixels
    pub row_height: u32,
    /// Width of the label column in pixels
    pub label_width: u32,
    /// Header height in pixels
    pub header_height: u32,
    /// Padding around the chart
    pub padding: u32,
    pub not_started_color: String,
    /// In-progress bars without a progress split
    pub in_progress_color: String,
    /// Done share of a split in-progress bar
    pub completed_part_color: String,
    /// Remaining share of a split in-progress bar
    pub remaining_part_color: String,
    pub finished_color: String,
    pub finished_late_color: String,
    pub overdue_color: String,
    /// Background color
    pub background_color: String,
    /// Grid line color
    pub grid_color: String,
    /// Text color
    pub text_color: String,
    /// Font family
    pub font_family: String,
    /// Font size in pixels
    pub font_size: u32,
}

impl Default for SvgRenderer {
    fn default() -> Self {
        Self {
            chart_width: 800,
            row_height: 28,
            label_width: 200,
            header_height: 50,
            padding: 20,
            not_started_color: "#d3d3d3".into(),
            in_progress_color: "#3498db".into(),
            completed_part_color: "#00008b".into(),
            remaining_part_color: "#d3d3d3".into(),
            finished_color: "#008000".into(),
            finished_late_color: "#e67e22".into(),
            overdue_color: "#e74c3c".into(),
            background_color: "#ffffff".into(),
            grid_color: "#ecf0f1".into(),
            text_color: "#2c3e50".into(),
            font_family: "system-ui, -apple-system, sans-serif".into(),
            font_size: 12,
        }
    }
}

impl SvgRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure chart width
    pub fn chart_width(mut self, width: u32) -> Self {
        self.chart_width = width;
        self
    }

    /// Configure row height
    pub fn row_height(mut self, height: u32) -> Self {
        self.row_height = height;
        self
    }

    /// Bar color for a rolled-up status
    pub fn status_color(&self, status: TaskStatus) -> &str {
        match status {
            TaskStatus::NotStarted => &self.not_started_color,
            TaskStatus::InProgress => &self.in_progress_color,
            TaskStatus::FinishedOnTime => &self.finished_color,
            TaskStatus::FinishedLate => &self.finished_late_color,
            TaskStatus::Overdue => &self.overdue_color,
        }
    }

    fn chart_left(&self) -> f64 {
        f64::from(self.padding + self.label_width)
    }

    fn lanes_top(&self) -> u32 {
        self.padding + self.header_height
    }

    /// Month names over one cell per ISO week
    fn render_header(&self, scale: &WeekScale) -> Group {
        let mut group = Group::new().set("class", "header");
        let week_px = scale.px_per_day * 7.0;
        // Leave room for a "W52" label in every labelled cell
        let step = (40.0 / week_px).ceil().max(1.0) as usize;

        let mut previous_month = None;
        for (index, monday) in scale.weeks().enumerate() {
            let x = scale.x(monday);
            let shade = if index % 2 == 0 { "#f8f9fa" } else { "#eef1f4" };
            group = group.add(
                Rectangle::new()
                    .set("x", x)
                    .set("y", self.padding)
                    .set("width", week_px)
                    .set("height", self.header_height)
                    .set("fill", shade),
            );

            let month = (monday.year(), monday.month());
            if previous_month != Some(month) {
                group = group.add(
                    Text::new(monday.format("%B %Y").to_string())
                        .set("x", x + 4.0)
                        .set("y", self.padding + 18)
                        .set("font-family", self.font_family.as_str())
                        .set("font-size", self.font_size)
                        .set("font-weight", "bold")
                        .set("fill", self.text_color.as_str()),
                );
                previous_month = Some(month);
            }

            if index % step == 0 {
                group = group.add(
                    Text::new(format!("W{:02}", monday.iso_week().week()))
                        .set("x", x + week_px / 2.0)
                        .set("y", self.lanes_top() - 8)
                        .set("font-family", self.font_family.as_str())
                        .set("font-size", self.font_size - 1)
                        .set("fill", self.text_color.as_str())
                        .set("text-anchor", "middle"),
                );
            }
        }

        group
    }

    /// Week boundaries (darker at a month change) and lane separators
    fn render_grid(&self, scale: &WeekScale, lane_count: usize) -> Group {
        let mut group = Group::new().set("class", "grid");
        let top = self.lanes_top();
        let bottom = top + lane_count as u32 * self.row_height;

        for lane in 0..=lane_count {
            let y = top + lane as u32 * self.row_height;
            group = group.add(
                Line::new()
                    .set("class", "lane-line")
                    .set("x1", self.padding)
                    .set("y1", y)
                    .set("x2", scale.x(scale.end))
                    .set("y2", y)
                    .set("stroke", self.grid_color.as_str())
                    .set("stroke-width", 1),
            );
        }

        let boundaries = scale.weeks().chain(std::iter::once(scale.end));
        for monday in boundaries {
            let month_change = monday.day() <= 7 && monday != scale.start && monday != scale.end;
            let (stroke, opacity) = if month_change {
                (self.text_color.as_str(), 0.35)
            } else {
                (self.grid_color.as_str(), 1.0)
            };
            let x = scale.x(monday);
            group = group.add(
                Line::new()
                    .set("class", "week-line")
                    .set("x1", x)
                    .set("y1", top)
                    .set("x2", x)
                    .set("y2", bottom)
                    .set("stroke", stroke)
                    .set("stroke-opacity", opacity)
                    .set("stroke-width", 1),
            );
        }

        group
    }

    fn bar(&self, x: f64, y: u32, width: f64, height: u32, color: &str) -> Rectangle {
        Rectangle::new()
            .set("x", x)
            .set("y", y)
            .set("width", width)
            .set("height", height)
            .set("rx", 3)
            .set("ry", 3)
            .set("fill", color)
    }

    /// One bucket inside a lane. Bars cover whole days, so the end is
    /// exclusive. The visible percentage is drawn after the lane's last bar.
    fn render_segment(
        &self,
        segment: &AggregatedSegment,
        lane: usize,
        scale: &WeekScale,
        show_progress: bool,
    ) -> Group {
        let mut group = Group::new()
            .set("class", "segment")
            .set("data-status", segment.rolled_up_status.as_str())
            .add(Title::new(format!(
                "{}: {} to {}, {}, {} task(s), {:.0}%",
                segment.label(),
                segment.bucket_start,
                segment.bucket_end,
                segment.rolled_up_status,
                segment.task_count,
                segment.mean_progress
            )));

        let y = self.lanes_top() + lane as u32 * self.row_height;
        let bar_height = (f64::from(self.row_height) * 0.6) as u32;
        let bar_y = y + (self.row_height - bar_height) / 2;

        let x_start = scale.x(segment.bucket_start);
        let x_end = scale.x(segment.bucket_end.succ_opt().unwrap_or(segment.bucket_end));

        match segment.progress_split() {
            Some(split) => {
                let x_split = scale.x(split);
                if x_split > x_start {
                    group = group.add(self.bar(
                        x_start,
                        bar_y,
                        x_split - x_start,
                        bar_height,
                        &self.completed_part_color,
                    ));
                }
                group = group.add(self.bar(
                    x_split,
                    bar_y,
                    (x_end - x_split).max(1.0),
                    bar_height,
                    &self.remaining_part_color,
                ));
            }
            None => {
                let color = self.status_color(segment.rolled_up_status);
                group = group.add(self.bar(x_start, bar_y, (x_end - x_start).max(4.0), bar_height, color));
            }
        }

        if show_progress {
            group = group.add(
                Text::new(format!("{:.0}%", segment.mean_progress))
                    .set("x", x_end + 4.0)
                    .set("y", y + self.row_height / 2 + 4)
                    .set("font-family", self.font_family.as_str())
                    .set("font-size", self.font_size - 2)
                    .set("fill", self.text_color.as_str()),
            );
        }

        group
    }

    /// Label plus every bucket of one lane
    fn render_lane(&self, label: &str, members: &[&AggregatedSegment], lane: usize, scale: &WeekScale) -> Group {
        let y = self.lanes_top() + lane as u32 * self.row_height;
        let mut group = Group::new().set("class", "lane").add(
            Text::new(truncate(label, 28))
                .set("x", self.padding + 8)
                .set("y", y + self.row_height / 2 + 4)
                .set("font-family", self.font_family.as_str())
                .set("font-size", self.font_size)
                .set("fill", self.text_color.as_str()),
        );

        for (i, segment) in members.iter().enumerate() {
            let last = i + 1 == members.len();
            group = group.add(self.render_segment(segment, lane, scale, last));
        }
        group
    }

    fn render_legend(&self, y_offset: u32) -> Group {
        let mut group = Group::new().set("class", "legend");
        let x_start = self.padding as f64;
        let y = y_offset as f64 + 15.0;
        let box_size = 12.0;
        let spacing = 125.0;

        let entries = [
            ("Not Started", self.not_started_color.as_str()),
            ("In Progress", self.in_progress_color.as_str()),
            ("Completed Part", self.completed_part_color.as_str()),
            ("Finished", self.finished_color.as_str()),
            ("Finished Late", self.finished_late_color.as_str()),
            ("Overdue", self.overdue_color.as_str()),
        ];

        for (i, (name, color)) in entries.iter().enumerate() {
            let x = x_start + spacing * i as f64;
            let swatch = Rectangle::new()
                .set("x", x)
                .set("y", y - box_size + 2.0)
                .set("width", box_size)
                .set("height", box_size)
                .set("rx", 2)
                .set("fill", *color);
            group = group.add(swatch);

            let label = Text::new(*name)
                .set("x", x + box_size + 5.0)
                .set("y", y)
                .set("font-family", self.font_family.as_str())
                .set("font-size", self.font_size - 1)
                .set("fill", self.text_color.as_str());
            group = group.add(label);
        }

        group
    }
}

impl Renderer for SvgRenderer {
    type Output = String;

    fn render(&self, title: &str, segments: &[AggregatedSegment]) -> Result<String, RenderError> {
        let scale = WeekScale::fit(segments, self.chart_left(), f64::from(self.chart_width))
            .ok_or_else(|| RenderError::InvalidData("No segments to render".into()))?;
        let lanes = lanes(segments);

        let width = self.padding * 2 + self.label_width + self.chart_width;
        let legend_y = self.lanes_top() + lanes.len() as u32 * self.row_height + 10;
        let height = legend_y + 20 + self.padding;

        let mut document = Document::new()
            .set("width", width)
            .set("height", height)
            .set("viewBox", (0, 0, width, height))
            .set("xmlns", "http://www.w3.org/2000/svg")
            .add(
                Rectangle::new()
                    .set("width", "100%")
                    .set("height", "100%")
                    .set("fill", self.background_color.as_str()),
            )
            .add(
                Text::new(title)
                    .set("x", self.padding)
                    .set("y", self.padding + 15)
                    .set("font-family", self.font_family.as_str())
                    .set("font-size", self.font_size + 4)
                    .set("font-weight", "bold")
                    .set("fill", self.text_color.as_str()),
            )
            .add(self.render_header(&scale))
            .add(self.render_grid(&scale, lanes.len()));

        for (lane, (label, members)) in lanes.iter().enumerate() {
            document = document.add(self.render_lane(label, members, lane, &scale));
        }
        document = document.add(self.render_legend(legend_y));

        let mut output = Vec::new();
        svg::write(&mut output, &document)
            .map_err(|e| RenderError::Format(format!("Failed to write SVG: {}", e)))?;

        String::from_utf8(output).map_err(|e| RenderError::Format(format!("Invalid UTF-8: {}", e)))
    }
}

/// Chart time axis: whole ISO weeks from the Monday on or before the first
/// bucket to the Monday after the last one
#[derive(Clone, Copy, Debug, PartialEq)]
struct WeekScale {
    start: NaiveDate,
    /// Exclusive
    end: NaiveDate,
    /// x of `start`
    origin: f64,
    px_per_day: f64,
}

impl WeekScale {
    fn fit(segments: &[AggregatedSegment], origin: f64, width: f64) -> Option<Self> {
        let first = segments.iter().map(|s| s.bucket_start).min()?;
        let last = segments.iter().map(|s| s.bucket_end).max()?;
        let (start, _) = Bucketing::Week.bucket_of(first)?;
        let (_, sunday) = Bucketing::Week.bucket_of(last)?;
        let end = sunday.succ_opt()?;
        let days = (end - start).num_days() as f64;
        Some(Self {
            start,
            end,
            origin,
            px_per_day: width / days,
        })
    }

    /// Monday of every week on the axis
    fn weeks(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), |d| d.checked_add_signed(Duration::weeks(1)))
            .take_while(move |d| *d < end)
    }

    fn x(&self, date: NaiveDate) -> f64 {
        self.origin + (date - self.start).num_days() as f64 * self.px_per_day
    }
}

/// Segments sharing a label share a lane, in first-appearance order
fn lanes(segments: &[AggregatedSegment]) -> Vec<(String, Vec<&AggregatedSegment>)> {
    let mut lanes: Vec<(String, Vec<&AggregatedSegment>)> = Vec::new();
    for segment in segments {
        let label = segment.label();
        match lanes.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, members)) => members.push(segment),
            None => lanes.push((label, vec![segment])),
        }
    }
    lanes
}

/// Truncate a string to a maximum length with ellipsis
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Plain text table for console output
#[derive(Clone, Copy, Debug, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    type Output = String;

    fn render(&self, title: &str, segments: &[AggregatedSegment]) -> Result<String, RenderError> {
        let width = segments
            .iter()
            .map(|s| s.label().chars().count())
            .max()
            .unwrap_or(0)
            .max("Activity".len());

        let mut out = String::new();
        out.push_str(&format!("{}\n", title));
        out.push_str(&format!("{}\n", "=".repeat(title.chars().count().max(1))));
        out.push_str(&format!(
            "{:<width$}  {:<10}  {:<10}  {:<16}  {:>5}  {:>8}\n",
            "Activity",
            "Start",
            "End",
            "Status",
            "Tasks",
            "Progress",
            width = width
        ));

        for segment in segments {
            out.push_str(&format!(
                "{:<width$}  {}  {}  {:<16}  {:>5}  {:>7.1}%\n",
                segment.label(),
                segment.bucket_start,
                segment.bucket_end,
                segment.rolled_up_status.as_str(),
                segment.task_count,
                segment.mean_progress,
                width = width
            ));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn segment(activity: &str, start: NaiveDate, end: NaiveDate, status: TaskStatus, progress: f64) -> AggregatedSegment {
        AggregatedSegment {
            activity: activity.into(),
            room: None,
            bucket_start: start,
            bucket_end: end,
            rolled_up_status: status,
            task_count: 1,
            mean_progress: progress,
        }
    }

    fn create_test_segments() -> Vec<AggregatedSegment> {
        vec![
            segment("Demolition", date(2025, 3, 3), date(2025, 3, 5), TaskStatus::FinishedOnTime, 100.0),
            segment("Plumbing", date(2025, 3, 6), date(2025, 3, 16), TaskStatus::InProgress, 50.0),
            segment("Electrical", date(2025, 3, 10), date(2025, 3, 20), TaskStatus::Overdue, 10.0),
        ]
    }

    #[test]
    fn svg_renderer_creation() {
        let renderer = SvgRenderer::new();
        assert_eq!(renderer.chart_width, 800);
        assert_eq!(renderer.row_height, 28);
    }

    #[test]
    fn svg_renderer_with_config() {
        let renderer = SvgRenderer::new().chart_width(1000).row_height(40);
        assert_eq!(renderer.chart_width, 1000);
        assert_eq!(renderer.row_height, 40);
    }

    #[test]
    fn svg_render_produces_valid_svg() {
        let renderer = SvgRenderer::new();
        let svg = renderer.render("Riverside Flats", &create_test_segments()).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("</svg>"));
        assert!(svg.contains("Riverside Flats"));
        assert!(svg.contains("Demolition"));
        assert!(svg.contains("March 2025"));
    }

    #[test]
    fn svg_render_uses_status_colors() {
        let renderer = SvgRenderer::new();
        let svg = renderer.render("Site", &create_test_segments()).unwrap();

        assert!(svg.contains(&renderer.finished_color));
        assert!(svg.contains(&renderer.overdue_color));
        assert!(svg.contains("data-status=\"Overdue\""));
    }

    #[test]
    fn svg_render_splits_in_progress_bar() {
        let renderer = SvgRenderer::new();
        let segments = vec![segment("Plumbing", date(2025, 3, 1), date(2025, 3, 11), TaskStatus::InProgress, 50.0)];
        let svg = renderer.render("Site", &segments).unwrap();

        // Legend swatch plus the completed share of the bar
        assert_eq!(svg.matches(renderer.completed_part_color.as_str()).count(), 2);
        assert!(svg.contains("50%"));
    }

    #[test]
    fn svg_render_unsplit_in_progress_bar() {
        let renderer = SvgRenderer::new();
        let segments = vec![segment("Plumbing", date(2025, 3, 1), date(2025, 3, 11), TaskStatus::InProgress, 0.0)];
        let svg = renderer.render("Site", &segments).unwrap();

        assert_eq!(svg.matches(renderer.in_progress_color.as_str()).count(), 2);
        assert_eq!(svg.matches(renderer.completed_part_color.as_str()).count(), 1);
    }

    #[test]
    fn svg_render_single_day_segment() {
        let segments = vec![segment("Inspection", date(2025, 4, 1), date(2025, 4, 1), TaskStatus::NotStarted, 0.0)];
        let svg = SvgRenderer::new().render("Site", &segments).unwrap();
        assert!(svg.contains("Inspection"));
    }

    #[test]
    fn svg_render_room_labels() {
        let mut seg = segment("Tiling", date(2025, 3, 1), date(2025, 3, 4), TaskStatus::NotStarted, 0.0);
        seg.room = Some("Bathroom".into());
        let svg = SvgRenderer::new().render("Site", &[seg]).unwrap();
        assert!(svg.contains("Tiling | Bathroom"));
    }

    #[test]
    fn week_scale_snaps_to_mondays() {
        let segments = vec![segment("Plumbing", date(2025, 3, 5), date(2025, 3, 12), TaskStatus::NotStarted, 0.0)];
        let scale = WeekScale::fit(&segments, 100.0, 700.0).unwrap();

        assert_eq!(scale.start, date(2025, 3, 3));
        assert_eq!(scale.end, date(2025, 3, 17));
        assert_eq!(scale.weeks().collect::<Vec<_>>(), vec![date(2025, 3, 3), date(2025, 3, 10)]);
        assert_eq!(scale.x(date(2025, 3, 3)), 100.0);
        assert_eq!(scale.x(date(2025, 3, 10)), 450.0);
        assert_eq!(scale.x(date(2025, 3, 17)), 800.0);
    }

    #[test]
    fn svg_header_and_grid_follow_weeks() {
        // 2025-03-03 starts ISO week 10; the axis runs to 2025-03-23
        let svg = SvgRenderer::new().render("Site", &create_test_segments()).unwrap();

        assert!(svg.contains(">W10<"));
        assert!(svg.contains(">W12<"));
        assert_eq!(svg.matches("class=\"week-line\"").count(), 4);
        assert_eq!(svg.matches("class=\"lane-line\"").count(), 4);
    }

    #[test]
    fn svg_month_change_gets_its_own_label() {
        let segments = vec![segment("Roofing", date(2025, 3, 24), date(2025, 4, 9), TaskStatus::NotStarted, 0.0)];
        let svg = SvgRenderer::new().render("Site", &segments).unwrap();
        assert!(svg.contains("March 2025"));
        assert!(svg.contains("April 2025"));
    }

    #[test]
    fn svg_buckets_of_one_activity_share_a_lane() {
        let segments = vec![
            segment("Paint", date(2025, 3, 3), date(2025, 3, 9), TaskStatus::Overdue, 20.0),
            segment("Paint", date(2025, 3, 10), date(2025, 3, 16), TaskStatus::NotStarted, 0.0),
            segment("Floor", date(2025, 3, 3), date(2025, 3, 9), TaskStatus::NotStarted, 0.0),
        ];
        let svg = SvgRenderer::new().render("Weekly", &segments).unwrap();

        assert_eq!(svg.matches("class=\"lane\"").count(), 2);
        assert_eq!(svg.matches("class=\"segment\"").count(), 3);
        assert_eq!(svg.matches(">Paint<").count(), 1);
        // Every bucket carries its figures as a tooltip
        assert!(svg.contains("Paint: 2025-03-03 to 2025-03-09, Overdue, 1 task(s), 20%"));
    }

    #[test]
    fn svg_render_empty_fails() {
        let result = SvgRenderer::new().render("Empty", &[]);
        assert!(matches!(result, Err(RenderError::InvalidData(_))));
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate("Short", 20), "Short");
        assert_eq!(truncate("This is a very long task name", 15), "This is a ve...");
        assert_eq!(truncate("Küche Ölheizung Wartung", 10), "Küche Ö...");
    }

    #[test]
    fn text_renderer_table() {
        let text = TextRenderer.render("Riverside Flats", &create_test_segments()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Riverside Flats");
        assert_eq!(lines.len(), 6);
        assert!(lines[2].starts_with("Activity  "));
        assert!(lines[4].starts_with("Plumbing    2025-03-06  2025-03-16  In Progress"));
        assert!(lines[4].ends_with("50.0%"));
    }

    #[test]
    fn text_renderer_empty_is_header_only() {
        let text = TextRenderer.render("Nothing", &[]).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
