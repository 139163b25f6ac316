//! Excel export of the filtered task table
//!
//! Generates an XLSX workbook for sharing site progress outside the tool:
//! - Tasks: one row per task, background coloured by status
//! - Timeline (optional): the aggregated segments
//! - Summary (optional): dashboard KPIs and tasks per activity
//!
//! ## Example Output Structure
//!
//! ```text
//! Sheet: Tasks
//! | Row | Activity | Room    | Item | Task  | Start      | End        | Status      | Order Status | Progress |
//! |-----|----------|---------|------|-------|------------|------------|-------------|--------------|----------|
//! | 1   | Plumbing | Kitchen | Sink | Drain | 2025-03-03 | 2025-03-07 | In Progress | Ordered      | 40.0     |
//!
//! Sheet: Summary
//! | SITE STATUS       |            |
//! | Status Date:      | 2025-03-10 |
//! | Total Tasks:      | 24         |
//! | Completion (%):   | 41.7       |
//! ```

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use sitegantt_core::status::Dashboard;
use sitegantt_core::{AggregatedSegment, Exporter, RenderError, TaskRecord, TaskStatus};

/// Tasks sheet columns and widths
const TASK_COLUMNS: [(&str, f64); 10] = [
    ("Row", 6.0),
    ("Activity", 18.0),
    ("Room", 14.0),
    ("Item", 16.0),
    ("Task", 30.0),
    ("Start Date", 12.0),
    ("End Date", 12.0),
    ("Status", 16.0),
    ("Order Status", 14.0),
    ("Progress", 10.0),
];

fn xlsx_error(e: XlsxError) -> RenderError {
    RenderError::Format(e.to_string())
}

fn date_text(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

/// Excel exporter
#[derive(Clone, Debug)]
pub struct ExcelExporter {
    /// Segments for the Timeline sheet (sheet omitted when `None`)
    pub timeline: Option<Vec<AggregatedSegment>>,
    /// KPIs for the Summary sheet (sheet omitted when `None`)
    pub summary: Option<Dashboard>,
    /// Freeze the header row and add an autofilter on the Tasks sheet
    pub table_tools: bool,
}

impl Default for ExcelExporter {
    fn default() -> Self {
        Self {
            timeline: None,
            summary: None,
            table_tools: true,
        }
    }
}

impl ExcelExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a Timeline sheet
    pub fn with_timeline(mut self, segments: Vec<AggregatedSegment>) -> Self {
        self.timeline = Some(segments);
        self
    }

    /// Add a Summary sheet
    pub fn with_summary(mut self, dashboard: Dashboard) -> Self {
        self.summary = Some(dashboard);
        self
    }

    /// Plain sheet without frozen header and autofilter
    pub fn no_table_tools(mut self) -> Self {
        self.table_tools = false;
        self
    }

    /// Generate Excel workbook bytes
    pub fn export_to_bytes(&self, tasks: &[&TaskRecord]) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();
        let formats = ExcelFormats::new();

        self.add_tasks_sheet(&mut workbook, tasks, &formats)?;

        if let Some(segments) = &self.timeline {
            self.add_timeline_sheet(&mut workbook, segments, &formats)?;
        }

        if let Some(dashboard) = &self.summary {
            self.add_summary_sheet(&mut workbook, dashboard, &formats)?;
        }

        workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))
    }

    fn write_headers(
        sheet: &mut Worksheet,
        headers: &[(&str, f64)],
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        for (col, (title, width)) in headers.iter().enumerate() {
            let col = col as u16;
            sheet
                .write_with_format(0, col, *title, &formats.header)
                .map_err(xlsx_error)?;
            sheet.set_column_width(col, *width).map_err(xlsx_error)?;
        }
        Ok(())
    }

    fn add_tasks_sheet(
        &self,
        workbook: &mut Workbook,
        tasks: &[&TaskRecord],
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Tasks").map_err(xlsx_error)?;

        let headers = TASK_COLUMNS;
        Self::write_headers(sheet, &headers, formats)?;

        for (i, task) in tasks.iter().enumerate() {
            let row = i as u32 + 1;
            let (text, number) = formats.for_status(task.status);

            sheet
                .write_with_format(row, 0, task.row as u32, text)
                .map_err(xlsx_error)?;
            let cells = [
                task.activity.as_str(),
                task.room.as_deref().unwrap_or(""),
                task.item.as_deref().unwrap_or(""),
                task.task.as_deref().unwrap_or(""),
            ];
            for (offset, value) in cells.iter().enumerate() {
                sheet
                    .write_with_format(row, 1 + offset as u16, *value, text)
                    .map_err(xlsx_error)?;
            }
            sheet
                .write_with_format(row, 5, date_text(task.start_date), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 6, date_text(task.end_date), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 7, task.status.as_str(), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 8, task.order_status.as_str(), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 9, task.progress, number)
                .map_err(xlsx_error)?;
        }

        if self.table_tools {
            sheet.set_freeze_panes(1, 0).map_err(xlsx_error)?;
            sheet
                .autofilter(0, 0, tasks.len() as u32, headers.len() as u16 - 1)
                .map_err(xlsx_error)?;
        }

        Ok(())
    }

    fn add_timeline_sheet(
        &self,
        workbook: &mut Workbook,
        segments: &[AggregatedSegment],
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Timeline").map_err(xlsx_error)?;

        let headers = [
            ("Activity", 18.0),
            ("Room", 14.0),
            ("Start", 12.0),
            ("End", 12.0),
            ("Days", 8.0),
            ("Status", 16.0),
            ("Tasks", 8.0),
            ("Mean Progress", 14.0),
        ];
        Self::write_headers(sheet, &headers, formats)?;

        for (i, segment) in segments.iter().enumerate() {
            let row = i as u32 + 1;
            let (text, number) = formats.for_status(segment.rolled_up_status);

            sheet
                .write_with_format(row, 0, segment.activity.as_str(), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 1, segment.room.as_deref().unwrap_or(""), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 2, segment.bucket_start.format("%Y-%m-%d").to_string(), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 3, segment.bucket_end.format("%Y-%m-%d").to_string(), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 4, segment.duration_days() as f64, &formats.integer)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 5, segment.rolled_up_status.as_str(), text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 6, segment.task_count as u32, &formats.integer)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 7, segment.mean_progress, number)
                .map_err(xlsx_error)?;
        }

        Ok(())
    }

    fn add_summary_sheet(
        &self,
        workbook: &mut Workbook,
        dashboard: &Dashboard,
        formats: &ExcelFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary").map_err(xlsx_error)?;

        sheet
            .merge_range(0, 0, 0, 1, "SITE STATUS", &formats.header)
            .map_err(xlsx_error)?;

        let rows: [(&str, SummaryValue); 9] = [
            ("Status Date:", SummaryValue::Text(dashboard.status_date.format("%Y-%m-%d").to_string())),
            ("Total Tasks:", SummaryValue::Count(dashboard.total_tasks)),
            ("Finished:", SummaryValue::Count(dashboard.finished_tasks)),
            ("In Progress:", SummaryValue::Count(dashboard.in_progress_tasks)),
            ("Not Started:", SummaryValue::Count(dashboard.not_started_tasks)),
            ("Overdue:", SummaryValue::Count(dashboard.overdue_tasks)),
            ("Completion (%):", SummaryValue::Percent(dashboard.completion_percent)),
            ("Health:", SummaryValue::Text(dashboard.health().to_string())),
            ("Filters:", SummaryValue::Text(dashboard.filter_summary.clone())),
        ];

        for (i, (label, value)) in rows.iter().enumerate() {
            let row = i as u32 + 2;
            sheet
                .write_with_format(row, 0, *label, &formats.text)
                .map_err(xlsx_error)?;
            let written = match value {
                SummaryValue::Text(text) => sheet.write_with_format(row, 1, text.as_str(), &formats.text),
                SummaryValue::Count(count) => sheet.write_with_format(row, 1, *count as u32, &formats.integer),
                SummaryValue::Percent(pct) => sheet.write_with_format(row, 1, *pct, &formats.number),
            };
            written.map_err(xlsx_error)?;
        }

        let block = rows.len() as u32 + 3;
        sheet
            .merge_range(block, 0, block, 1, "TASKS PER ACTIVITY", &formats.header)
            .map_err(xlsx_error)?;
        for (i, entry) in dashboard.distribution.iter().enumerate() {
            let row = block + 1 + i as u32;
            sheet
                .write_with_format(row, 0, entry.activity.as_str(), &formats.text)
                .map_err(xlsx_error)?;
            sheet
                .write_with_format(row, 1, entry.count as u32, &formats.integer)
                .map_err(xlsx_error)?;
        }

        sheet.set_column_width(0, 20).map_err(xlsx_error)?;
        sheet.set_column_width(1, 40).map_err(xlsx_error)?;

        Ok(())
    }
}

enum SummaryValue {
    Text(String),
    Count(usize),
    Percent(f64),
}

/// Reusable Excel formats
struct ExcelFormats {
    header: Format,
    text: Format,
    number: Format,
    integer: Format,
    // Status row tints: (text, number)
    not_started: (Format, Format),
    in_progress: (Format, Format),
    finished: (Format, Format),
    finished_late: (Format, Format),
    overdue: (Format, Format),
}

impl ExcelFormats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let text = Format::new().set_border(FormatBorder::Thin);

        let number = Format::new()
            .set_num_format("#,##0.0")
            .set_border(FormatBorder::Thin);

        let integer = Format::new()
            .set_num_format("#,##0")
            .set_border(FormatBorder::Thin);

        let tinted = |color: u32| {
            (
                Format::new()
                    .set_background_color(color)
                    .set_border(FormatBorder::Thin),
                Format::new()
                    .set_num_format("#,##0.0")
                    .set_background_color(color)
                    .set_border(FormatBorder::Thin),
            )
        };

        Self {
            header,
            text,
            number,
            integer,
            not_started: tinted(0xF2F2F2),
            in_progress: tinted(0xDDEBF7),
            finished: tinted(0xE2EFDA),
            finished_late: tinted(0xFCE4D6),
            overdue: tinted(0xF8CBAD),
        }
    }

    fn for_status(&self, status: TaskStatus) -> (&Format, &Format) {
        let (text, number) = match status {
            TaskStatus::NotStarted => &self.not_started,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::FinishedOnTime => &self.finished,
            TaskStatus::FinishedLate => &self.finished_late,
            TaskStatus::Overdue => &self.overdue,
        };
        (text, number)
    }
}

impl Exporter for ExcelExporter {
    fn export(&self, tasks: &[&TaskRecord]) -> Result<Vec<u8>, RenderError> {
        self.export_to_bytes(tasks)
    }
}
