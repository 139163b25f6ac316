//! CSV export of the filtered task table
//!
//! Columns match the headers the loader understands, so an export can be
//! loaded again.

use sitegantt_core::{Exporter, RenderError, TaskRecord};

const HEADERS: [&str; 9] = [
    "Activity",
    "Item",
    "Task",
    "Room",
    "Start Date",
    "End Date",
    "Status",
    "Order Status",
    "Progress",
];

/// CSV exporter
#[derive(Clone, Debug)]
pub struct CsvExporter {
    pub delimiter: u8,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field separator, e.g. `b';'` for spreadsheets in comma-decimal locales
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}

fn date_cell(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

impl Exporter for CsvExporter {
    fn export(&self, tasks: &[&TaskRecord]) -> Result<Vec<u8>, RenderError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        writer
            .write_record(HEADERS)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        for task in tasks {
            let start = date_cell(task.start_date);
            let end = date_cell(task.end_date);
            let progress = task.progress.to_string();
            writer
                .write_record([
                    task.activity.as_str(),
                    task.item.as_deref().unwrap_or(""),
                    task.task.as_deref().unwrap_or(""),
                    task.room.as_deref().unwrap_or(""),
                    start.as_str(),
                    end.as_str(),
                    task.status.as_str(),
                    task.order_status.as_str(),
                    progress.as_str(),
                ])
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        writer
            .into_inner()
            .map_err(|e| RenderError::Format(format!("Failed to flush CSV: {}", e)))
    }
}
