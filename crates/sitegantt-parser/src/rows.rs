//! Raw row readers
//!
//! Reads a task table into untyped [`RawRow`]s. Column headers are matched
//! loosely ("Start Date", "start_date", "START-DATE" are the same column);
//! columns that are not recognised are ignored.

use crate::ParseError;

/// Columns understood by the ingester
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Activity,
    Item,
    Task,
    Room,
    StartDate,
    EndDate,
    Status,
    OrderStatus,
    Progress,
}

impl Column {
    /// Recognise a column from its header text
    pub fn from_header(header: &str) -> Option<Self> {
        let normalized = header
            .trim()
            .trim_start_matches('\u{feff}')
            .to_lowercase()
            .replace(['_', '-'], " ");
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        let column = match normalized.as_str() {
            "activity" => Column::Activity,
            "item" => Column::Item,
            "task" | "task name" => Column::Task,
            "room" => Column::Room,
            "start date" | "start" => Column::StartDate,
            "end date" | "end" | "finish" | "finish date" => Column::EndDate,
            "status" => Column::Status,
            "order status" | "ordered" => Column::OrderStatus,
            "progress" | "progress %" | "percent complete" => Column::Progress,
            _ => return None,
        };
        Some(column)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Activity => "Activity",
            Column::Item => "Item",
            Column::Task => "Task",
            Column::Room => "Room",
            Column::StartDate => "Start Date",
            Column::EndDate => "End Date",
            Column::Status => "Status",
            Column::OrderStatus => "Order Status",
            Column::Progress => "Progress",
        }
    }
}

/// An unvalidated table row: every cell is optional text
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based data row number (header excluded)
    pub row: usize,
    pub activity: Option<String>,
    pub item: Option<String>,
    pub task: Option<String>,
    pub room: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    pub order_status: Option<String>,
    pub progress: Option<String>,
}

/// Spreadsheet placeholders for an empty cell
fn is_placeholder(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "" | "nan" | "nat" | "none" | "null"
    )
}

impl RawRow {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            ..Default::default()
        }
    }

    /// Store a cell; blanks and placeholders leave the cell empty
    pub fn set(&mut self, column: Column, value: &str) {
        let value = value.trim();
        let cell = if is_placeholder(value) {
            None
        } else {
            Some(value.to_string())
        };
        match column {
            Column::Activity => self.activity = cell,
            Column::Item => self.item = cell,
            Column::Task => self.task = cell,
            Column::Room => self.room = cell,
            Column::StartDate => self.start_date = cell,
            Column::EndDate => self.end_date = cell,
            Column::Status => self.status = cell,
            Column::OrderStatus => self.order_status = cell,
            Column::Progress => self.progress = cell,
        }
    }

    /// Builder form of [`RawRow::set`]
    pub fn with(mut self, column: Column, value: &str) -> Self {
        self.set(column, value);
        self
    }

    /// True when no recognised cell holds a value
    pub fn is_blank(&self) -> bool {
        self.activity.is_none()
            && self.item.is_none()
            && self.task.is_none()
            && self.room.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.status.is_none()
            && self.order_status.is_none()
            && self.progress.is_none()
    }
}

/// Read CSV with a header row
pub fn read_csv(input: &str) -> Result<Vec<RawRow>, ParseError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let columns: Vec<Option<Column>> = reader.headers()?.iter().map(Column::from_header).collect();
    if !columns.contains(&Some(Column::Activity)) {
        return Err(ParseError::MissingColumn(Column::Activity.as_str().to_string()));
    }

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let mut row = RawRow::new(index + 1);
        for (idx, field) in record.iter().enumerate() {
            if let Some(Some(column)) = columns.get(idx) {
                row.set(*column, field);
            }
        }
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn json_cell(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a JSON array of task objects, or an object with a `tasks` array
pub fn read_json(input: &str) -> Result<Vec<RawRow>, ParseError> {
    use serde_json::Value;

    let items = match serde_json::from_str::<Value>(input)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("tasks") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ParseError::InvalidStructure(
                    "expected a \"tasks\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ParseError::InvalidStructure(
                "expected an array of task objects".to_string(),
            ))
        }
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            return Err(ParseError::InvalidStructure(format!(
                "task {} is not an object",
                index + 1
            )));
        };
        let mut row = RawRow::new(index + 1);
        for (key, value) in map {
            if let (Some(column), Some(cell)) = (Column::from_header(key), json_cell(value)) {
                row.set(column, &cell);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn toml_cell(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(dt) => Some(dt.to_string()),
        _ => None,
    }
}

/// Read `[[task]]` tables
pub fn read_toml(input: &str) -> Result<Vec<RawRow>, ParseError> {
    let table: toml::Table = toml::from_str(input)?;

    let items = match table.get("task") {
        None => return Ok(Vec::new()),
        Some(toml::Value::Array(items)) => items,
        Some(_) => {
            return Err(ParseError::InvalidStructure(
                "\"task\" must be an array of tables ([[task]])".to_string(),
            ))
        }
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let toml::Value::Table(map) = item else {
            return Err(ParseError::InvalidStructure(format!(
                "task {} is not a table",
                index + 1
            )));
        };
        let mut row = RawRow::new(index + 1);
        for (key, value) in map {
            if let (Some(column), Some(cell)) = (Column::from_header(key), toml_cell(value)) {
                row.set(column, &cell);
            }
        }
        rows.push(row);
    }
    Ok(rows)
}
