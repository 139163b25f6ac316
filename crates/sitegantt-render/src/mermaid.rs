//! MermaidJS Gantt chart renderer
//!
//! Generates text-based Gantt charts in MermaidJS format, suitable for
//! embedding in Markdown site reports, GitHub, wikis, and other platforms.
//!
//! ## Example Output
//!
//! ```text
//! gantt
//!     title Riverside Flats
//!     dateFormat YYYY-MM-DD
//!
//!     section Plumbing
//!     Plumbing           :active, s1, 2025-03-03, 5d
//!
//!     section Electrical
//!     Electrical | Bath  :crit, s2, 2025-03-10, 4d
//! ```

use sitegantt_core::{AggregatedSegment, RenderError, Renderer, TaskStatus};

/// MermaidJS Gantt chart renderer
#[derive(Clone, Debug)]
pub struct MermaidRenderer {
    /// One `section` per activity
    pub show_sections: bool,
    /// Emit `crit` / `done` / `active` modifiers from the rolled-up status
    pub show_status: bool,
    /// Date format (MermaidJS format string)
    pub date_format: String,
    /// Exclude weekends from the chart
    pub exclude_weekends: bool,
}

impl Default for MermaidRenderer {
    fn default() -> Self {
        Self {
            show_sections: true,
            show_status: true,
            date_format: "YYYY-MM-DD".into(),
            exclude_weekends: false,
        }
    }
}

impl MermaidRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat task list without sections
    pub fn no_sections(mut self) -> Self {
        self.show_sections = false;
        self
    }

    /// Plain bars without status modifiers
    pub fn no_status(mut self) -> Self {
        self.show_status = false;
        self
    }

    /// Set custom date format
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Exclude weekends (use excludes directive)
    pub fn exclude_weekends(mut self) -> Self {
        self.exclude_weekends = true;
        self
    }

    /// Mermaid is sensitive to colons and a few other characters in names
    fn sanitize_name(name: &str) -> String {
        name.replace(':', "-")
            .replace(';', "-")
            .replace('#', "")
            .replace('\n', " ")
            .replace('\r', "")
    }

    fn modifiers(&self, status: TaskStatus) -> Vec<&'static str> {
        if !self.show_status {
            return Vec::new();
        }
        match status {
            TaskStatus::Overdue => vec!["crit"],
            TaskStatus::FinishedOnTime | TaskStatus::FinishedLate => vec!["done"],
            TaskStatus::InProgress => vec!["active"],
            TaskStatus::NotStarted => Vec::new(),
        }
    }

    /// `name :mods, id, start, Nd`. Mermaid durations are whole days, end inclusive.
    fn format_task_line(&self, index: usize, segment: &AggregatedSegment) -> String {
        let mut parts: Vec<String> = self
            .modifiers(segment.rolled_up_status)
            .into_iter()
            .map(str::to_string)
            .collect();
        parts.push(format!("s{}", index + 1));
        parts.push(segment.bucket_start.format("%Y-%m-%d").to_string());
        parts.push(format!("{}d", segment.duration_days()));

        format!("{} :{}", Self::sanitize_name(&segment.label()), parts.join(", "))
    }
}

impl Renderer for MermaidRenderer {
    type Output = String;

    fn render(&self, title: &str, segments: &[AggregatedSegment]) -> Result<String, RenderError> {
        let mut output = String::new();

        output.push_str("gantt\n");
        output.push_str(&format!("    title {}\n", Self::sanitize_name(title)));
        output.push_str(&format!("    dateFormat {}\n", self.date_format));
        if self.exclude_weekends {
            output.push_str("    excludes weekends\n");
        }
        output.push('\n');

        if !self.show_sections {
            for (index, segment) in segments.iter().enumerate() {
                output.push_str(&format!("    {}\n", self.format_task_line(index, segment)));
            }
            return Ok(output);
        }

        // Sections in first-appearance order of the activity
        let mut sections: Vec<(&str, Vec<(usize, &AggregatedSegment)>)> = Vec::new();
        for (index, segment) in segments.iter().enumerate() {
            match sections.iter_mut().find(|(name, _)| *name == segment.activity) {
                Some((_, members)) => members.push((index, segment)),
                None => sections.push((segment.activity.as_str(), vec![(index, segment)])),
            }
        }

        for (name, members) in sections {
            output.push_str(&format!("    section {}\n", Self::sanitize_name(name)));
            for (index, segment) in members {
                output.push_str(&format!("    {}\n", self.format_task_line(index, segment)));
            }
            output.push('\n');
        }

        Ok(output)
    }
}
