//! Configuration file handling.
//!
//! Settings come from `--config FILE`, else `.sitegantt.toml` in the working
//! directory when present. Command-line flags take precedence.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sitegantt_core::{AggregateOptions, Bucketing};
use sitegantt_parser::{IngestOptions, UnknownStatusPolicy};
use std::path::Path;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = ".sitegantt.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub timeline: TimelineConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Row validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// `"reject"` or the status to assume for unknown labels.
    #[serde(default = "default_unknown_status")]
    pub unknown_status: String,

    /// As-of date for overdue derivation and the dashboard (default: today).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_date: Option<NaiveDate>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            unknown_status: default_unknown_status(),
            status_date: None,
        }
    }
}

fn default_unknown_status() -> String {
    "reject".to_string()
}

/// Timeline grouping settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimelineConfig {
    #[serde(default)]
    pub group_by_room: bool,

    #[serde(default)]
    pub bucket: Bucketing,
}

/// Dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Size of the upcoming-starts window in days.
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            upcoming_days: default_upcoming_days(),
        }
    }
}

fn default_upcoming_days() -> u32 {
    7
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Explicit file, else the default location, else built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_default()?.unwrap_or_default()),
        }
    }

    /// Ingestion options, with command-line overrides applied.
    pub fn ingest_options(
        &self,
        unknown_status: Option<&str>,
        status_date: Option<NaiveDate>,
    ) -> Result<IngestOptions> {
        let label = unknown_status.unwrap_or(self.ingest.unknown_status.as_str());
        let policy = label
            .parse::<UnknownStatusPolicy>()
            .map_err(|e: String| anyhow!(e))
            .context("Invalid unknown-status policy")?;

        let mut options = IngestOptions::new().unknown_status(policy);
        if let Some(date) = status_date.or(self.ingest.status_date) {
            options = options.status_date(date);
        }
        Ok(options)
    }

    /// Aggregation options, with command-line overrides applied.
    pub fn aggregate_options(&self, group_by_room: bool, bucket: Option<Bucketing>) -> AggregateOptions {
        let mut options = AggregateOptions::new().bucket(bucket.unwrap_or(self.timeline.bucket));
        if group_by_room || self.timeline.group_by_room {
            options = options.group_by_room();
        }
        options
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitegantt_core::TaskStatus;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ingest.unknown_status, "reject");
        assert_eq!(config.ingest.status_date, None);
        assert!(!config.timeline.group_by_room);
        assert_eq!(config.timeline.bucket, Bucketing::Span);
        assert_eq!(config.report.upcoming_days, 7);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[ingest]
unknown_status = "not started"
status_date = "2025-03-01"

[timeline]
group_by_room = true
bucket = "week"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.ingest.status_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert!(config.timeline.group_by_room);
        assert_eq!(config.timeline.bucket, Bucketing::Week);
        // Missing section falls back to defaults
        assert_eq!(config.report.upcoming_days, 7);

        let options = config.ingest_options(None, None).unwrap();
        assert_eq!(
            options.unknown_status,
            UnknownStatusPolicy::Assume(TaskStatus::NotStarted)
        );
        assert_eq!(options.status_date, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        let options = config.ingest_options(Some("in progress"), Some(date)).unwrap();
        assert_eq!(
            options.unknown_status,
            UnknownStatusPolicy::Assume(TaskStatus::InProgress)
        );
        assert_eq!(options.status_date, Some(date));

        let aggregate = config.aggregate_options(true, Some(Bucketing::Day));
        assert!(aggregate.group_by_room);
        assert_eq!(aggregate.bucket, Bucketing::Day);
    }

    #[test]
    fn test_invalid_policy() {
        let mut config = Config::default();
        config.ingest.unknown_status = "shrug".into();
        assert!(config.ingest_options(None, None).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/.sitegantt.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[ingest]"));
        assert!(toml_str.contains("[timeline]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.report.upcoming_days, 7);
    }
}
