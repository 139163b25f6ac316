//! Subcommand implementations

use crate::config::Config;
use crate::{ExportFormat, FilterArgs, InputArgs, StatusFormat, TimelineFormat};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use sitegantt_core::status::{Dashboard, Health};
use sitegantt_core::{
    aggregate_with, filter_tasks, AggregateOptions, AggregatedSegment, Exporter, FilterSpec,
    Renderer, TaskRecord,
};
use sitegantt_parser::{load_file, load_str, Ingested, ParseError};
use sitegantt_render::{CsvExporter, ExcelExporter, MermaidRenderer, SvgRenderer, TextRenderer};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info, warn};

/// Dashboard plus its health, as emitted by `status --format json`
#[derive(Serialize)]
struct StatusReport<'a> {
    #[serde(flatten)]
    dashboard: &'a Dashboard,
    health: Health,
}

fn load(config: &Config, input: &InputArgs) -> Result<Ingested> {
    let options = config.ingest_options(input.unknown_status.as_deref(), input.status_date)?;
    debug!(file = %input.file.display(), ?options, "loading task table");

    let ingested = match input.input_format {
        Some(format) => std::fs::read_to_string(&input.file)
            .map_err(|source| ParseError::Io {
                path: input.file.clone(),
                source,
            })
            .and_then(|content| load_str(&content, format, &options)),
        None => load_file(&input.file, &options),
    }
    .with_context(|| format!("Failed to load {}", input.file.display()))?;

    for rejection in &ingested.rejections {
        warn!("rejected {}", rejection);
    }
    for warning in &ingested.warnings {
        warn!("{}", warning);
    }
    info!(
        accepted = ingested.records.len(),
        rejected = ingested.rejections.len(),
        "loaded {}",
        input.file.display()
    );
    Ok(ingested)
}

/// Flag, then config, then today
fn status_date(config: &Config, input: &InputArgs) -> NaiveDate {
    input
        .status_date
        .or(config.ingest.status_date)
        .unwrap_or_else(|| chrono::Local::now().date_naive())
}

fn write_output(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("Failed to write to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// `check`: load the table and report what was accepted
pub fn check(config: &Config, input: &InputArgs, strict: bool) -> Result<ExitCode> {
    let ingested = load(config, input)?;

    println!("Checking: {}", input.file.display());
    println!("  Rows:     {}", ingested.total_rows());
    println!("  Accepted: {}", ingested.records.len());
    println!("  Rejected: {}", ingested.rejections.len());
    println!("  Warnings: {}", ingested.warnings.len());
    for rejection in &ingested.rejections {
        println!("  ✗ {}", rejection);
    }
    for warning in &ingested.warnings {
        println!("  ! {}", warning);
    }

    if strict && !ingested.rejections.is_empty() {
        return Ok(ExitCode::FAILURE);
    }
    if ingested.is_clean() {
        println!("✓ No problems found");
    }
    Ok(ExitCode::SUCCESS)
}

/// `timeline`: filter, roll up and render
pub fn timeline(
    config: &Config,
    input: &InputArgs,
    filters: &FilterArgs,
    options: &AggregateOptions,
    format: TimelineFormat,
    title: Option<&str>,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let spec = filters.to_spec()?;
    let ingested = load(config, input)?;

    let segments = aggregate_with(&ingested.records, &spec, options);
    debug!(segments = segments.len(), filters = %spec.summary(), "aggregated");

    let title = title.map_or_else(
        || {
            input
                .file
                .file_stem()
                .map_or_else(|| "Timeline".to_string(), |s| s.to_string_lossy().into_owned())
        },
        str::to_string,
    );

    let rendered = match format {
        TimelineFormat::Text => TextRenderer.render(&title, &segments)?,
        TimelineFormat::Mermaid => MermaidRenderer::new().render(&title, &segments)?,
        TimelineFormat::Svg => {
            if segments.is_empty() {
                bail!("No dated tasks match the filters ({})", spec.summary());
            }
            SvgRenderer::new().render(&title, &segments)?
        }
        TimelineFormat::Json => {
            let mut json = serde_json::to_string_pretty(&segments)?;
            json.push('\n');
            json
        }
    };

    write_output(output, rendered.as_bytes())?;
    Ok(ExitCode::SUCCESS)
}

/// `status`: dashboard over the table and the filtered view
pub fn status(
    config: &Config,
    input: &InputArgs,
    filters: &FilterArgs,
    upcoming_days: u32,
    format: StatusFormat,
) -> Result<ExitCode> {
    let spec = filters.to_spec()?;
    let ingested = load(config, input)?;
    let status_date = status_date(config, input);

    let filtered = filter_tasks(&ingested.records, &spec);
    let dashboard = Dashboard::build(&ingested.records, &filtered, &spec, status_date, upcoming_days);

    match format {
        StatusFormat::Json => {
            let report = StatusReport {
                dashboard: &dashboard,
                health: dashboard.health(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        StatusFormat::Text => print_dashboard(&dashboard, upcoming_days),
    }
    Ok(ExitCode::SUCCESS)
}

fn print_dashboard(dashboard: &Dashboard, upcoming_days: u32) {
    println!("Site status as of {}", dashboard.status_date);
    println!("  Filters:     {}", dashboard.filter_summary);
    println!("  Health:      {}", dashboard.health());
    println!("  Completion:  {}", dashboard.progress_bar(20));
    println!("  Total:       {}", dashboard.total_tasks);
    println!("  Finished:    {}", dashboard.finished_tasks);
    println!("  In progress: {}", dashboard.in_progress_tasks);
    println!("  Not started: {}", dashboard.not_started_tasks);
    println!("  Overdue:     {}", dashboard.overdue_tasks);

    if !dashboard.overdue.is_empty() {
        println!();
        println!("Overdue tasks:");
        for task in &dashboard.overdue {
            let end = task.end_date.map(|d| d.to_string()).unwrap_or_default();
            println!("  {} / {} (due {})", task.activity, describe(task), end);
        }
    }

    println!();
    if dashboard.upcoming.is_empty() {
        println!("No starts in the next {} days", upcoming_days);
    } else {
        println!("Starting in the next {} days:", upcoming_days);
        for task in &dashboard.upcoming {
            let start = task.start_date.map(|d| d.to_string()).unwrap_or_default();
            println!("  {} {} / {}", start, task.activity, describe(task));
        }
    }

    if !dashboard.distribution.is_empty() {
        println!();
        println!("Tasks per activity:");
        for entry in &dashboard.distribution {
            println!("  {:<20} {}", entry.activity, entry.count);
        }
    }
}

fn describe(task: &TaskRecord) -> String {
    [task.task.as_deref(), task.item.as_deref(), task.room.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}

/// Timeline sheet segments, grouped and bucketed per `[timeline]`
fn export_timeline(config: &Config, tasks: &[TaskRecord], spec: &FilterSpec) -> Vec<AggregatedSegment> {
    aggregate_with(tasks, spec, &config.aggregate_options(false, None))
}

/// `export`: write the filtered table
pub fn export(
    config: &Config,
    input: &InputArgs,
    filters: &FilterArgs,
    format: ExportFormat,
    plain: bool,
    output: Option<&Path>,
) -> Result<ExitCode> {
    let spec = filters.to_spec()?;
    let ingested = load(config, input)?;
    let filtered = filter_tasks(&ingested.records, &spec);
    debug!(rows = filtered.len(), filters = %spec.summary(), "exporting");

    let bytes = match format {
        ExportFormat::Csv => CsvExporter::new().export(&filtered)?,
        ExportFormat::Xlsx => {
            if output.is_none() {
                bail!("xlsx export needs an output file (-o FILE)");
            }
            let mut exporter = ExcelExporter::new();
            if !plain {
                let dashboard = Dashboard::build(
                    &ingested.records,
                    &filtered,
                    &spec,
                    status_date(config, input),
                    config.report.upcoming_days,
                );
                exporter = exporter
                    .with_timeline(export_timeline(config, &ingested.records, &spec))
                    .with_summary(dashboard);
            }
            exporter.export(&filtered)?
        }
    };

    write_output(output, &bytes)?;
    Ok(ExitCode::SUCCESS)
}
