//! sitegantt CLI - Construction Task Timelines
//!
//! Command-line interface for checking task tables, rolling them up into
//! timelines, reporting site status, and exporting filtered tables.

mod commands;
mod config;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sitegantt_core::{Bucketing, FilterSpec, OrderStatus, TaskStatus};
use sitegantt_parser::FileFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sitegantt")]
#[command(author, version, about = "Construction task timelines and site status", long_about = None)]
struct Cli {
    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./.sitegantt.toml if present)
    #[arg(long, value_name = "FILE", global = true, env = "SITEGANTT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Input file and the settings used while loading it
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Task table (.csv, .json or .toml)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// As-of date (YYYY-MM-DD); unfinished tasks ending earlier become overdue
    #[arg(long, value_name = "DATE")]
    pub status_date: Option<NaiveDate>,

    /// Policy for unknown status labels: "reject" or a status to assume
    #[arg(long, value_name = "POLICY")]
    pub unknown_status: Option<String>,

    /// Input format (csv, json, toml); detected from the extension if omitted
    #[arg(long, value_name = "FORMAT")]
    pub input_format: Option<FileFormat>,
}

/// Task filters shared by timeline, status and export
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Keep only these activities (repeatable, comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub activity: Vec<String>,

    /// Keep only these rooms
    #[arg(long, value_delimiter = ',')]
    pub room: Vec<String>,

    /// Keep only these items
    #[arg(long, value_delimiter = ',')]
    pub item: Vec<String>,

    /// Keep only these tasks
    #[arg(long, value_delimiter = ',')]
    pub task: Vec<String>,

    /// Keep only these statuses (e.g. "in progress", overdue)
    #[arg(long, value_delimiter = ',')]
    pub status: Vec<TaskStatus>,

    /// Keep only these order statuses ("ordered", "not ordered")
    #[arg(long, value_delimiter = ',')]
    pub order_status: Vec<OrderStatus>,

    /// Keep tasks starting on or after this date
    #[arg(long, value_name = "DATE")]
    pub from: Option<NaiveDate>,

    /// Keep tasks ending on or before this date
    #[arg(long, value_name = "DATE")]
    pub to: Option<NaiveDate>,

    /// Drop finished tasks
    #[arg(long)]
    pub hide_finished: bool,
}

impl FilterArgs {
    /// Build the filter; an open-ended range is bounded by the calendar limits
    pub fn to_spec(&self) -> Result<FilterSpec> {
        let mut spec = FilterSpec::new()
            .activities(self.activity.iter().cloned())
            .rooms(self.room.iter().cloned())
            .items(self.item.iter().cloned())
            .tasks(self.task.iter().cloned())
            .statuses(self.status.iter().copied())
            .order_statuses(self.order_status.iter().copied());

        if self.from.is_some() || self.to.is_some() {
            let from = self.from.unwrap_or(NaiveDate::MIN);
            let to = self.to.unwrap_or(NaiveDate::MAX);
            if from > to {
                anyhow::bail!("--from {} is after --to {}", from, to);
            }
            spec = spec.date_range(from, to);
        }
        if self.hide_finished {
            spec = spec.hide_finished();
        }
        Ok(spec)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TimelineFormat {
    Text,
    Json,
    Mermaid,
    Svg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a task table
    Check {
        #[command(flatten)]
        input: InputArgs,

        /// Exit with code 1 when any row is rejected
        #[arg(long)]
        strict: bool,
    },

    /// Roll tasks up into a timeline
    Timeline {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// One bar per (activity, room) instead of per activity
        #[arg(long)]
        group_by_room: bool,

        /// Calendar bucketing (span, day, week)
        #[arg(long)]
        bucket: Option<Bucketing>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: TimelineFormat,

        /// Chart title (default: input file name)
        #[arg(long)]
        title: Option<String>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Site status dashboard
    Status {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Upcoming-starts window in days
        #[arg(long)]
        upcoming_days: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: StatusFormat,
    },

    /// Export the filtered task table
    Export {
        #[command(flatten)]
        input: InputArgs,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Leave out the Timeline and Summary sheets (xlsx)
        #[arg(long)]
        plain: bool,

        /// Output file (stdout if not specified; required for xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a default configuration file
    InitConfig,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { input, strict } => commands::check(&config, &input, strict),
        Commands::Timeline {
            input,
            filters,
            group_by_room,
            bucket,
            format,
            title,
            output,
        } => {
            let options = config.aggregate_options(group_by_room, bucket);
            commands::timeline(
                &config,
                &input,
                &filters,
                &options,
                format,
                title.as_deref(),
                output.as_deref(),
            )
        }
        Commands::Status {
            input,
            filters,
            upcoming_days,
            format,
        } => {
            let upcoming_days = upcoming_days.unwrap_or(config.report.upcoming_days);
            commands::status(&config, &input, &filters, upcoming_days, format)
        }
        Commands::Export {
            input,
            filters,
            format,
            plain,
            output,
        } => commands::export(&config, &input, &filters, format, plain, output.as_deref()),
        Commands::InitConfig => {
            print!("{}", config::Config::default_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}
