use std::{
    fmt::Display,
    fs::File,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use tracing::{debug, info};

use crate::{
    daemon::storage::usage_storage::{JsonUsageStorage, UsageStorage},
    report::{self, csv::write_csv, UsageReport},
    tracking::{state::UsageState, store::UsageSnapshot},
};

use super::{output::Printer, process::daemon_running, Args};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long,
        short,
        help = "Day to report on, today by default. Examples are \"yesterday\", \"last monday\", \"15/03/2025\""
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, help = "Also write the report as CSV into this file")]
    csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum ReportKind {
    Daily,
    Weekly,
}

/// Loads stored usage. While a daemon is running its open session is folded in, so time spent in
/// the focused application up to now is counted.
pub async fn load_live_state(dir: &Path, now: &DateTime<Local>) -> Result<UsageState> {
    let storage = JsonUsageStorage::new(dir.to_path_buf())?;
    // The daemon writes the marker last, so it's read first.
    let session = if daemon_running(dir)? {
        storage.load_session().await?
    } else {
        None
    };
    let state = storage.load().await?;
    debug!("Open session {session:?}");
    Ok(UsageSnapshot::from_saved(state, session).settle(now))
}

/// Parses `date` relative to `now`. Missing dates mean today.
pub fn parse_date<Tz: TimeZone>(
    date: Option<&str>,
    date_style: DateStyle,
    now: DateTime<Tz>,
) -> Result<NaiveDate>
where
    Tz::Offset: Copy,
{
    let Some(date) = date else {
        return Ok(now.date_naive());
    };
    match parse_date_string(date, now, date_style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {date:?} {e}"),
            )
            .into()),
    }
}

pub fn build(kind: ReportKind, state: &UsageState, date: NaiveDate) -> UsageReport {
    match kind {
        ReportKind::Daily => report::daily(state, date),
        ReportKind::Weekly => report::weekly(state, date),
    }
}

/// Command to process `daily` and `weekly` commands.
pub async fn process_report_command(
    kind: ReportKind,
    ReportCommand {
        date,
        date_style,
        csv,
    }: ReportCommand,
    dir: &Path,
) -> Result<()> {
    let now = Local::now();
    let date = parse_date(date.as_deref(), date_style, now)?;
    let state = load_live_state(dir, &now).await?;
    let report = build(kind, &state, date);

    Printer::for_stdout().print_report(&mut io::stdout().lock(), &report)?;

    if let Some(path) = csv {
        export_csv(&report, &path)?;
        println!("Exported to {}", path.display());
    }
    Ok(())
}

pub fn export_csv(report: &UsageReport, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    write_csv(report, BufWriter::new(file))?;
    info!("Exported {} rows to {path:?}", report.apps.len());
    Ok(())
}

pub async fn process_live_command(dir: &Path) -> Result<()> {
    let state = load_live_state(dir, &Local::now()).await?;
    Printer::for_stdout().print_overview(&mut io::stdout().lock(), &report::overview(&state))?;
    Ok(())
}
