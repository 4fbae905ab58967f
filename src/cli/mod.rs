pub mod categories;
pub mod daemon_path;
pub mod output;
pub mod process;
pub mod report;

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use categories::{process_category_command, CategoryCommand};
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server};
use report::{process_live_command, process_report_command, ReportCommand, ReportKind};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::start_daemon,
    utils::{
        dir::application_path_or_default,
        logging::{enable_logging, CLI_PREFIX},
    },
};

pub(crate) const DEFAULT_INTERVAL: u64 = 1;

#[derive(Parser, Debug)]
#[command(name = "apptally", version, long_about = None)]
#[command(about = "Tracks how long each application is focused", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $XDG_STATE_HOME/apptally or $HOME/.local/state/apptally"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(long, default_value_t = DEFAULT_INTERVAL, help = "Seconds between two samples")]
        interval: u64,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(long, default_value_t = DEFAULT_INTERVAL, help = "Seconds between two samples")]
        interval: u64,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Time per application and category for one day")]
    Daily {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Time per application and category for the week, Monday to Sunday")]
    Weekly {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "All-time totals per category, including the application focused right now")]
    Live {},
    #[command(about = "Manage categories")]
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let dir = application_path_or_default(args.dir)?;
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;

    match args.commands {
        Commands::Init { interval } => {
            restart_server(&dir, interval.max(1))?;
            println!("Started daemon");
            Ok(())
        }
        Commands::Stop {} => {
            if !kill_previous_servers()? {
                println!("No daemon is running");
            }
            Ok(())
        }
        Commands::Serve { interval } => {
            start_daemon(dir, Duration::from_secs(interval.max(1))).await?;
            Ok(())
        }
        Commands::Daily { command } => process_report_command(ReportKind::Daily, command, &dir).await,
        Commands::Weekly { command } => {
            process_report_command(ReportKind::Weekly, command, &dir).await
        }
        Commands::Live {} => process_live_command(&dir).await,
        Commands::Category { command } => process_category_command(command, &dir).await,
    }
}
