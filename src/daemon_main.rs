// This runs daemon on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::{env::args, path::PathBuf, time::Duration};

use anyhow::Result;
use apptally::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::application_path_or_default,
        logging::{enable_logging, DAEMON_PREFIX},
        runtime::single_thread_runtime,
    },
};
use clap::Parser;

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let args = DaemonArgs::parse_from(&command_args);
    // Resolved before detaching, the daemon runs from `/`.
    let app_dir = application_path_or_default(args.dir.clone())?;

    if !args.force {
        #[cfg(feature = "win")]
        {
            let mut command_args = command_args;
            println!("Starting detached process");
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::DETACHED_PROCESS;

            command_args.push("--force".into());
            let process_name = std::env::current_exe()?;
            println!("Process {:?}", process_name);
            let mut command = std::process::Command::new(process_name);
            command.args(command_args.into_iter().skip(1));
            command.creation_flags(DETACHED_PROCESS.0);
            command.stdin(std::process::Stdio::null());
            command.stdout(std::process::Stdio::null());
            command.stderr(std::process::Stdio::null());
            #[allow(clippy::zombie_processes)]
            command.spawn()?;
            println!("Created daemon");
            return Ok(());
        }
        #[cfg(unix)]
        {
            use daemonize::Daemonize;

            let daemonize = Daemonize::new()
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent.inspect_err(|e| {
                        eprintln!("Failed to create daemon on parent side {e:?}")
                    })?;
                    println!("Created daemon");
                    return Ok(());
                }
                daemonize::Outcome::Child(_) => (),
            }
        }
    }

    run(args, app_dir)
}

fn run(args: DaemonArgs, app_dir: PathBuf) -> Result<()> {
    enable_logging(DAEMON_PREFIX, &app_dir, args.log, args.log_console)?;
    let interval = Duration::from_secs(args.interval);
    single_thread_runtime()?.block_on(async move { start_daemon(app_dir, interval).await })?;
    Ok(())
}
