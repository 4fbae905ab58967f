use std::{
    env,
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Pid, Process, Signal, System};
use tracing::info;

use crate::utils::dir::create_application_default_path;

use super::{daemon_path::to_daemon_path, DEFAULT_INTERVAL};

/// Executables a daemon can run from: the cli started with `serve`, or the standalone daemon.
struct DaemonExecutables {
    cli: PathBuf,
    daemon: PathBuf,
}

impl DaemonExecutables {
    fn current() -> Result<Self> {
        let cli = env::current_exe()?;
        Ok(Self {
            daemon: to_daemon_path(cli.clone()),
            cli,
        })
    }

    fn matches(&self, process: &Process) -> bool {
        let Some(exe) = process.exe().filter(|v| v.exists()) else {
            return false;
        };
        exe == self.daemon || (exe == self.cli && process.cmd().iter().any(|v| v == "serve"))
    }
}

fn running_daemons<'a>(system: &'a System, executables: &DaemonExecutables) -> Result<Vec<&'a Process>> {
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get own pid {e}"))?;
    Ok(system
        .processes()
        .iter()
        .filter(|(pid, _)| **pid != current_id)
        .filter(|(_, process)| !is_child_of(process, current_id))
        .filter(|(_, process)| executables.matches(process))
        .map(|(_, process)| process)
        .collect())
}

fn is_child_of(process: &Process, parent: Pid) -> bool {
    matches!(process.parent(), Some(p) if p == parent)
}

/// How a running daemon was started, read back from its command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonLaunch {
    pub dir: Option<PathBuf>,
    pub interval: u64,
}

impl DaemonLaunch {
    fn from_args(args: &[impl AsRef<OsStr>]) -> Self {
        let mut launch = Self {
            dir: None,
            interval: DEFAULT_INTERVAL,
        };
        let mut args = args.iter().map(AsRef::<OsStr>::as_ref);
        while let Some(arg) = args.next() {
            let (name, inline) = match arg.to_str().and_then(|v| v.split_once('=')) {
                Some((name, value)) => (name, Some(OsStr::new(value))),
                None => (arg.to_str().unwrap_or_default(), None),
            };
            match name {
                "--dir" => launch.dir = inline.or_else(|| args.next()).map(PathBuf::from),
                "--interval" => {
                    if let Some(interval) = inline
                        .or_else(|| args.next())
                        .and_then(OsStr::to_str)
                        .and_then(|v| v.parse().ok())
                    {
                        launch.interval = interval;
                    }
                }
                _ => {}
            }
        }
        launch
    }

    /// Whether this daemon writes into `dir`. Daemons started without `--dir` use `default_dir`.
    fn serves(&self, dir: &Path, default_dir: &Path) -> bool {
        self.dir.as_deref().unwrap_or(default_dir) == dir
    }
}

fn stop(process: &Process) {
    info!("Stopping daemon {}", process.pid());
    // This will forcefully terminate the process on Windows. Anything better will require a
    // lot more work.
    if process.kill_with(Signal::Term).is_none() {
        process.kill();
    }
    process.wait();
}

/// Daemons tracking into `dir`, with the arguments they were started with.
fn daemons_for<'a>(system: &'a System, dir: &Path) -> Result<Vec<(&'a Process, DaemonLaunch)>> {
    let default_dir = create_application_default_path()?;
    Ok(running_daemons(system, &DaemonExecutables::current()?)?
        .into_iter()
        .map(|process| (process, DaemonLaunch::from_args(process.cmd())))
        .filter(|(_, launch)| launch.serves(dir, &default_dir))
        .collect())
}

/// Whether some other process is tracking into `dir` right now.
pub fn daemon_running(dir: &Path) -> Result<bool> {
    let system = System::new_all();
    Ok(!daemons_for(&system, dir)?.is_empty())
}

/// Stops every running daemon and waits for them to exit. Returns whether any was running.
pub fn kill_previous_servers() -> Result<bool> {
    let system = System::new_all();
    let daemons = running_daemons(&system, &DaemonExecutables::current()?)?;
    for process in &daemons {
        stop(process);
    }
    Ok(!daemons.is_empty())
}

/// Stops the daemons tracking into `dir` and returns how they were launched. Daemons of other
/// directories keep running.
pub fn stop_servers_for(dir: &Path) -> Result<Vec<DaemonLaunch>> {
    let system = System::new_all();
    let daemons = daemons_for(&system, dir)?;
    Ok(daemons
        .into_iter()
        .map(|(process, launch)| {
            stop(process);
            launch
        })
        .collect())
}

/// Intended for shutting down previous server and starting new one. Currently for simplicity sake
/// it operates using a detached process. This is not great but it's not as hard to configure.
pub fn restart_server(dir: &Path, interval: u64) -> Result<()> {
    stop_servers_for(dir)?;
    spawn_server(dir, interval)
}

pub fn spawn_server(dir: &Path, interval: u64) -> Result<()> {
    // The program use executable passed into the process. It's not the best option but it will do
    // the job in most cases.
    let process_name = env::current_exe()?;
    let mut command = std::process::Command::new(process_name);
    command.arg("--dir").arg(dir);
    command.args(["serve", "--interval", &interval.to_string()]);

    #[cfg(feature = "win")]
    {
        use std::os::windows::process::CommandExt;
        use windows::Win32::System::Threading::DETACHED_PROCESS;
        command.creation_flags(DETACHED_PROCESS.0);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    info!("Spawned daemon {}", child.id());
    Ok(())
}
