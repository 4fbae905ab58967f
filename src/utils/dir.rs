use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

const APPLICATION_DIR: &str = "apptally";

/// Directory holding usage files, icons and logs. `$XDG_STATE_HOME/apptally` or
/// `$HOME/.local/state/apptally` on Linux, `%APPDATA%\apptally` on Windows.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = base_state_dir()?;
    path.push(APPLICATION_DIR);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

/// Resolves `dir` if it was given explicitly, the default path otherwise.
pub fn application_path_or_default(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        // The daemon changes its working directory, so relative paths are resolved up front.
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            Ok(dir.canonicalize()?)
        }
        None => create_application_default_path(),
    }
}

#[cfg(windows)]
fn base_state_dir() -> Result<PathBuf> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("APPDATA should be present on Windows"))
}

#[cfg(not(windows))]
fn base_state_dir() -> Result<PathBuf> {
    env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/state");
                path
            })
        })
        .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))
}
