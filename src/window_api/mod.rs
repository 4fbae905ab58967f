//! Contains logic for finding the focused application in different environments.
//! [GenericResolver] is the main artifact of this module that abstracts the operations.
//! [icons] holds the icon provider contract, which is purely decorative.

pub mod icons;
#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;

/// Identifier used when the focused application can't be determined.
pub const UNKNOWN_APPLICATION: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationObservation {
    /// Short executable name. For example 'nvim' or 'chrome.exe'.
    pub identifier: Arc<str>,
    /// Full path to the executable. For example /usr/bin/nvim
    pub executable_path: Option<PathBuf>,
}

impl ApplicationObservation {
    /// Takes the identifier from the file name of `executable_path`.
    pub fn from_executable(executable_path: PathBuf) -> Self {
        let identifier = identifier_from_path(&executable_path);
        Self {
            identifier,
            executable_path: Some(executable_path),
        }
    }

    pub fn unknown() -> Self {
        Self {
            identifier: UNKNOWN_APPLICATION.into(),
            executable_path: None,
        }
    }
}

fn identifier_from_path(path: &Path) -> Arc<str> {
    path.file_name()
        .map(|v| v.to_string_lossy())
        .filter(|v| !v.is_empty())
        .map_or_else(|| UNKNOWN_APPLICATION.into(), |v| v.as_ref().into())
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait ForegroundResolver {
    fn current_foreground_app(&mut self) -> Result<ApplicationObservation>;
}

/// Serves as a cross-compatible ForegroundResolver implementation.
pub struct GenericResolver {
    inner: Box<dyn ForegroundResolver>,
}

impl GenericResolver {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsResolver;
                Ok(Self {
                    inner: Box::new(WindowsResolver::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxResolver;
                Ok(Self {
                    inner: Box::new(LinuxResolver::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No foreground resolver was compiled in, enable the `x11` or `win` feature"
                ))
            }
        }
    }
}

impl ForegroundResolver for GenericResolver {
    fn current_foreground_app(&mut self) -> Result<ApplicationObservation> {
        self.inner.current_foreground_app()
    }
}
