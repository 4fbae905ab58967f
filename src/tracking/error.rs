use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by the tracking core. Category errors are raised before any mutation happens,
/// so the store is left untouched when one is returned.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Category {0:?} doesn't exist")]
    UnknownCategory(String),

    #[error("Category {0:?} already exists")]
    DuplicateCategory(String),

    #[error("Category {0:?} can't be removed or renamed")]
    ProtectedCategory(String),

    #[error("Interval starting at {start} ends before it starts ({end})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Failed to persist usage data at {path:?}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: PersistenceErrorKind,
    },

    #[error("Couldn't resolve foreground application: {0}")]
    ResolverUnavailable(String),
}

#[derive(Debug, Error)]
pub enum PersistenceErrorKind {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl TrackingError {
    pub fn persistence(path: impl Into<PathBuf>, source: impl Into<PersistenceErrorKind>) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            source: source.into(),
        }
    }
}
