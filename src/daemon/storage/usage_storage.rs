use std::{
    future::Future,
    ops::Deref,
    path::PathBuf,
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::{
    fs::operations::{overwrite_locked, read_locked, remove_if_exists},
    tracking::{
        error::{PersistenceErrorKind, TrackingError},
        session::Session,
        state::UsageState,
        store::UsageSnapshot,
    },
};

use super::entities::{hourly_log_entity, into_state, HourlyLogEntity, UsageTotalsEntity};

pub const TOTALS_FILE: &str = "app_usage.json";
pub const HOURLY_FILE: &str = "hourly_usage.json";
pub const SESSION_FILE: &str = "session.json";

/// Interface for abstracting where usage data lives.
pub trait UsageStorage {
    /// Loads the aggregates. Missing documents are treated as empty.
    fn load(&self) -> impl Future<Output = Result<UsageState, TrackingError>>;

    /// Writes the committed aggregates and the marker of the open session.
    fn save(&self, snapshot: &UsageSnapshot) -> impl Future<Output = Result<(), TrackingError>>;

    /// Session the daemon had open when it last saved, if any.
    fn load_session(&self) -> impl Future<Output = Result<Option<Session>, TrackingError>>;
}

impl<T: Deref> UsageStorage for T
where
    T::Target: UsageStorage,
{
    fn load(&self) -> impl Future<Output = Result<UsageState, TrackingError>> {
        self.deref().load()
    }

    fn save(&self, snapshot: &UsageSnapshot) -> impl Future<Output = Result<(), TrackingError>> {
        self.deref().save(snapshot)
    }

    fn load_session(&self) -> impl Future<Output = Result<Option<Session>, TrackingError>> {
        self.deref().load_session()
    }
}

/// The main realization of [UsageStorage]. Keeps three JSON documents in one directory:
///   - `app_usage.json` with application records and category totals,
///   - `hourly_usage.json` with the hourly log,
///   - `session.json` with the open session, present only while the daemon tracks something.
pub struct JsonUsageStorage {
    dir: PathBuf,
}

impl JsonUsageStorage {
    pub fn new(dir: PathBuf) -> Result<Self, TrackingError> {
        std::fs::create_dir_all(&dir).map_err(|e| TrackingError::persistence(&dir, e))?;
        Ok(Self { dir })
    }

    async fn read_document<D: DeserializeOwned + Default>(
        &self,
        name: &str,
    ) -> Result<D, TrackingError> {
        let path = self.dir.join(name);
        let Some(contents) = read_locked(&path)
            .await
            .map_err(|e| TrackingError::persistence(&path, e))?
        else {
            debug!("{path:?} doesn't exist yet");
            return Ok(D::default());
        };
        if contents.iter().all(u8::is_ascii_whitespace) {
            return Ok(D::default());
        }
        serde_json::from_slice(&contents).map_err(|e| TrackingError::persistence(&path, e))
    }

    async fn write_document(
        &self,
        name: &str,
        document: &impl Serialize,
        pretty: bool,
    ) -> Result<(), TrackingError> {
        let path = self.dir.join(name);
        let contents = if pretty {
            serde_json::to_vec_pretty(document)
        } else {
            serde_json::to_vec(document)
        }
        .map_err(|e| TrackingError::persistence(&path, e))?;

        overwrite_locked(&path, &contents)
            .await
            .map_err(|e| TrackingError::persistence(&path, e))
    }
}

impl UsageStorage for JsonUsageStorage {
    async fn load(&self) -> Result<UsageState, TrackingError> {
        let totals: UsageTotalsEntity = self.read_document(TOTALS_FILE).await?;
        let hourly: HourlyLogEntity = self.read_document(HOURLY_FILE).await?;

        let state = into_state(totals, hourly).map_err(|e| {
            TrackingError::persistence(self.dir.join(HOURLY_FILE), PersistenceErrorKind::Malformed(e))
        })?;
        info!(
            "Loaded {} applications and {} categories from {:?}",
            state.apps().len(),
            state.categories().len(),
            self.dir
        );
        Ok(state)
    }

    async fn save(&self, snapshot: &UsageSnapshot) -> Result<(), TrackingError> {
        self.write_document(TOTALS_FILE, &UsageTotalsEntity::from(&snapshot.state), false)
            .await?;
        self.write_document(HOURLY_FILE, &hourly_log_entity(snapshot.state.hourly()), true)
            .await?;

        // The marker goes last, readers take it before the totals.
        match &snapshot.session {
            Some(session) => self.write_document(SESSION_FILE, session, false).await,
            None => {
                let path = self.dir.join(SESSION_FILE);
                remove_if_exists(&path)
                    .await
                    .map_err(|e| TrackingError::persistence(&path, e))
            }
        }
    }

    async fn load_session(&self) -> Result<Option<Session>, TrackingError> {
        self.read_document(SESSION_FILE).await
    }
}
