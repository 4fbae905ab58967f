use anyhow::Result;
use tracing::debug;

use crate::{daemon::storage::usage_storage::UsageStorage, tracking::store::UsageSnapshot};

use super::module::SnapshotProcessor;

/// Bridges [ProcessingModule](super::ProcessingModule) and [UsageStorage]. Remembers the last
/// snapshot so an identical one isn't written twice.
pub struct LocalSaver<S: UsageStorage> {
    storage: S,
    last_saved: Option<UsageSnapshot>,
}

impl<S: UsageStorage> LocalSaver<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            last_saved: None,
        }
    }
}

impl<S: UsageStorage> SnapshotProcessor for LocalSaver<S> {
    async fn process_next(&mut self, snapshot: UsageSnapshot) -> Result<()> {
        if self.last_saved.as_ref() == Some(&snapshot) {
            debug!("Snapshot didn't change, skipping");
            return Ok(());
        }
        self.storage.save(&snapshot).await?;
        self.last_saved = Some(snapshot);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
