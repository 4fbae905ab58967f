use anyhow::Result;

use crate::tracking::store::UsageSnapshot;

/// Represents a consumer of usage snapshots. Local storage is the only one for now, but nothing
/// here prevents sending snapshots somewhere else.
pub trait SnapshotProcessor {
    fn process_next(
        &mut self,
        snapshot: UsageSnapshot,
    ) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
