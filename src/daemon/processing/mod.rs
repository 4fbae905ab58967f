use anyhow::Result;
use module::SnapshotProcessor;
use tokio::sync::mpsc::{error::TryRecvError, Receiver};
use tracing::{debug, error, info};

use crate::tracking::store::UsageSnapshot;

pub mod local_save;
pub mod module;

/// Receives snapshots from the tracker and hands them to a [SnapshotProcessor]. Snapshots that
/// queued up while the previous one was being processed are coalesced, only the newest is kept.
/// Failures are logged and the module keeps going, the next snapshot carries everything again.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<UsageSnapshot>,
    processor: Processor,
}

impl<P: SnapshotProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<UsageSnapshot>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(mut snapshot) = self.receiver.recv().await {
            let mut skipped = 0;
            loop {
                match self.receiver.try_recv() {
                    Ok(newer) => {
                        snapshot = newer;
                        skipped += 1;
                    }
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
                }
            }
            if skipped > 0 {
                debug!("Coalesced {skipped} snapshots");
            }

            match self.processor.process_next(snapshot).await {
                Ok(_) => {
                    info!("Processed snapshot")
                }
                Err(e) => {
                    error!("Error processing snapshot: {e:?}")
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;

    use crate::tracking::store::{Sample, UsageSnapshot, UsageStore};

    use super::{module::SnapshotProcessor, ProcessingModule};

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<UsageSnapshot>>>,
        fail_first: bool,
        finalized: Arc<Mutex<bool>>,
    }

    impl SnapshotProcessor for Recorder {
        async fn process_next(&mut self, snapshot: UsageSnapshot) -> Result<()> {
            let mut seen = self.seen.lock().unwrap();
            seen.push(snapshot);
            if self.fail_first && seen.len() == 1 {
                return Err(anyhow!("disk full"));
            }
            Ok(())
        }

        async fn finalize(&mut self) -> Result<()> {
            *self.finalized.lock().unwrap() = true;
            Ok(())
        }
    }

    fn snapshot_with(app: &str) -> UsageSnapshot {
        let store = UsageStore::default();
        store.apply_sample(
            Sample {
                app: app.into(),
                executable_path: None,
                icon_reference: None,
            },
            &Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        );
        store.snapshot()
    }

    #[tokio::test]
    async fn test_queued_snapshots_are_coalesced() -> Result<()> {
        let (sender, receiver) = mpsc::channel(10);
        let recorder = Recorder::default();
        sender.send(snapshot_with("a")).await?;
        sender.send(snapshot_with("b")).await?;
        sender.send(snapshot_with("c")).await?;
        drop(sender);

        ProcessingModule::new(receiver, recorder.clone()).run().await?;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], snapshot_with("c"));
        assert!(*recorder.finalized.lock().unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_processing() -> Result<()> {
        let (sender, receiver) = mpsc::channel(10);
        let recorder = Recorder {
            fail_first: true,
            ..Default::default()
        };
        let module = ProcessingModule::new(receiver, recorder.clone());

        let (processing_result, sending_result) = tokio::join!(module.run(), async {
            sender.send(snapshot_with("a")).await?;
            while recorder.seen.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
            sender.send(snapshot_with("b")).await?;
            drop(sender);
            anyhow::Ok(())
        });
        processing_result?;
        sending_result?;

        assert_eq!(recorder.seen.lock().unwrap().len(), 2);
        Ok(())
    }
}
