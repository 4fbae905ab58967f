use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    tracking::{
        session::Transition,
        store::{UsageSnapshot, UsageStore},
    },
    utils::clock::Clock,
};

use super::sampler::Sampler;

/// Runs the sample-and-commit loop. Every tick the focused application is fed into the store. A
/// snapshot is sent for persistence whenever focus moves and every `checkpoint_every` ticks, when
/// the in-flight time is committed as well. Hours are taken from `timezone`.
pub struct SessionTracker<Tz: TimeZone> {
    next: mpsc::Sender<UsageSnapshot>,
    store: Arc<UsageStore>,
    sampler: Sampler,
    shutdown: CancellationToken,
    interval: Duration,
    checkpoint_every: u32,
    clock: Box<dyn Clock>,
    timezone: Tz,
}

impl<Tz: TimeZone> SessionTracker<Tz> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        next: mpsc::Sender<UsageSnapshot>,
        store: Arc<UsageStore>,
        sampler: Sampler,
        shutdown: CancellationToken,
        interval: Duration,
        checkpoint_every: u32,
        clock: Box<dyn Clock>,
        timezone: Tz,
    ) -> Self {
        Self {
            next,
            store,
            sampler,
            shutdown,
            interval,
            checkpoint_every: checkpoint_every.max(1),
            clock,
            timezone,
        }
    }

    fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.timezone)
    }

    async fn send_snapshot(&self) -> Result<()> {
        let span = info_span!("Sending snapshot");
        self.next
            .send(self.store.snapshot())
            .instrument(span)
            .await
            .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        Ok(())
    }

    /// Executes the tracker event loop. On cancellation the open session is committed and a last
    /// snapshot is sent before returning.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.clock.instant();
        let mut ticks = 0u32;
        loop {
            collection_point += self.interval;
            ticks = ticks.wrapping_add(1);

            let sample = self.sampler.sample(&self.store);
            let now = self.now();
            let mut changed = matches!(
                self.store.apply_sample(sample, &now),
                Transition::Started | Transition::Switched { .. }
            );
            if ticks % self.checkpoint_every == 0 {
                debug!("Checkpointing open session");
                self.store.checkpoint_session(&now);
                changed = true;
            }
            if changed {
                self.send_snapshot().await?;
            }

            tokio::select! {
                // Cancelation means we stop execution of the event loop. Once the tracker is
                // dropped the sender is dropped too, which stops the processing module.
                _ = self.shutdown.cancelled() => {
                    break
                }
                _ = self.clock.sleep_until(collection_point) => ()
            }
        }

        if let Some(committed) = self.store.flush_session(&self.now()) {
            info!("Flushed {}s of the open session", committed.num_seconds());
        }
        self.send_snapshot().await
    }
}
