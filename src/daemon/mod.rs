use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{Local, TimeZone};
use collection::{sampler::Sampler, tracker::SessionTracker};
use processing::{local_save::LocalSaver, ProcessingModule};
use storage::usage_storage::{JsonUsageStorage, UsageStorage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    tracking::store::{UsageSnapshot, UsageStore},
    utils::clock::{Clock, SystemClock},
    window_api::{
        icons::{IconCache, IconProvider},
        ForegroundResolver, GenericResolver,
    },
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

/// How often in-flight time is committed and saved while focus doesn't move.
const CHECKPOINT_PERIOD: Duration = Duration::from_secs(60);

/// Represents the starting point for the daemon. Stored usage that can't be read stops the
/// daemon before anything is overwritten.
pub async fn start_daemon(dir: PathBuf, interval: Duration) -> Result<()> {
    std::env::set_current_dir("/")?;

    let storage = JsonUsageStorage::new(dir.clone())?;
    let state = storage
        .load()
        .await
        .inspect_err(|e| error!("Stored usage can't be read, refusing to start {e}"))?;
    if let Some(session) = storage.load_session().await? {
        warn!(
            "Previous run didn't stop cleanly, {} has been focused since {}",
            session.app, session.since
        );
    }
    let store = Arc::new(UsageStore::new(state));

    let (sender, receiver) = mpsc::channel::<UsageSnapshot>(10);
    let resolver = GenericResolver::new()?;

    let shutdown_token = CancellationToken::new();

    let tracker = create_tracker(
        sender,
        store,
        resolver,
        IconCache::new(&dir),
        &shutdown_token,
        interval,
        SystemClock,
        Local,
    );

    let processor = create_processor(storage, receiver);

    info!("Tracking every {}s into {dir:?}", interval.as_secs());
    let (_, tracking_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        async {
            let result = tracker.run().await;
            shutdown_token.cancel();
            result
        },
        processor.run(),
    );

    if let Err(tracking_result) = tracking_result {
        error!("Tracking module got an error {:?}", tracking_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn create_tracker<Tz: TimeZone>(
    sender: mpsc::Sender<UsageSnapshot>,
    store: Arc<UsageStore>,
    resolver: impl ForegroundResolver + 'static,
    icons: impl IconProvider + 'static,
    shutdown_token: &CancellationToken,
    interval: Duration,
    clock: impl Clock,
    timezone: Tz,
) -> SessionTracker<Tz> {
    let checkpoint_every = (CHECKPOINT_PERIOD.as_secs() / interval.as_secs().max(1)).max(1);
    SessionTracker::new(
        sender,
        store,
        Sampler::new(Box::new(resolver), Box::new(icons)),
        shutdown_token.clone(),
        interval,
        u32::try_from(checkpoint_every).unwrap_or(u32::MAX),
        Box::new(clock),
        timezone,
    )
}

fn create_processor<S: UsageStorage>(
    storage: S,
    receiver: mpsc::Receiver<UsageSnapshot>,
) -> ProcessingModule<LocalSaver<S>> {
    ProcessingModule::new(receiver, LocalSaver::new(storage))
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            create_processor, create_tracker,
            storage::usage_storage::{JsonUsageStorage, UsageStorage, SESSION_FILE},
        },
        report,
        tracking::{
            state::HourOfDay,
            store::{UsageSnapshot, UsageStore},
        },
        utils::{clock::TestClock, logging::TEST_LOGGING},
        window_api::{icons::NoIcons, ApplicationObservation, MockForegroundResolver},
    };

    // Five seconds before midnight, so the run crosses a day boundary.
    const TEST_START_DATE: NaiveDateTime = NaiveDateTime::new(
        NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(),
        NaiveTime::from_hms_opt(23, 59, 55).unwrap(),
    );

    fn test_items() -> Vec<ApplicationObservation> {
        ["nvim", "nvim", "firefox", "firefox", "firefox", "nvim"]
            .into_iter()
            .map(|v| ApplicationObservation {
                identifier: v.into(),
                executable_path: Some(format!("/usr/bin/{v}").into()),
            })
            .collect()
    }

    /// Runs the tracker and the processing module against a temporary directory for a bit more
    /// than 7 simulated seconds, then reads back what ended up on disk.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_daemon() -> Result<()> {
        *TEST_LOGGING;
        let mut resolver = MockForegroundResolver::new();
        let mut items = test_items().into_iter().cycle();
        resolver
            .expect_current_foreground_app()
            .returning(move || Ok(items.next().unwrap()));

        let dir = tempdir()?;
        let storage = Arc::new(JsonUsageStorage::new(dir.path().to_path_buf())?);
        let shutdown_token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel::<UsageSnapshot>(10);
        let tracker = create_tracker(
            sender,
            Arc::new(UsageStore::new(storage.load().await?)),
            resolver,
            NoIcons,
            &shutdown_token,
            Duration::from_secs(1),
            TestClock::starting_at(Utc.from_utc_datetime(&TEST_START_DATE)),
            Utc,
        );
        let processor = create_processor(storage.clone(), receiver);

        let (_, tracking_result, processing_result) = tokio::join!(
            async {
                tokio::time::sleep(Duration::from_millis(7500)).await;
                shutdown_token.cancel()
            },
            tracker.run(),
            processor.run(),
        );
        tracking_result?;
        processing_result?;

        let state = storage.load().await?;
        // nvim: 0-2s and 5-7.5s, firefox: 2-5s.
        assert_eq!(
            state.app("nvim").map(|v| v.total_time),
            Some(ChronoDuration::milliseconds(4500))
        );
        assert_eq!(
            state.app("firefox").map(|v| v.total_time),
            Some(ChronoDuration::seconds(3))
        );
        assert_eq!(
            state.app("firefox").and_then(|v| v.executable_path.clone()),
            Some("/usr/bin/firefox".into())
        );
        assert_eq!(state.app_time_sum(), state.category_time_sum());
        assert!(!dir.path().join(SESSION_FILE).exists());

        let day = TEST_START_DATE.date();
        let next_day = day.succ_opt().unwrap();
        assert_eq!(
            state.hourly().get(day, HourOfDay::new(23).unwrap(), "nvim"),
            Some(ChronoDuration::seconds(2))
        );
        assert_eq!(
            state.hourly().get(day, HourOfDay::new(23).unwrap(), "firefox"),
            Some(ChronoDuration::seconds(3))
        );
        assert_eq!(
            report::daily(&state, next_day).total(),
            ChronoDuration::milliseconds(2500)
        );

        Ok(())
    }
}
