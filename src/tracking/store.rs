use std::{
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::{debug, info, warn};

use super::{
    session::{advance, Session, Transition},
    state::{AppId, UsageState},
};

/// What the tracker learned about the focused application on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub app: AppId,
    pub executable_path: Option<PathBuf>,
    pub icon_reference: Option<PathBuf>,
}

/// Copy of the store taken under its lock. Reading it doesn't block the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub state: UsageState,
    pub session: Option<Session>,
}

impl UsageSnapshot {
    /// Pairs stored aggregates with a session marker read before them. When the daemon saved in
    /// between, the aggregates already hold part of the session, so it's moved up to the instant
    /// they're committed to.
    pub fn from_saved(state: UsageState, session: Option<Session>) -> Self {
        let session = session.map(|mut session| {
            if let Some(committed_until) = state.committed_until() {
                session.since = session.since.max(committed_until);
            }
            session
        });
        Self { state, session }
    }

    /// Returns the aggregates as they'd be if the open session was committed at `now`. Hours are
    /// taken from `now`'s time zone.
    pub fn settle<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> UsageState {
        let mut state = self.state.clone();
        if let Some(session) = &self.session {
            let until = now.with_timezone(&Utc);
            if session.since < until {
                state.commit_span(&session.app, session.since, until, &now.timezone());
            }
        }
        state
    }
}

pub(super) struct StoreInner {
    pub(super) state: UsageState,
    pub(super) session: Option<Session>,
}

impl StoreInner {
    /// Commits the open session up to `now` if it belongs to `app` and restarts it at `now`.
    pub(super) fn checkpoint<Tz: TimeZone>(&mut self, app: &str, now: &DateTime<Tz>) {
        let until = now.with_timezone(&Utc);
        let Some(session) = self.session.as_mut().filter(|v| &*v.app == app) else {
            return;
        };
        let committed = self
            .state
            .commit_span(&session.app, session.since, until, &now.timezone());
        debug!("Checkpointed {app} with {}s", committed.num_seconds());
        session.since = until;
    }
}

/// Shared usage state. Every method takes the lock once and never performs I/O while holding it,
/// so readers always see the three aggregates in agreement.
pub struct UsageStore {
    inner: Mutex<StoreInner>,
}

impl Default for UsageStore {
    fn default() -> Self {
        Self::new(UsageState::new())
    }
}

impl UsageStore {
    pub fn new(state: UsageState) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                state,
                session: None,
            }),
        }
    }

    pub(super) fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Mutations can't panic halfway through, so a poisoned lock still guards consistent data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        let inner = self.lock();
        UsageSnapshot {
            state: inner.state.clone(),
            session: inner.session.clone(),
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    /// Totals including the open session up to `now`.
    pub fn live_totals<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> UsageState {
        self.snapshot().settle(now)
    }

    /// Feeds a sample into the session state machine. A finished session is committed, split by
    /// the hours of `now`'s time zone.
    pub fn apply_sample<Tz: TimeZone>(&self, sample: Sample, now: &DateTime<Tz>) -> Transition {
        let timezone = now.timezone();
        let now = now.with_timezone(&Utc);
        let mut inner = self.lock();
        let StoreInner { state, session } = &mut *inner;

        let transition = advance(session, sample.app.clone(), now);
        match &transition {
            Transition::Unchanged => {}
            Transition::Resynchronized => {
                warn!("Clock went backwards while {} was focused", sample.app);
            }
            Transition::Started => {
                info!("Started tracking {}", sample.app);
            }
            Transition::Switched { finished, until } => {
                let committed =
                    state.commit_span(&finished.app, finished.since, *until, &timezone);
                info!(
                    "Switched from {} to {} after {}s",
                    finished.app,
                    sample.app,
                    committed.num_seconds()
                );
            }
        }

        if matches!(
            transition,
            Transition::Started | Transition::Switched { .. }
        ) {
            let record = state.get_or_create_app(&sample.app);
            if sample.executable_path.is_some() {
                record.executable_path = sample.executable_path;
            }
            if record.icon_reference.is_none() {
                record.icon_reference = sample.icon_reference;
            }
        }
        transition
    }

    /// Whether the icon of `app` still has to be looked up.
    pub fn needs_icon(&self, app: &str) -> bool {
        self.lock()
            .state
            .app(app)
            .is_none_or(|v| v.icon_reference.is_none())
    }

    /// Commits the open session up to `now` and keeps tracking the same application from `now`.
    pub fn checkpoint_session<Tz: TimeZone>(&self, now: &DateTime<Tz>) {
        let mut inner = self.lock();
        let Some(app) = inner.session.as_ref().map(|v| v.app.clone()) else {
            return;
        };
        inner.checkpoint(&app, now);
    }

    /// Commits the open session up to `now` and stops tracking. Returns the committed time when a
    /// session was open.
    pub fn flush_session<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<Duration> {
        let mut inner = self.lock();
        let StoreInner { state, session } = &mut *inner;

        let finished = session.take()?;
        Some(state.commit_span(
            &finished.app,
            finished.since,
            now.with_timezone(&Utc),
            &now.timezone(),
        ))
    }
}
