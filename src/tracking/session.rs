use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::AppId;

/// Application that currently has focus and the moment it got it. The time since `since` isn't
/// committed anywhere yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub app: AppId,
    pub since: DateTime<Utc>,
}

/// Result of feeding one sample into the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// First application observed, nothing to commit.
    Started,
    /// Same application as before. Time keeps accruing implicitly.
    Unchanged,
    /// Same application, but the clock went backwards and the session was restarted at the new
    /// instant.
    Resynchronized,
    /// Focus moved to another application. `finished` has to be committed up to `until`.
    Switched {
        finished: Session,
        until: DateTime<Utc>,
    },
}

/// Advances the session with the application sampled at `now`.
pub fn advance(current: &mut Option<Session>, app: AppId, now: DateTime<Utc>) -> Transition {
    match current {
        None => {
            *current = Some(Session { app, since: now });
            Transition::Started
        }
        Some(session) if session.app == app => {
            if now < session.since {
                session.since = now;
                Transition::Resynchronized
            } else {
                Transition::Unchanged
            }
        }
        Some(session) => {
            let finished = std::mem::replace(session, Session { app, since: now });
            Transition::Switched {
                finished,
                until: now,
            }
        }
    }
}
