use std::{
    collections::{btree_map, BTreeMap},
    fmt::Display,
    path::PathBuf,
    str::FromStr,
    sync::Arc,
};

use chrono::{DateTime, Duration, NaiveDate, SubsecRound, TimeZone, Timelike, Utc};
use tracing::{debug, warn};

use super::{error::TrackingError, splitter::split};

/// Category every application belongs to until it's assigned elsewhere. It can't be removed.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Short process name of an application, e.g. `chrome.exe` or `nvim`.
pub type AppId = Arc<str>;

/// Hour bucket of a calendar day, 0 to 23. Persisted as `HH:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HourOfDay(u8);

impl HourOfDay {
    pub fn new(hour: u32) -> Option<Self> {
        (hour < 24).then_some(Self(hour as u8))
    }

    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self(instant.hour() as u8)
    }

    pub fn get(self) -> u32 {
        self.0 as u32
    }
}

impl Display for HourOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:00", self.0)
    }
}

impl FromStr for HourOfDay {
    type Err = String;

    /// Accepts both `HH:00` and the older bare `HH` keys.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hour = s.strip_suffix(":00").unwrap_or(s);
        if hour.len() != 2 {
            return Err(format!("Illegal hour key {s:?}"));
        }
        hour.parse::<u32>()
            .ok()
            .and_then(HourOfDay::new)
            .ok_or_else(|| format!("Illegal hour key {s:?}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppRecord {
    pub total_time: Duration,
    pub category: String,
    pub executable_path: Option<PathBuf>,
    /// Opaque reference handed out by an icon provider. Never used for aggregation.
    pub icon_reference: Option<PathBuf>,
}

impl Default for AppRecord {
    fn default() -> Self {
        Self {
            total_time: Duration::zero(),
            category: UNCATEGORIZED.into(),
            executable_path: None,
            icon_reference: None,
        }
    }
}

pub type HourBuckets = BTreeMap<HourOfDay, BTreeMap<AppId, Duration>>;

/// Time spent per application, bucketed by date and hour of day. Categories aren't stored here,
/// they're resolved from [AppRecord] whenever the log is read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HourlyLog {
    days: BTreeMap<NaiveDate, HourBuckets>,
}

impl HourlyLog {
    /// Adds `duration` to the bucket, creating the date, hour and app entries when missing.
    pub fn add(&mut self, date: NaiveDate, hour: HourOfDay, app: &AppId, duration: Duration) {
        *self
            .days
            .entry(date)
            .or_default()
            .entry(hour)
            .or_default()
            .entry(app.clone())
            .or_insert_with(Duration::zero) += duration;
    }

    pub fn day(&self, date: NaiveDate) -> Option<&HourBuckets> {
        self.days.get(&date)
    }

    pub fn get(&self, date: NaiveDate, hour: HourOfDay, app: &str) -> Option<Duration> {
        self.days.get(&date)?.get(&hour)?.get(app).copied()
    }

    pub fn days(&self) -> btree_map::Iter<'_, NaiveDate, HourBuckets> {
        self.days.iter()
    }

    /// Sum of everything logged for `app` across all days.
    pub fn app_total(&self, app: &str) -> Duration {
        self.days
            .values()
            .flat_map(|hours| hours.values())
            .filter_map(|apps| apps.get(app))
            .fold(Duration::zero(), |acc, v| acc + *v)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// The three aggregates kept by the tracker. All methods keep the category totals equal to the
/// sum of the app totals.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageState {
    pub(super) apps: BTreeMap<AppId, AppRecord>,
    pub(super) categories: BTreeMap<String, Duration>,
    pub(super) hourly: HourlyLog,
    pub(super) committed_until: Option<DateTime<Utc>>,
}

impl Default for UsageState {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageState {
    pub fn new() -> Self {
        Self {
            apps: BTreeMap::new(),
            categories: BTreeMap::from([(UNCATEGORIZED.to_string(), Duration::zero())]),
            hourly: HourlyLog::default(),
            committed_until: None,
        }
    }

    /// Builds state from persisted parts, repairing category totals that drifted from the app
    /// totals and creating categories that apps reference but that are missing.
    pub fn from_parts(
        apps: BTreeMap<AppId, AppRecord>,
        mut categories: BTreeMap<String, Duration>,
        hourly: HourlyLog,
    ) -> Self {
        categories
            .entry(UNCATEGORIZED.to_string())
            .or_insert_with(Duration::zero);

        let mut recomputed: BTreeMap<String, Duration> = categories
            .keys()
            .map(|name| (name.clone(), Duration::zero()))
            .collect();
        for (app, record) in &apps {
            if !categories.contains_key(&record.category) {
                warn!(
                    "Application {app} references missing category {:?}, creating it",
                    record.category
                );
            }
            *recomputed
                .entry(record.category.clone())
                .or_insert_with(Duration::zero) += record.total_time;
        }

        if recomputed != categories {
            warn!("Stored category totals don't match application totals, recomputing them");
            debug!("Stored {categories:?}, recomputed {recomputed:?}");
        }

        Self {
            apps,
            categories: recomputed,
            hourly,
            committed_until: None,
        }
    }

    pub fn with_committed_until(mut self, instant: Option<DateTime<Utc>>) -> Self {
        self.committed_until = instant;
        self
    }

    /// Latest instant time has been committed up to.
    pub fn committed_until(&self) -> Option<DateTime<Utc>> {
        self.committed_until
    }

    pub fn apps(&self) -> &BTreeMap<AppId, AppRecord> {
        &self.apps
    }

    pub fn app(&self, app: &str) -> Option<&AppRecord> {
        self.apps.get(app)
    }

    pub fn categories(&self) -> &BTreeMap<String, Duration> {
        &self.categories
    }

    pub fn category_total(&self, category: &str) -> Option<Duration> {
        self.categories.get(category).copied()
    }

    pub fn hourly(&self) -> &HourlyLog {
        &self.hourly
    }

    /// Category an application is currently reported under. Applications that only appear in the
    /// hourly log fall back to [UNCATEGORIZED].
    pub fn category_of(&self, app: &str) -> &str {
        self.apps
            .get(app)
            .map(|v| v.category.as_str())
            .unwrap_or(UNCATEGORIZED)
    }

    pub fn app_time_sum(&self) -> Duration {
        self.apps
            .values()
            .fold(Duration::zero(), |acc, v| acc + v.total_time)
    }

    pub fn category_time_sum(&self) -> Duration {
        self.categories
            .values()
            .fold(Duration::zero(), |acc, v| acc + *v)
    }

    /// Returns the record for `app`, creating a default one on first use.
    pub fn get_or_create_app(&mut self, app: &AppId) -> &mut AppRecord {
        self.apps.entry(app.clone()).or_insert_with(|| {
            debug!("Tracking new application {app}");
            AppRecord::default()
        })
    }

    /// Adds `duration` to the hourly bucket, the app total and the app's category total.
    pub fn record_duration(
        &mut self,
        app: &AppId,
        date: NaiveDate,
        hour: HourOfDay,
        duration: Duration,
    ) {
        self.hourly.add(date, hour, app, duration);
        let record = self.get_or_create_app(app);
        record.total_time += duration;
        let category = record.category.clone();
        *self
            .categories
            .entry(category)
            .or_insert_with(Duration::zero) += duration;
    }

    /// Commits the time `app` was focused between `since` and `until`, split into hourly buckets
    /// of `timezone`. A reversed interval means the clock went backwards, nothing gets committed
    /// then. Returns the committed duration.
    ///
    /// Both ends are truncated to whole milliseconds, the precision durations are persisted with,
    /// so app totals keep matching the sum of their hourly entries after a reload.
    pub fn commit_span<Tz: TimeZone>(
        &mut self,
        app: &AppId,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
        timezone: &Tz,
    ) -> Duration {
        let until = until.trunc_subsecs(3);
        let segments = match split(
            &since.trunc_subsecs(3).with_timezone(timezone),
            &until.with_timezone(timezone),
        ) {
            Ok(segments) => segments,
            Err(e) => {
                warn!("Dropping span of {app}: {e}");
                return Duration::zero();
            }
        };

        let mut committed = Duration::zero();
        for segment in segments {
            self.record_duration(app, segment.date, segment.hour, segment.duration);
            committed += segment.duration;
        }
        self.committed_until = self.committed_until.max(Some(until));
        committed
    }

    /// Moves `app` with its whole total into `category`. The category has to exist.
    pub fn set_category(&mut self, app: &AppId, category: &str) -> Result<(), TrackingError> {
        if !self.categories.contains_key(category) {
            return Err(TrackingError::UnknownCategory(category.into()));
        }

        let record = self.get_or_create_app(app);
        if record.category == category {
            return Ok(());
        }
        let previous = std::mem::replace(&mut record.category, category.into());
        let total = record.total_time;

        if let Some(old_total) = self.categories.get_mut(&previous) {
            *old_total -= total;
        }
        if let Some(new_total) = self.categories.get_mut(category) {
            *new_total += total;
        }
        Ok(())
    }
}
