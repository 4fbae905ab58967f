use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    tracking::state::{AppRecord, HourOfDay, HourlyLog, UsageState, UNCATEGORIZED},
    utils::time::{date_key, parse_date_key},
};

/// Seconds stored as a JSON number with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seconds(pub Duration);

impl Serialize for Seconds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.0.num_milliseconds() as f64 / 1000.)
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        Ok(Seconds(Duration::milliseconds((seconds * 1000.).round() as i64)))
    }
}

fn uncategorized() -> String {
    UNCATEGORIZED.into()
}

/// One entry of `app_data` in the usage totals document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecordEntity {
    pub total_time: Seconds,
    #[serde(default = "uncategorized")]
    pub category: String,
    #[serde(default)]
    pub exe_path: Option<String>,
    #[serde(default)]
    pub icon_path: Option<String>,
}

/// Usage totals document: `{"app_data": {...}, "category_data": {...}}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsageTotalsEntity {
    #[serde(default)]
    pub app_data: BTreeMap<String, AppRecordEntity>,
    #[serde(default)]
    pub category_data: BTreeMap<String, Seconds>,
    /// Instant the totals are committed up to, used to line them up with the session marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed_until: Option<DateTime<Utc>>,
}

/// Hourly log document: date (`YYYY-MM-DD`) -> hour (`HH:00`) -> application -> seconds.
pub type HourlyLogEntity = BTreeMap<String, BTreeMap<String, BTreeMap<String, Seconds>>>;

impl From<&UsageState> for UsageTotalsEntity {
    fn from(state: &UsageState) -> Self {
        let app_data = state
            .apps()
            .iter()
            .map(|(app, record)| {
                (
                    app.to_string(),
                    AppRecordEntity {
                        total_time: Seconds(record.total_time),
                        category: record.category.clone(),
                        exe_path: record
                            .executable_path
                            .as_ref()
                            .map(|v| v.to_string_lossy().into_owned()),
                        icon_path: record
                            .icon_reference
                            .as_ref()
                            .map(|v| v.to_string_lossy().into_owned()),
                    },
                )
            })
            .collect();
        let category_data = state
            .categories()
            .iter()
            .map(|(name, total)| (name.clone(), Seconds(*total)))
            .collect();

        Self {
            app_data,
            category_data,
            committed_until: state.committed_until(),
        }
    }
}

pub fn hourly_log_entity(log: &HourlyLog) -> HourlyLogEntity {
    log.days()
        .map(|(date, hours)| {
            let hours = hours
                .iter()
                .map(|(hour, apps)| {
                    let apps = apps
                        .iter()
                        .map(|(app, duration)| (app.to_string(), Seconds(*duration)))
                        .collect();
                    (hour.to_string(), apps)
                })
                .collect();
            (date_key(*date), hours)
        })
        .collect()
}

/// Rebuilds state from both documents. Keys that aren't valid dates or hours are reported as
/// errors instead of being dropped.
pub fn into_state(totals: UsageTotalsEntity, hourly: HourlyLogEntity) -> Result<UsageState, String> {
    let committed_until = totals.committed_until;
    let apps = totals
        .app_data
        .into_iter()
        .map(|(app, record)| {
            (
                Arc::<str>::from(app),
                AppRecord {
                    total_time: record.total_time.0,
                    category: record.category,
                    executable_path: record.exe_path.map(PathBuf::from),
                    icon_reference: record.icon_path.map(PathBuf::from),
                },
            )
        })
        .collect();
    let categories = totals
        .category_data
        .into_iter()
        .map(|(name, total)| (name, total.0))
        .collect();

    let mut log = HourlyLog::default();
    for (date, hours) in hourly {
        let date = parse_date_key(&date).ok_or_else(|| format!("Illegal date key {date:?}"))?;
        for (hour, apps) in hours {
            let hour = hour.parse::<HourOfDay>()?;
            for (app, seconds) in apps {
                log.add(date, hour, &Arc::from(app), seconds.0);
            }
        }
    }

    Ok(UsageState::from_parts(apps, categories, log).with_committed_until(committed_until))
}
