//! Read-only queries over the hourly log. Categories are resolved at query time from the current
//! application records, which is why renaming a category changes reports for past days.

pub mod csv;

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

use crate::tracking::{
    state::{AppId, UsageState},
    store::UsageStore,
};

#[derive(Debug, Clone, PartialEq)]
pub struct AppUsage {
    pub app: AppId,
    pub category: String,
    pub duration: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryUsage {
    pub category: String,
    pub duration: Duration,
}

/// Totals for the dates `start..=end`. Rows are sorted by time descending, ties by name.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub apps: Vec<AppUsage>,
    pub categories: Vec<CategoryUsage>,
}

impl UsageReport {
    pub fn total(&self) -> Duration {
        self.apps
            .iter()
            .fold(Duration::zero(), |acc, v| acc + v.duration)
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

/// Category with its applications, as shown by the live view.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryOverview {
    pub category: String,
    pub duration: Duration,
    pub apps: Vec<(AppId, Duration)>,
}

/// Sums every hour of `date` per application and groups the sums by current category.
pub fn daily(state: &UsageState, date: NaiveDate) -> UsageReport {
    let mut apps = BTreeMap::<AppId, Duration>::new();
    for per_app in state.hourly().day(date).into_iter().flat_map(|v| v.values()) {
        for (app, duration) in per_app {
            *apps.entry(app.clone()).or_insert_with(Duration::zero) += *duration;
        }
    }

    let mut categories = BTreeMap::<String, Duration>::new();
    for (app, duration) in &apps {
        *categories
            .entry(state.category_of(app).to_string())
            .or_insert_with(Duration::zero) += *duration;
    }

    build_report(state, date, date, apps, categories)
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Sums the daily reports from Monday to Sunday of the week containing `any_date_in_week`.
pub fn weekly(state: &UsageState, any_date_in_week: NaiveDate) -> UsageReport {
    let start = week_start(any_date_in_week);
    let end = start + Duration::days(6);

    let mut apps = BTreeMap::<AppId, Duration>::new();
    let mut categories = BTreeMap::<String, Duration>::new();
    for date in start.iter_days().take(7) {
        let day = daily(state, date);
        for row in day.apps {
            *apps.entry(row.app).or_insert_with(Duration::zero) += row.duration;
        }
        for row in day.categories {
            *categories
                .entry(row.category)
                .or_insert_with(Duration::zero) += row.duration;
        }
    }

    build_report(state, start, end, apps, categories)
}

fn build_report(
    state: &UsageState,
    start: NaiveDate,
    end: NaiveDate,
    apps: BTreeMap<AppId, Duration>,
    categories: BTreeMap<String, Duration>,
) -> UsageReport {
    // Maps are already ordered by name, a stable sort on time keeps ties in that order.
    let mut apps = apps
        .into_iter()
        .map(|(app, duration)| AppUsage {
            category: state.category_of(&app).to_string(),
            app,
            duration,
        })
        .collect::<Vec<_>>();
    apps.sort_by(|a, b| b.duration.cmp(&a.duration));

    let mut categories = categories
        .into_iter()
        .map(|(category, duration)| CategoryUsage { category, duration })
        .collect::<Vec<_>>();
    categories.sort_by(|a, b| b.duration.cmp(&a.duration));

    UsageReport {
        start,
        end,
        apps,
        categories,
    }
}

/// All-time totals grouped by category, including empty categories.
pub fn overview(state: &UsageState) -> Vec<CategoryOverview> {
    let mut grouped = state
        .categories()
        .iter()
        .map(|(name, duration)| {
            (
                name.as_str(),
                CategoryOverview {
                    category: name.clone(),
                    duration: *duration,
                    apps: vec![],
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    for (app, record) in state.apps() {
        if let Some(group) = grouped.get_mut(record.category.as_str()) {
            group.apps.push((app.clone(), record.total_time));
        }
    }

    let mut grouped = grouped.into_values().collect::<Vec<_>>();
    for group in &mut grouped {
        group.apps.sort_by(|a, b| b.1.cmp(&a.1));
    }
    grouped.sort_by(|a, b| b.duration.cmp(&a.duration));
    grouped
}

impl UsageStore {
    /// Daily report including the open session up to `now`.
    pub fn daily<Tz: TimeZone>(&self, date: NaiveDate, now: &DateTime<Tz>) -> UsageReport {
        daily(&self.live_totals(now), date)
    }

    /// Weekly report including the open session up to `now`.
    pub fn weekly<Tz: TimeZone>(&self, date: NaiveDate, now: &DateTime<Tz>) -> UsageReport {
        weekly(&self.live_totals(now), date)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::tracking::{
        state::{AppId, HourOfDay, UsageState, UNCATEGORIZED},
        store::{Sample, UsageStore},
    };

    use super::{daily, overview, week_start, weekly, AppUsage, CategoryUsage};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn record(state: &mut UsageState, app: &str, day: u32, hour: u32, seconds: i64) {
        let app: AppId = app.into();
        state.record_duration(
            &app,
            date(day),
            HourOfDay::new(hour).unwrap(),
            Duration::seconds(seconds),
        );
    }

    fn sample(app: &str) -> Sample {
        Sample {
            app: app.into(),
            executable_path: None,
            icon_reference: None,
        }
    }

    #[test]
    fn test_daily_sums_hours_and_orders_rows() {
        let mut state = UsageState::new();
        record(&mut state, "code.exe", 4, 9, 1800);
        record(&mut state, "code.exe", 4, 10, 1200);
        record(&mut state, "chrome.exe", 4, 10, 600);
        record(&mut state, "alacritty", 4, 11, 600);
        record(&mut state, "code.exe", 5, 9, 99);
        state.create_category("Work").unwrap();
        state.set_category(&"code.exe".into(), "Work").unwrap();

        let report = daily(&state, date(4));

        assert_eq!(
            report.apps,
            vec![
                AppUsage {
                    app: "code.exe".into(),
                    category: "Work".into(),
                    duration: Duration::seconds(3000),
                },
                AppUsage {
                    app: "alacritty".into(),
                    category: UNCATEGORIZED.into(),
                    duration: Duration::seconds(600),
                },
                AppUsage {
                    app: "chrome.exe".into(),
                    category: UNCATEGORIZED.into(),
                    duration: Duration::seconds(600),
                },
            ]
        );
        assert_eq!(
            report.categories,
            vec![
                CategoryUsage {
                    category: "Work".into(),
                    duration: Duration::seconds(3000),
                },
                CategoryUsage {
                    category: UNCATEGORIZED.into(),
                    duration: Duration::seconds(1200),
                },
            ]
        );
        assert_eq!(report.total(), Duration::seconds(4200));
    }

    #[test]
    fn test_daily_without_data_is_empty() {
        let report = daily(&UsageState::new(), date(4));
        assert!(report.is_empty());
        assert!(report.categories.is_empty());
    }

    #[test]
    fn test_week_window() {
        // 2024-03-06 is a Wednesday.
        assert_eq!(week_start(date(6)), date(4));
        assert_eq!(week_start(date(4)), date(4));
        assert_eq!(week_start(date(10)), date(4));
        assert_eq!(week_start(date(11)), date(11));
    }

    #[test]
    fn test_weekly_includes_monday_to_sunday_only() {
        let mut state = UsageState::new();
        record(&mut state, "code.exe", 3, 23, 1);
        record(&mut state, "code.exe", 4, 0, 100);
        record(&mut state, "chrome.exe", 6, 12, 50);
        record(&mut state, "code.exe", 10, 23, 20);
        record(&mut state, "code.exe", 11, 0, 1000);

        let report = weekly(&state, date(6));

        assert_eq!((report.start, report.end), (date(4), date(10)));
        let apps = report
            .apps
            .iter()
            .map(|v| (v.app.to_string(), v.duration.num_seconds()))
            .collect::<Vec<_>>();
        assert_eq!(
            apps,
            vec![("code.exe".to_string(), 120), ("chrome.exe".to_string(), 50)]
        );
        assert_eq!(report.total(), Duration::seconds(170));
    }

    #[test]
    fn test_rename_changes_history() {
        let mut state = UsageState::new();
        record(&mut state, "code.exe", 4, 9, 500);
        state.create_category("Work").unwrap();
        state.set_category(&"code.exe".into(), "Work").unwrap();

        state.rename_category("Work", "Coding").unwrap();

        let report = daily(&state, date(4));
        assert_eq!(report.apps[0].category, "Coding");
        assert_eq!(
            report.categories,
            vec![CategoryUsage {
                category: "Coding".into(),
                duration: Duration::seconds(500),
            }]
        );
    }

    #[test]
    fn test_delete_moves_history_to_uncategorized() {
        let mut state = UsageState::new();
        record(&mut state, "code.exe", 4, 9, 500);
        record(&mut state, "nvim", 4, 10, 250);
        state.create_category("Work").unwrap();
        state.set_category(&"code.exe".into(), "Work").unwrap();
        state.set_category(&"nvim".into(), "Work").unwrap();

        state.delete_category("Work").unwrap();

        let report = daily(&state, date(4));
        assert_eq!(
            report.categories,
            vec![CategoryUsage {
                category: UNCATEGORIZED.into(),
                duration: Duration::seconds(750),
            }]
        );
        assert!(overview(&state).iter().all(|v| v.category != "Work"));
    }

    #[test]
    fn test_reports_include_open_session() {
        let store = UsageStore::default();
        let t0 = Utc.with_ymd_and_hms(2024, 3, 6, 13, 45, 0).unwrap();
        store.apply_sample(sample("chrome.exe"), &t0);
        store.apply_sample(sample("code.exe"), &(t0 + Duration::seconds(90)));

        let now = t0 + Duration::minutes(25);
        let report = store.daily(date(6), &now);

        let apps = report
            .apps
            .iter()
            .map(|v| (v.app.to_string(), v.duration.num_seconds()))
            .collect::<Vec<_>>();
        assert_eq!(
            apps,
            vec![("code.exe".to_string(), 1410), ("chrome.exe".to_string(), 90)]
        );
        assert_eq!(store.weekly(date(8), &now).total(), Duration::seconds(1500));
        assert!(store.daily(date(5), &now).is_empty());
    }

    #[test]
    fn test_overview_groups_by_category() {
        let mut state = UsageState::new();
        record(&mut state, "code.exe", 4, 9, 500);
        record(&mut state, "nvim", 4, 9, 700);
        record(&mut state, "game", 4, 20, 300);
        state.create_category("Work").unwrap();
        state.create_category("Empty").unwrap();
        state.set_category(&"code.exe".into(), "Work").unwrap();
        state.set_category(&"nvim".into(), "Work").unwrap();

        let groups = overview(&state);

        assert_eq!(groups[0].category, "Work");
        assert_eq!(groups[0].duration, Duration::seconds(1200));
        assert_eq!(
            groups[0].apps,
            vec![
                (AppId::from("nvim"), Duration::seconds(700)),
                (AppId::from("code.exe"), Duration::seconds(500))
            ]
        );
        assert_eq!(groups[1].category, UNCATEGORIZED);
        assert_eq!(groups[2].category, "Empty");
        assert!(groups[2].apps.is_empty());
    }
}
