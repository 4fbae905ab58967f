use chrono::{Duration, NaiveDate};

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a string in apptally.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

pub fn parse_date_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT).ok()
}

/// Formats a duration as `HH:MM:SS`. Hours keep growing past 24 since weekly totals can exceed a
/// day.
pub fn format_hms(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
