use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};

use super::{error::TrackingError, state::HourOfDay};

/// Part of a session that lies within a single clock hour of a single calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub date: NaiveDate,
    pub hour: HourOfDay,
    pub duration: Duration,
}

/// Splits `[start, end)` into contiguous segments at every clock hour boundary. Dates and hours
/// are taken from the time zone of the passed instants, so a session crossing midnight always
/// produces at least two segments. Equal instants produce nothing.
pub fn split<Tz: TimeZone>(
    start: &DateTime<Tz>,
    end: &DateTime<Tz>,
) -> Result<Vec<Segment>, TrackingError> {
    if start > end {
        return Err(TrackingError::InvalidInterval {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        });
    }

    let mut segments = Vec::new();
    let mut current = start.clone();
    while current < *end {
        let segment_end = next_hour_start(&current).min(end.clone());
        segments.push(Segment {
            date: current.date_naive(),
            hour: HourOfDay::of(&current),
            duration: segment_end.clone() - current.clone(),
        });
        current = segment_end;
    }
    Ok(segments)
}

/// Start of the clock hour following `instant`. Computed by subtracting the offset into the current
/// hour, which keeps it valid on days where the local clock jumps.
fn next_hour_start<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateTime<Tz> {
    let into_hour = Duration::seconds(i64::from(instant.minute() * 60 + instant.second()))
        + Duration::nanoseconds(i64::from(instant.nanosecond()));
    instant.clone() - into_hour + Duration::hours(1)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::tracking::{error::TrackingError, state::HourOfDay};

    use super::{split, Segment};

    const TEST_DATE: NaiveDate = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    fn at(date: NaiveDate, h: u32, m: u32, s: u32) -> chrono::DateTime<Utc> {
        Utc.from_utc_datetime(&NaiveDateTime::new(
            date,
            NaiveTime::from_hms_opt(h, m, s).unwrap(),
        ))
    }

    #[test]
    fn test_split_within_hour() {
        let segments = split(&at(TEST_DATE, 10, 0, 0), &at(TEST_DATE, 10, 1, 30)).unwrap();
        assert_eq!(
            segments,
            vec![Segment {
                date: TEST_DATE,
                hour: HourOfDay::new(10).unwrap(),
                duration: Duration::seconds(90),
            }]
        );
    }

    #[test]
    fn test_split_across_hour_boundary() {
        let segments = split(&at(TEST_DATE, 13, 45, 0), &at(TEST_DATE, 14, 10, 0)).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment {
                    date: TEST_DATE,
                    hour: HourOfDay::new(13).unwrap(),
                    duration: Duration::seconds(900),
                },
                Segment {
                    date: TEST_DATE,
                    hour: HourOfDay::new(14).unwrap(),
                    duration: Duration::seconds(600),
                },
            ]
        );
    }

    #[test]
    fn test_split_across_midnight() {
        let next_day = TEST_DATE.succ_opt().unwrap();
        let segments = split(&at(TEST_DATE, 23, 30, 0), &at(next_day, 1, 15, 0)).unwrap();

        let buckets = segments
            .iter()
            .map(|v| (v.date, v.hour.get(), v.duration.num_seconds()))
            .collect::<Vec<_>>();
        assert_eq!(
            buckets,
            vec![(TEST_DATE, 23, 1800), (next_day, 0, 3600), (next_day, 1, 900)]
        );
    }

    #[test]
    fn test_split_ends_exactly_on_boundary() {
        let segments = split(&at(TEST_DATE, 8, 20, 0), &at(TEST_DATE, 9, 0, 0)).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration, Duration::minutes(40));
    }

    #[test]
    fn test_split_sum_matches_interval() {
        let start = at(TEST_DATE, 5, 17, 43) + Duration::milliseconds(250);
        for length in [1, 59, 3599, 3600, 3601, 86_399, 200_000] {
            let end = start + Duration::seconds(length) + Duration::milliseconds(125);
            let segments = split(&start, &end).unwrap();

            let sum = segments
                .iter()
                .fold(Duration::zero(), |acc, v| acc + v.duration);
            assert_eq!(sum, end - start);

            // Every segment must stay inside one clock hour.
            assert!(segments.iter().all(|v| v.duration <= Duration::hours(1)));
        }
    }

    #[test]
    fn test_split_zero_length_is_empty() {
        let instant = at(TEST_DATE, 12, 0, 0);
        assert!(split(&instant, &instant).unwrap().is_empty());
    }

    #[test]
    fn test_split_reversed_interval_fails() {
        let result = split(&at(TEST_DATE, 12, 0, 1), &at(TEST_DATE, 12, 0, 0));
        assert!(matches!(result, Err(TrackingError::InvalidInterval { .. })));
    }

    #[test]
    fn test_split_uses_local_offset() {
        let offset = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        // 22:30 UTC is 00:30 on the next day at +02:00.
        let start = at(TEST_DATE, 22, 30, 0).with_timezone(&offset);
        let end = start + Duration::minutes(10);
        let segments = split(&start, &end).unwrap();
        assert_eq!(segments[0].date, TEST_DATE.succ_opt().unwrap());
        assert_eq!(segments[0].hour.get(), 0);
    }
}
