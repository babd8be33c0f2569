//! Calendar helpers for sessions stored in UTC but labelled in local time

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use skilltrail_domain::constants::TIME_RANGE_FORMAT;

/// Calendar date of `timestamp` in the given offset.
pub fn local_date(timestamp: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    timestamp.with_timezone(&offset).date_naive()
}

/// Half-open UTC window `[start, end)` covering `date` in the given offset.
pub fn local_day_bounds(date: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let start =
        (local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()))).and_utc();
    (start, start + Duration::days(1))
}

/// `HH:MM-HH:MM` label in the given offset.
pub fn format_time_range(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    format!(
        "{}-{}",
        start.with_timezone(&offset).format(TIME_RANGE_FORMAT),
        end.with_timezone(&offset).format(TIME_RANGE_FORMAT)
    )
}

/// Widen an inclusive `[start, end]` range to the half-open form the event
/// sources accept.
pub fn inclusive_end(end: DateTime<Utc>) -> DateTime<Utc> {
    end + Duration::milliseconds(1)
}
