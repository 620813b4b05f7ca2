// ─────────────────────────────────────────────────────────────────────
// Logger timestamp → days since the Unix epoch
// ─────────────────────────────────────────────────────────────────────
use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::error::{ConvertError, ConvertResult};

pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d-%H:%M:%S";
pub const TIME_UNITS:       &str = "days since 1970-01-01 00:00:00";
pub const SECONDS_PER_DAY:  f64  = 86_400.0;

pub fn epoch() -> NaiveDate {
    NaiveDate::default() // 1970-01-01
}

/// `"2016.04.07-12:00:07"` → whole days since 1970-01-01 plus the fraction of
/// the day.
///
/// The day count and seconds-of-day are kept apart until the final division
/// so large day counts do not eat the sub-day precision.
pub fn days_since_epoch(stamp: &str) -> ConvertResult<f64> {
    let dt = NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT)
        .map_err(|_| ConvertError::TimestampFormat(stamp.to_string()))?;

    let days = dt.date().signed_duration_since(epoch()).num_days();
    let secs = dt.time().num_seconds_from_midnight();
    Ok(days as f64 + f64::from(secs) / SECONDS_PER_DAY)
}
