//! The single sanctioned timestamp conversion rule.
//!
//! Provider timestamps arrive as integers of ambiguous unit. Every call site
//! in this repository funnels through [`normalize`], which interprets them as
//! milliseconds since the Unix epoch. There is deliberately no
//! seconds-since-epoch entry point: interpreting a real provider timestamp as
//! seconds yields a date near 1970-01-01, and that entire family of values is
//! rejected by the year guard below.

use crate::{TimestampError, UtcDateTime};

pub const MIN_YEAR: i64 = 1990;
pub const MAX_YEAR: i64 = 2100;

const APPROX_SECONDS_PER_YEAR: i64 = 31_556_952;

/// Convert a raw provider timestamp (milliseconds since epoch) into the
/// canonical UTC calendar timestamp, at whole-second precision.
pub fn normalize(raw_ts: i64) -> Result<UtcDateTime, TimestampError> {
    let seconds = raw_ts.div_euclid(1000);

    let ts = match UtcDateTime::from_unix_seconds(seconds) {
        Some(ts) => ts,
        None => {
            return Err(TimestampError::OutOfRange {
                raw: raw_ts,
                year: approximate_year(seconds),
            });
        }
    };

    let year = i64::from(ts.year());
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(TimestampError::OutOfRange { raw: raw_ts, year });
    }

    Ok(ts)
}

/// Rough calendar year for diagnostics when the value is unrepresentable.
fn approximate_year(seconds: i64) -> i64 {
    1970 + seconds.div_euclid(APPROX_SECONDS_PER_YEAR)
}
