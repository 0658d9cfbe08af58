//! # Temporal Helpers — Day Granularity
//!
//! The calendar-day exchange trigger counts whole days since the Unix
//! epoch, UTC only. Finer precision is irrelevant here: the cache stores
//! the day of the last successful exchange and compares it against today.

use chrono::{DateTime, Utc};

/// Seconds in one day.
const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Whole days elapsed since the Unix epoch, as of now (UTC).
pub fn days_since_epoch() -> u32 {
    days_from(Utc::now())
}

/// Whole days elapsed since the Unix epoch at the given instant.
///
/// Instants before the epoch clamp to day 0; the head unit's clock is
/// never expected to be set that far back.
pub fn days_from(instant: DateTime<Utc>) -> u32 {
    let days = instant.timestamp() / SECONDS_PER_DAY;
    u32::try_from(days).unwrap_or(0)
}
