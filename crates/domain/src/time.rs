//! Time and timestamp helpers.

use chrono::{DateTime, Datelike, Duration, Utc};

/// UTC timestamp used for run bookkeeping, ticket deadlines, event times, etc.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Last year whose timestamps keep a four-digit RFC 3339 form.
pub const LATEST_YEAR: i32 = 9999;

/// Return `from` shifted forward by `minutes`, or `None` when the result
/// falls after [`LATEST_YEAR`].
#[must_use]
pub fn after_minutes(from: Timestamp, minutes: u32) -> Option<Timestamp> {
    from.checked_add_signed(Duration::minutes(i64::from(minutes)))
        .filter(|at| at.year() <= LATEST_YEAR)
}
