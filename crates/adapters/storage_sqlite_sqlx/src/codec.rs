//! Column encoding shared by the repositories.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! nanosecond precision, so lexical order is chronological order and values
//! survive a round trip unchanged.

use chrono::SecondsFormat;
use mailflow_domain::time::Timestamp;

pub(crate) fn timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(decode)
}

pub(crate) fn index(value: i64) -> Result<u32, sqlx::Error> {
    u32::try_from(value).map_err(decode)
}

pub(crate) fn limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn decode(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use mailflow_domain::time::now;

    #[test]
    fn should_preserve_timestamp_through_text() {
        let ts = now();
        assert_eq!(parse_timestamp(&timestamp(ts)).unwrap(), ts);
    }

    #[test]
    fn should_order_encoded_timestamps_chronologically() {
        let base = now();
        let earlier = timestamp(base - Duration::milliseconds(1));
        let later = timestamp(base + Duration::seconds(1));
        assert!(earlier < timestamp(base));
        assert!(timestamp(base) < later);
    }

    #[test]
    fn should_reject_negative_index() {
        assert!(index(-1).is_err());
        assert_eq!(index(7).unwrap(), 7);
    }
}
