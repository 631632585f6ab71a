use chrono::{DateTime, NaiveDateTime, ParseError, Utc};

/// Layout of timestamps in the report's `identity/TimeInterval` column.
pub const INTERVAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Seconds from the Unix epoch back to 0001-01-01T00:00:00Z.
const ZERO_TIME_UNIX_SECONDS: i64 = -62_135_596_800;

/// Handles parsing the UTC timestamps found in usage report intervals
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a `YYYY-MM-DDThh:mm:ssZ` timestamp
    pub fn parse(timestamp_str: &str) -> Result<DateTime<Utc>, ParseError> {
        NaiveDateTime::parse_from_str(timestamp_str, INTERVAL_TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
    }

    /// Parse a timestamp, degrading to [`zero_time`] when it does not parse
    pub fn parse_or_zero(timestamp_str: &str) -> DateTime<Utc> {
        Self::parse(timestamp_str).unwrap_or_else(|_| zero_time())
    }
}

/// The zero timestamp, 0001-01-01T00:00:00Z, used for unparsable input.
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_UNIX_SECONDS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}
