//! Core Data Models
//!
//! Data flows through these types in one direction:
//!
//! 1. **Raw Data**: [`UsageRecord`] - one qualifying row of a usage report
//! 2. **Aggregation**: [`Aggregation`] - total duration per [`AggregateKey`], plus the
//!    time span covered, the number of qualifying rows and the rows rejected as malformed
//! 3. **Output**: [`EmissionsReport`] - sorted [`AggregateRecord`]s with emissions and
//!    a grand total, serializable for JSON output

use crate::display::format_duration;
use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub payer_account_id: String,
    pub usage_account_id: String,
    pub region: String,
    pub instance_type: String,
    pub usage_start: DateTime<Utc>,
    pub usage_end: DateTime<Utc>,
    pub duration: Duration,
}

/// Accumulation bucket identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AggregateKey {
    pub region: String,
    pub instance_type: String,
}

impl AggregateKey {
    pub fn new(region: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            instance_type: instance_type.into(),
        }
    }
}

impl From<&UsageRecord> for AggregateKey {
    fn from(record: &UsageRecord) -> Self {
        Self::new(record.region.clone(), record.instance_type.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSpan {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

impl TimeSpan {
    pub fn elapsed(&self) -> Duration {
        self.latest - self.earliest
    }

    /// Widen the span to cover `start..end`.
    pub fn include(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        if start < self.earliest {
            self.earliest = start;
        }
        if end > self.latest {
            self.latest = end;
        }
    }
}

/// Accumulated usage, before emissions are computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub durations: HashMap<AggregateKey, Duration>,
    pub span: Option<TimeSpan>,
    pub qualifying_rows: usize,
    pub rejected: Vec<RejectedRow>,
}

/// A qualifying row whose contents could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRecord {
    pub region: String,
    pub instance_type: String,
    #[serde(serialize_with = "serialize_duration")]
    pub total_duration: Duration,
    pub emissions_grams: f64,
}

/// A bucket left out of the report because its region or instance type is unknown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedBucket {
    pub region: String,
    pub instance_type: String,
    #[serde(serialize_with = "serialize_duration")]
    pub total_duration: Duration,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsReport {
    pub records: Vec<AggregateRecord>,
    pub total_grams: f64,
    pub qualifying_rows: usize,
    pub span: Option<TimeSpan>,
    pub skipped: Vec<SkippedBucket>,
    pub rejected: Vec<RejectedRow>,
}

impl EmissionsReport {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total_grams: 0.0,
            qualifying_rows: 0,
            span: None,
            skipped: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

fn serialize_duration<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_span_include() {
        let at = |hour| Utc.with_ymd_and_hms(2022, 8, 1, hour, 0, 0).unwrap();
        let mut span = TimeSpan {
            earliest: at(5),
            latest: at(6),
        };

        span.include(at(2), at(3));
        span.include(at(9), at(12));

        assert_eq!(span.earliest, at(2));
        assert_eq!(span.latest, at(12));
        assert_eq!(span.elapsed(), Duration::hours(10));
    }

    #[test]
    fn test_record_serializes_duration_as_text() {
        let record = AggregateRecord {
            region: "eu-west-1".to_string(),
            instance_type: "t2.micro".to_string(),
            total_duration: Duration::hours(1664),
            emissions_grams: 57.0,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["instanceType"], "t2.micro");
        assert_eq!(json["totalDuration"], "1664h0m0s");
        assert_eq!(json["emissionsGrams"], 57.0);
    }
}
