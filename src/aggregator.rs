//! Accumulates usage records into per region and instance type durations.

use crate::error::Result;
use crate::models::{AggregateKey, Aggregation, RejectedRow, TimeSpan, UsageRecord};
use crate::report_parser::RecordProcessor;
use chrono::Duration;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Aggregator {
    aggregation: Aggregation,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &UsageRecord) {
        let aggregation = &mut self.aggregation;
        aggregation.qualifying_rows += 1;

        *aggregation
            .durations
            .entry(AggregateKey::from(record))
            .or_insert_with(Duration::zero) += record.duration;

        match &mut aggregation.span {
            Some(span) => span.include(record.usage_start, record.usage_end),
            None => {
                aggregation.span = Some(TimeSpan {
                    earliest: record.usage_start,
                    latest: record.usage_end,
                })
            }
        }
    }
}

impl RecordProcessor for Aggregator {
    type Output = Aggregation;

    fn process_record(&mut self, record: UsageRecord) -> Result<()> {
        self.add(&record);
        Ok(())
    }

    fn reject_row(&mut self, line: u64, reason: String) {
        self.aggregation.rejected.push(RejectedRow { line, reason });
    }

    fn finalize(self) -> Result<Aggregation> {
        debug!(
            qualifying_rows = self.aggregation.qualifying_rows,
            buckets = self.aggregation.durations.len(),
            rejected_rows = self.aggregation.rejected.len(),
            "Aggregation complete"
        );
        Ok(self.aggregation)
    }
}
