//! Emissions Analysis Engine
//!
//! [`EmissionsAnalyzer`] runs the whole pipeline for one usage report:
//!
//! 1. **Reading**: opens and decompresses the report ([`open_report`])
//! 2. **Extraction**: maps the header, filters to EC2 instance usage and extracts
//!    usage records ([`read_report`]); malformed rows are logged and left out
//! 3. **Aggregation**: sums durations per region and instance type ([`Aggregator`])
//! 4. **Estimation**: applies the emissions formula per bucket, skipping buckets whose
//!    region or instance type is not in the reference data
//! 5. **Reporting**: sorts by region then instance type and hands the result to the
//!    [`DisplayManager`]
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cloud_carbon::analyzer::EmissionsAnalyzer;
//! use cloud_carbon::reference::ReferenceData;
//! use cloud_carbon::report_parser::ExtractOptions;
//!
//! let analyzer = EmissionsAnalyzer::new(ReferenceData::embedded()?, ExtractOptions::default());
//! let report = analyzer.analyse_path(std::path::Path::new("report.csv.gz"))?;
//! println!("{} gCO2e", report.total_grams);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::aggregator::Aggregator;
use crate::display::DisplayManager;
use crate::error::Result;
use crate::models::{AggregateRecord, Aggregation, EmissionsReport, SkippedBucket};
use crate::reference::ReferenceData;
use crate::report_parser::{open_report, read_report, read_report_file, ExtractOptions};
use std::io::Read;
use std::path::Path;
use tracing::{info, info_span, warn};
use uuid::Uuid;

pub struct EmissionsAnalyzer {
    reference: ReferenceData,
    options: ExtractOptions,
}

impl EmissionsAnalyzer {
    pub fn new(reference: ReferenceData, options: ExtractOptions) -> Self {
        Self { reference, options }
    }

    pub fn analyse_path(&self, path: &Path) -> Result<EmissionsReport> {
        let span = info_span!("analyse", run_id = %Uuid::new_v4(), path = %path.display());
        let _enter = span.enter();

        let input = open_report(path)?;
        let aggregation = read_report_file(input, self.options, Aggregator::new())?;
        let report = self.estimate(aggregation);

        info!(
            qualifying_rows = report.qualifying_rows,
            buckets = report.records.len(),
            skipped = report.skipped.len(),
            rejected_rows = report.rejected.len(),
            total_grams = report.total_grams,
            "Analysis complete"
        );
        Ok(report)
    }

    /// Analyse an uncompressed report stream.
    pub fn analyse_reader<R: Read>(&self, input: R) -> Result<EmissionsReport> {
        let aggregation = read_report(input, self.options, Aggregator::new())?;
        Ok(self.estimate(aggregation))
    }

    /// Compute emissions for every bucket and sort the result by region, then instance type.
    pub fn estimate(&self, aggregation: Aggregation) -> EmissionsReport {
        let mut records = Vec::with_capacity(aggregation.durations.len());
        let mut skipped = Vec::new();

        for (key, total_duration) in aggregation.durations {
            match self
                .reference
                .emissions(&key.region, &key.instance_type, total_duration)
            {
                Ok(emissions_grams) => records.push(AggregateRecord {
                    region: key.region,
                    instance_type: key.instance_type,
                    total_duration,
                    emissions_grams,
                }),
                Err(e) => {
                    warn!(
                        region = %key.region,
                        instance_type = %key.instance_type,
                        error = %e,
                        "Skipping usage without reference data"
                    );
                    skipped.push(SkippedBucket {
                        region: key.region,
                        instance_type: key.instance_type,
                        total_duration,
                        reason: e.to_string(),
                    });
                }
            }
        }

        records.sort_by(|a, b| {
            a.region
                .cmp(&b.region)
                .then_with(|| a.instance_type.cmp(&b.instance_type))
        });
        skipped.sort_by(|a, b| {
            a.region
                .cmp(&b.region)
                .then_with(|| a.instance_type.cmp(&b.instance_type))
        });

        // Summed in sorted order so the total does not depend on input row order.
        let total_grams = records.iter().map(|r| r.emissions_grams).sum();

        EmissionsReport {
            records,
            total_grams,
            qualifying_rows: aggregation.qualifying_rows,
            span: aggregation.span,
            skipped,
            rejected: aggregation.rejected,
        }
    }

    /// Analyse a report and print it.
    pub fn run(&self, path: &Path, display: &DisplayManager, json_output: bool) -> anyhow::Result<()> {
        if !json_output {
            println!("Analysing report from path {}", path.display());
        }

        let report = self.analyse_path(path)?;

        if json_output {
            display.display_json(&report)?;
        } else {
            display.display_report(&report);
        }

        Ok(())
    }
}
