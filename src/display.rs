//! Output Formatting and Display Management
//!
//! Renders an [`EmissionsReport`] either as a plain text table for the terminal or
//! as JSON.
//!
//! ## Text Output
//!
//! ```text
//! Processed 4 lines about EC2 usage.
//! Time range covered: 2022-08-01 00:00:00 +0000 UTC - 2022-08-01 03:00:00 +0000 UTC (3h0m0s).
//!
//! REGION      INSTANCE TYPE   DURATION   EMISSIONS
//! eu-west-1   c4.large        1h0m0s     6 gCO2e
//! eu-west-1   t2.micro        3h0m0s     8 gCO2e
//!                             Total      14 gCO2e
//! ```
//!
//! Emission amounts are scaled to the largest unit they exceed: grams, kilograms
//! above 1,000 g and metric tons above 1,000,000 g. The comparisons are strict, so
//! exactly 1000 g still prints as grams.

use crate::models::EmissionsReport;
use anyhow::{Context, Result};
use chrono::Duration;
use colored::Colorize;

const NANOS_PER_MICROSECOND: u128 = 1_000;
const NANOS_PER_MILLISECOND: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;
const NANOS_PER_MINUTE: u128 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: u128 = 60 * NANOS_PER_MINUTE;

const TABLE_HEADER: [&str; 4] = ["REGION", "INSTANCE TYPE", "DURATION", "EMISSIONS"];
const TABLE_PADDING: &str = "   ";

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z UTC";

/// Format grams of CO2e with a unit matching the magnitude.
pub fn format_grams(grams: f64) -> String {
    if grams > 1000.0 * 1000.0 {
        return format!("{:.1} MTCO2e", grams / 1000.0 / 1000.0);
    }
    if grams > 1000.0 {
        return format!("{:.1} kgCO2e", grams / 1000.0);
    }
    format!("{:.0} gCO2e", grams)
}

/// Format a duration as hours, minutes and seconds, e.g. `1664h0m0s` or `2m30.5s`.
///
/// Durations under one second use the largest fitting unit of ms, µs or ns.
pub fn format_duration(duration: Duration) -> String {
    let nanos = i128::from(duration.num_seconds()) * NANOS_PER_SECOND as i128
        + i128::from(duration.subsec_nanos());
    if nanos == 0 {
        return "0s".to_string();
    }

    let sign = if nanos < 0 { "-" } else { "" };
    let nanos = nanos.unsigned_abs();

    if nanos < NANOS_PER_SECOND {
        let (unit_nanos, unit) = if nanos < NANOS_PER_MICROSECOND {
            (1, "ns")
        } else if nanos < NANOS_PER_MILLISECOND {
            (NANOS_PER_MICROSECOND, "µs")
        } else {
            (NANOS_PER_MILLISECOND, "ms")
        };
        return format!("{}{}{}", sign, decimal(nanos, unit_nanos), unit);
    }

    let hours = nanos / NANOS_PER_HOUR;
    let minutes = nanos / NANOS_PER_MINUTE % 60;
    let seconds = decimal(nanos % NANOS_PER_MINUTE, NANOS_PER_SECOND);

    if hours > 0 {
        format!("{}{}h{}m{}s", sign, hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}{}m{}s", sign, minutes, seconds)
    } else {
        format!("{}{}s", sign, seconds)
    }
}

/// `value / unit` as a decimal without trailing zeros. `unit` is a power of ten.
fn decimal(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let fraction = value % unit;
    if fraction == 0 {
        return whole.to_string();
    }

    let width = unit.ilog10() as usize;
    let digits = format!("{:0width$}", fraction, width = width);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

pub struct DisplayManager {
    timestamp_format: String,
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FORMAT)
    }
}

impl DisplayManager {
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
        }
    }

    pub fn display_report(&self, report: &EmissionsReport) {
        println!("{}", self.render_summary(report));
        println!();

        let table = self.render_table(report);
        let last = table.lines().count().saturating_sub(1);
        for (index, line) in table.lines().enumerate() {
            if index == 0 {
                println!("{}", line.bold());
            } else if index == last {
                println!("{}", line.bright_green().bold());
            } else {
                println!("{}", line);
            }
        }
    }

    pub fn display_json(&self, report: &EmissionsReport) -> Result<()> {
        let output = serde_json::json!({
            "report": report,
            "total": format_grams(report.total_grams),
        });
        let json_str =
            serde_json::to_string_pretty(&output).context("Failed to serialize report to JSON")?;
        println!("{}", json_str);
        Ok(())
    }

    /// Row count and covered time range.
    pub fn render_summary(&self, report: &EmissionsReport) -> String {
        let range = match &report.span {
            Some(span) => format!(
                "Time range covered: {} - {} ({}).",
                span.earliest.format(&self.timestamp_format),
                span.latest.format(&self.timestamp_format),
                format_duration(span.elapsed())
            ),
            None => "Time range covered: none.".to_string(),
        };

        let mut summary = format!(
            "Processed {} lines about EC2 usage.\n{}",
            report.qualifying_rows, range
        );
        if !report.rejected.is_empty() {
            summary.push_str(&format!(
                "\nSkipped {} malformed lines.",
                report.rejected.len()
            ));
        }
        summary
    }

    /// Left-aligned table of all records with a total footer.
    pub fn render_table(&self, report: &EmissionsReport) -> String {
        let mut rows: Vec<[String; 4]> = Vec::with_capacity(report.records.len() + 2);
        rows.push(TABLE_HEADER.map(String::from));
        for record in &report.records {
            rows.push([
                record.region.clone(),
                record.instance_type.clone(),
                format_duration(record.total_duration),
                format_grams(record.emissions_grams),
            ]);
        }
        rows.push([
            String::new(),
            String::new(),
            "Total".to_string(),
            format_grams(report.total_grams),
        ]);

        let mut widths = [0usize; 4];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        rows.iter()
            .map(|row| {
                let line = row
                    .iter()
                    .zip(widths.iter())
                    .map(|(cell, width)| {
                        let pad = width - cell.chars().count();
                        format!("{}{}", cell, " ".repeat(pad))
                    })
                    .collect::<Vec<_>>()
                    .join(TABLE_PADDING);
                line.trim_end().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
