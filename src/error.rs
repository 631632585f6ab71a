//! Error kinds for the emissions pipeline.
//!
//! Startup errors (`MalformedReferenceData`) and input errors (`UnreadableInput`,
//! `UndecompressibleInput`, `MissingColumn`) are fatal for a run. `MalformedReportRow`
//! is fatal when the CSV structure is broken; a row whose interval cannot be used is
//! skipped and recorded instead. Lookup errors (`UnknownInstanceType`, `UnknownRegion`)
//! are recoverable: the analyzer logs them per bucket and keeps going.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = FootprintError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum FootprintError {
    #[error("malformed reference data in {table} (row {row}): {reason}")]
    MalformedReferenceData {
        table: &'static str,
        row: usize,
        reason: String,
    },

    #[error("unknown instance type: {0}")]
    UnknownInstanceType(String),

    #[error("unknown AWS region code: {0}")]
    UnknownRegion(String),

    #[error("could not open file {}: {source}", path.display())]
    UnreadableInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not uncompress report: {0}")]
    UndecompressibleInput(#[source] std::io::Error),

    #[error("malformed report row {row}: {reason}")]
    MalformedReportRow { row: u64, reason: String },

    #[error("report header is missing required column {0}")]
    MissingColumn(&'static str),
}
