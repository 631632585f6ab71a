//! Cloud Carbon Library
//!
//! Estimates the carbon emissions of AWS EC2 usage from cost and usage reports.
//! Each hour of instance runtime is charged with the electricity it draws at 50%
//! load, scaled by the datacenter PUE and the grid carbon intensity of its region,
//! plus its share of the emissions from manufacturing the hardware.
//!
//! ## Architecture Overview
//!
//! - [`reference`] - Instance and region reference tables, loaded once and read-only
//! - [`emissions`] - The emissions formula
//! - [`report_parser`] - Report decompression, header mapping, row filtering and extraction
//! - [`aggregator`] - Accumulation of usage durations per region and instance type
//! - [`analyzer`] - Pipeline orchestration, per-bucket estimation and sorting
//! - [`display`] - Text table and JSON output
//! - [`models`] - Data structures shared by the pipeline stages
//! - [`config`] - Configuration from files and environment variables
//! - [`logging`] - Structured logging setup
//! - [`error`] - Error kinds
//!
//! ## Main Entry Point
//!
//! ```rust
//! use cloud_carbon::reference::ReferenceData;
//! use chrono::Duration;
//!
//! let reference = ReferenceData::embedded()?;
//! let grams = reference.emissions("eu-west-1", "t2.micro", Duration::hours(1))?;
//! assert!((grams - 2.75808).abs() < 1e-9);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod display;
pub mod emissions;
pub mod error;
pub mod logging;
pub mod models;
pub mod reference;
pub mod report_parser;
pub mod timestamp_parser;

pub use analyzer::EmissionsAnalyzer;
pub use error::FootprintError;
pub use models::*;
