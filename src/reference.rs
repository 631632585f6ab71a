//! Reference Data Store
//!
//! Holds the two lookup tables the emissions model runs on:
//!
//! - EC2 instance types, keyed by instance type name, with power draw at 50% load
//!   and the hourly share of manufacturing emissions.
//! - AWS regions, keyed by region code, with grid carbon intensity and datacenter PUE.
//!
//! Both tables are parsed once from CSV text and never mutated afterwards. The
//! default tables are embedded at build time; a config file may point at updated
//! copies with the same column layout.
//!
//! Data and methodology by Teads engineering, licensed under the Creative Commons
//! Attribution 4.0 International License.

use crate::config::ReferenceConfig;
use crate::error::{FootprintError, Result};
use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use tracing::{debug, info};

const EMBEDDED_INSTANCES_CSV: &str = include_str!("../data/aws-ec2-instances.csv");
const EMBEDDED_REGIONS_CSV: &str = include_str!("../data/aws-regions.csv");

const INSTANCE_TYPE_COLUMN: usize = 0;
const POWER_AT_50_PERCENT_COLUMN: usize = 29;
const MANUFACTURING_EMISSIONS_COLUMN: usize = 36;

const REGION_CODE_COLUMN: usize = 0;
const CARBON_INTENSITY_COLUMN: usize = 4;
const PUE_COLUMN: usize = 6;

const INSTANCES_TABLE: &str = "instance table";
const REGIONS_TABLE: &str = "region table";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceSpec {
    /// Power consumption of the instance at 50% load, in watts.
    pub power_at_50_percent: f64,

    /// Emissions from producing the hardware, as an hourly contribution in grams CO2e.
    pub manufacturing_emissions_hourly: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSpec {
    /// Grams of CO2e emitted per kilowatt hour of electricity in the region.
    pub carbon_intensity: f64,

    /// Power usage effectiveness of the region's datacenters.
    pub pue: f64,
}

/// Read-only instance and region tables, built once and passed to whoever needs lookups.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    instances: HashMap<String, InstanceSpec>,
    regions: HashMap<String, RegionSpec>,
}

impl ReferenceData {
    /// Build the store from the datasets compiled into the binary.
    pub fn embedded() -> Result<Self> {
        Self::from_csv(EMBEDDED_INSTANCES_CSV, EMBEDDED_REGIONS_CSV)
    }

    pub fn from_csv(instances_csv: &str, regions_csv: &str) -> Result<Self> {
        let instances = load_instances(instances_csv)?;
        let regions = load_regions(regions_csv)?;

        debug!(
            instance_types = instances.len(),
            regions = regions.len(),
            "Loaded reference data"
        );

        Ok(Self { instances, regions })
    }

    /// Build the store honouring any dataset overrides from the configuration.
    pub fn from_config(config: &ReferenceConfig) -> anyhow::Result<Self> {
        let instances_csv = match &config.instances_csv {
            Some(path) => {
                info!(path = %path.display(), "Using instance table override");
                fs::read_to_string(path).with_context(|| {
                    format!("Failed to read instance table: {}", path.display())
                })?
            }
            None => EMBEDDED_INSTANCES_CSV.to_string(),
        };

        let regions_csv = match &config.regions_csv {
            Some(path) => {
                info!(path = %path.display(), "Using region table override");
                fs::read_to_string(path).with_context(|| {
                    format!("Failed to read region table: {}", path.display())
                })?
            }
            None => EMBEDDED_REGIONS_CSV.to_string(),
        };

        Ok(Self::from_csv(&instances_csv, &regions_csv)?)
    }

    pub fn instance_spec(&self, instance_type: &str) -> Result<&InstanceSpec> {
        self.instances
            .get(instance_type)
            .ok_or_else(|| FootprintError::UnknownInstanceType(instance_type.to_string()))
    }

    pub fn region_spec(&self, region_code: &str) -> Result<&RegionSpec> {
        self.regions
            .get(region_code)
            .ok_or_else(|| FootprintError::UnknownRegion(region_code.to_string()))
    }

    /// Power consumption at 50% load for an instance type, in watts.
    pub fn power_at_50_percent(&self, instance_type: &str) -> Result<f64> {
        Ok(self.instance_spec(instance_type)?.power_at_50_percent)
    }

    /// Manufacturing emissions for an instance type, as an hourly contribution in grams.
    pub fn manufacturing_emissions(&self, instance_type: &str) -> Result<f64> {
        Ok(self.instance_spec(instance_type)?.manufacturing_emissions_hourly)
    }

    /// Grams of CO2 emitted while producing one kilowatt hour of electricity in a region.
    pub fn carbon_intensity(&self, region_code: &str) -> Result<f64> {
        Ok(self.region_spec(region_code)?.carbon_intensity)
    }

    pub fn pue(&self, region_code: &str) -> Result<f64> {
        Ok(self.region_spec(region_code)?.pue)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

/// Parse the instance table. The first row is a header and is skipped.
pub fn load_instances(csv_text: &str) -> Result<HashMap<String, InstanceSpec>> {
    let mut instances = HashMap::new();

    for (row, fields) in data_rows(csv_text, INSTANCES_TABLE)? {
        let instance_type = field(&fields, INSTANCE_TYPE_COLUMN, INSTANCES_TABLE, row)?;
        let power_at_50_percent =
            parse_quantity(&fields, POWER_AT_50_PERCENT_COLUMN, INSTANCES_TABLE, row)?;
        let manufacturing_emissions_hourly =
            parse_quantity(&fields, MANUFACTURING_EMISSIONS_COLUMN, INSTANCES_TABLE, row)?;

        instances.insert(
            instance_type.to_string(),
            InstanceSpec {
                power_at_50_percent,
                manufacturing_emissions_hourly,
            },
        );
    }

    Ok(instances)
}

/// Parse the region table. The first row is a header and is skipped.
pub fn load_regions(csv_text: &str) -> Result<HashMap<String, RegionSpec>> {
    let mut regions = HashMap::new();

    for (row, fields) in data_rows(csv_text, REGIONS_TABLE)? {
        let region_code = field(&fields, REGION_CODE_COLUMN, REGIONS_TABLE, row)?;
        let carbon_intensity = parse_quantity(&fields, CARBON_INTENSITY_COLUMN, REGIONS_TABLE, row)?;
        let pue = parse_quantity(&fields, PUE_COLUMN, REGIONS_TABLE, row)?;

        regions.insert(
            region_code.to_string(),
            RegionSpec {
                carbon_intensity,
                pue,
            },
        );
    }

    Ok(regions)
}

/// Read all data rows with their 1-based row number (the header is row 1).
fn data_rows(csv_text: &str, table: &'static str) -> Result<Vec<(usize, csv::StringRecord)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_text.as_bytes());

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let row = index + 2;
        let record = record.map_err(|e| FootprintError::MalformedReferenceData {
            table,
            row,
            reason: e.to_string(),
        })?;
        rows.push((row, record));
    }

    Ok(rows)
}

fn field<'a>(
    fields: &'a csv::StringRecord,
    column: usize,
    table: &'static str,
    row: usize,
) -> Result<&'a str> {
    fields
        .get(column)
        .ok_or_else(|| FootprintError::MalformedReferenceData {
            table,
            row,
            reason: format!("missing column {}", column + 1),
        })
}

fn parse_quantity(
    fields: &csv::StringRecord,
    column: usize,
    table: &'static str,
    row: usize,
) -> Result<f64> {
    let raw = field(fields, column, table, row)?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| FootprintError::MalformedReferenceData {
            table,
            row,
            reason: format!("error parsing {:?} as float: {}", raw, e),
        })?;

    if !value.is_finite() || value < 0.0 {
        return Err(FootprintError::MalformedReferenceData {
            table,
            row,
            reason: format!("column {} must be a non-negative number, got {}", column + 1, raw),
        });
    }

    Ok(value)
}
