//! Emissions Formula
//!
//! Combines instance power draw, regional grid intensity and PUE, and the hourly
//! share of manufacturing emissions into grams of CO2e for a usage duration:
//!
//! ```text
//! grams = (power_kw * pue * carbon_intensity + manufacturing_hourly) * hours
//! ```

use crate::error::Result;
use crate::reference::{InstanceSpec, ReferenceData, RegionSpec};
use chrono::Duration;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const SECONDS_PER_HOUR: i64 = 3600;

/// Estimate emissions in grams CO2e. Pure; negative durations yield negative results.
pub fn estimate(region: &RegionSpec, instance: &InstanceSpec, duration: Duration) -> f64 {
    let power_kilowatt = instance.power_at_50_percent / 1000.0;
    let hours = duration_hours(duration);

    (power_kilowatt * region.pue * region.carbon_intensity + instance.manufacturing_emissions_hourly)
        * hours
}

/// Fractional hours of a duration. Whole hours and the remainder are converted
/// separately so whole-hour durations are exact.
pub fn duration_hours(duration: Duration) -> f64 {
    let seconds = duration.num_seconds();
    let whole_hours = seconds / SECONDS_PER_HOUR;
    let remainder_nanos =
        (seconds % SECONDS_PER_HOUR) * NANOS_PER_SECOND + i64::from(duration.subsec_nanos());

    whole_hours as f64 + remainder_nanos as f64 / (SECONDS_PER_HOUR * NANOS_PER_SECOND) as f64
}

impl ReferenceData {
    /// Footprint in grams CO2e of running `instance_type` in `region_code` for `duration`.
    pub fn emissions(&self, region_code: &str, instance_type: &str, duration: Duration) -> Result<f64> {
        let region = self.region_spec(region_code)?;
        let instance = self.instance_spec(instance_type)?;

        Ok(estimate(region, instance, duration))
    }
}
