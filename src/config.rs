//! Configuration system
//!
//! Resolution order:
//! - Built-in defaults
//! - Config file (explicit path, or the first of `cloud-carbon.toml`,
//!   `.cloud-carbon.toml`, `<config dir>/cloud-carbon/config.toml`)
//! - Environment variable overrides
//! - Validation

use crate::display::DEFAULT_TIMESTAMP_FORMAT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const LOG_FORMATS: [&str; 2] = ["pretty", "json"];
const LOG_OUTPUTS: [&str; 3] = ["console", "file", "both"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Usage report handling
    pub report: ReportConfig,

    /// Reference dataset overrides
    pub reference: ReferenceConfig,

    /// Paths configuration
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub strict_timestamps: bool,
    pub reject_negative_durations: bool,
    pub timestamp_format: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub instances_csv: Option<PathBuf>,
    pub regions_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            strict_timestamps: false,
            reject_negative_durations: false,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, or the default locations, then the environment
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_from_default_locations()?,
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_default_locations() -> Result<Self> {
        let config_paths = [
            PathBuf::from("cloud-carbon.toml"),
            PathBuf::from(".cloud-carbon.toml"),
            dirs::config_dir()
                .map(|d| d.join("cloud-carbon").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Report overrides
        if let Ok(val) = env::var("CLOUD_CARBON_STRICT_TIMESTAMPS") {
            self.report.strict_timestamps = val
                .parse()
                .context("Invalid CLOUD_CARBON_STRICT_TIMESTAMPS")?;
        }
        if let Ok(val) = env::var("CLOUD_CARBON_REJECT_NEGATIVE_DURATIONS") {
            self.report.reject_negative_durations = val
                .parse()
                .context("Invalid CLOUD_CARBON_REJECT_NEGATIVE_DURATIONS")?;
        }

        // Reference data overrides
        if let Ok(val) = env::var("CLOUD_CARBON_INSTANCES_CSV") {
            self.reference.instances_csv = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("CLOUD_CARBON_REGIONS_CSV") {
            self.reference.regions_csv = Some(PathBuf::from(val));
        }

        // Path overrides
        if let Ok(val) = env::var("CLOUD_CARBON_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Log format must be one of {:?}, got {:?}",
                LOG_FORMATS,
                self.logging.format
            );
        }

        if !LOG_OUTPUTS.contains(&self.logging.output.as_str()) {
            anyhow::bail!(
                "Log output must be one of {:?}, got {:?}",
                LOG_OUTPUTS,
                self.logging.output
            );
        }

        if self.report.timestamp_format.trim().is_empty() {
            anyhow::bail!("Timestamp format cannot be empty");
        }

        Ok(())
    }

    /// Whether logs are written to files, which needs the log directory to exist
    pub fn logs_to_file(&self) -> bool {
        matches!(self.logging.output.as_str(), "file" | "both")
    }
}
