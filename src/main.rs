use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cloud_carbon::config::Config;
use cloud_carbon::display::DisplayManager;
use cloud_carbon::logging::init_logging;
use cloud_carbon::reference::ReferenceData;
use cloud_carbon::report_parser::ExtractOptions;
use cloud_carbon::EmissionsAnalyzer;
use std::path::PathBuf;
use std::process;
use tracing::debug;

#[derive(Parser)]
#[command(name = "cloud-carbon")]
#[command(about = "Create an estimate of the carbon footprint of AWS EC2 usage")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to cloud-carbon.toml lookup)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse an AWS usage report
    ///
    /// The input file, specified by PATH, must be a gzipped CSV file in the format
    /// "hourly usage without IDs". Files ending in .csv are read uncompressed.
    /// The EC2 usage by region and instance type is printed with its emissions.
    Analyse {
        /// Path to the usage report
        path: PathBuf,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let json = match &cli.command {
        Commands::Analyse { json, .. } => *json,
    };

    if let Err(e) = run(cli) {
        handle_error(e, json);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let _log_guard = init_logging(&config)?;
    debug!(config_file = ?cli.config, "Configuration loaded");

    let reference =
        ReferenceData::from_config(&config.reference).context("Failed to load reference data")?;
    let analyzer = EmissionsAnalyzer::new(reference, ExtractOptions::from(&config.report));
    let display = DisplayManager::new(config.report.timestamp_format.clone());

    match cli.command {
        Commands::Analyse { path, json } => analyzer.run(&path, &display, json),
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        eprintln!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
