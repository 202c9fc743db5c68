//! RustLoad - Training Load & Power-Duration Analytics
//!
//! Command-line entry point.
//!
//! Usage:
//! ```bash
//! # Report for one athlete's history, as of today
//! rustload report history.json
//!
//! # As of a given date, with an explicit config file
//! rustload report history.json --as-of 2024-06-30 --config analytics.toml
//!
//! # Write the default configuration
//! rustload init-config
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rustload::report::{build_report, AthleteHistory};
use rustload::storage::config::{get_config_path, load_config, save_config, AnalyticsConfig};

#[derive(Parser)]
#[command(
    name = "rustload",
    version,
    about = "Training load and power-duration analytics",
    long_about = "Build power-duration, critical power, FTP and PMC reports \
                  from recorded activity history"
)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a JSON report for an athlete history file
    Report {
        /// Athlete history in JSON
        input: PathBuf,

        /// Report date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(get_config_path);

    match cli.command {
        Command::Report { input, as_of } => {
            let config = load_config(&config_path)
                .with_context(|| format!("loading config from {}", config_path.display()))?;

            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let history: AthleteHistory = serde_json::from_str(&content)
                .with_context(|| format!("parsing athlete history {}", input.display()))?;

            let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
            let report = build_report(&history, &config, as_of)?;

            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::InitConfig { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists, pass --force to overwrite",
                    config_path.display()
                );
            }
            save_config(&AnalyticsConfig::default(), &config_path)?;
            tracing::info!(path = %config_path.display(), "Wrote default configuration");
        }
    }

    Ok(())
}
