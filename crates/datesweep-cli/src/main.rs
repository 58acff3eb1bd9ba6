//! datesweep CLI - date-range export automation
//!
//! Drives a report UI through its date picker for every date in a range,
//! exports weekday reports as CSV and renames each download after its date.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "datesweep")]
#[command(author, version, about = "Export one report per date through a GUI date picker", long_about = None)]
struct Cli {
    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only show warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Config file (default: ./datesweep.toml if present, else built-in defaults)
    #[arg(short, long, global = true, env = "DATESWEEP_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the configured date range and download directory
#[derive(Args, Debug, Default)]
pub struct Overrides {
    /// First date to process (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to process, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Directory the browser downloads exports into
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Click through the date range and export every weekday
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Log clicks and planned renames instead of performing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the grid cell, coordinates and export name for every date
    Plan {
        #[command(flatten)]
        overrides: Overrides,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Derive the grid base coordinate from one measured date cell
    Calibrate {
        /// Date whose cell was measured (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Measured x coordinate of the cell
        #[arg(short, long, allow_negative_numbers = true)]
        x: i32,

        /// Measured y coordinate of the cell
        #[arg(short, long, allow_negative_numbers = true)]
        y: i32,

        /// Pixel distance between neighbouring cells
        #[arg(long, default_value_t = 33)]
        step: i32,
    },

    /// Write a config file with the default values
    Init {
        /// Output path
        #[arg(value_name = "FILE", default_value = datesweep_core::config::DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run { overrides, dry_run } => commands::run(config_path, &overrides, dry_run),
        Commands::Plan { overrides, json } => commands::plan(config_path, &overrides, json),
        Commands::Calibrate { date, x, y, step } => commands::calibrate(date, x, y, step),
        Commands::Init { path } => commands::init(&path),
    }
}
