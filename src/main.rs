
// USAGE cargo run --release -- /path/to/records /path/to/output --calibration flx_sns.csv

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use envlog_to_netcdf::{plan_jobs, run, Calibration, ConversionConfig, OutputFormat, UnitTable};
use log::info;
use std::{path::PathBuf, time::Instant};

/// Convert EnvironmentLogger JSON records to netCDF
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Record file, or directory searched recursively for *.json
    input: PathBuf,

    /// Output .nc file, or directory for per-record outputs
    output: PathBuf,

    /// netCDF flavour to write
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Netcdf4)]
    format: OutputFormat,

    /// Spectrometer calibration CSV (flux sensitivity per channel + sensor area)
    #[arg(short, long)]
    calibration: PathBuf,

    /// Log per-stage timings
    #[arg(short, long)]
    verbose: bool,
}

// ─────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────
fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let t0 = Instant::now();
    let calibration = Calibration::from_csv(&args.calibration)?;
    info!(
        "calibration: {} channels, sensor area {} m2",
        calibration.len(),
        calibration.sensor_area_m2
    );

    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    let config = ConversionConfig {
        units:   UnitTable::standard(),
        calibration,
        format:  args.format,
        history: format!("{}: {command_line}", Local::now().format("%a %b %d %H:%M:%S %Y")),
    };

    let jobs = plan_jobs(&args.input, &args.output)?;
    info!("{} record file(s), writing {}", jobs.len(), args.format);

    // Failed files are logged by `run`; they do not fail the process.
    let summary = run(&jobs, &config);
    info!(
        "done: {} converted, {} failed in {:.3?}",
        summary.converted.len(),
        summary.failed.len(),
        t0.elapsed()
    );
    Ok(())
}
