use std::process::ExitCode;

use clap::Parser;
use railsim_data::{SimConfig, load_config, load_level};
use railsim_runner::cli::CliArgs;
use railsim_runner::driver::summary_banner;
use railsim_runner::{CsvTelemetry, RunnerError, run_level};

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), RunnerError> {
    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    args.apply(&mut config);

    let level = load_level(&args.level)?;
    println!("Level loaded: {}", level.name);
    println!("Grid size: {} x {}", level.grid.rows(), level.grid.cols());
    println!("Trains: {}", level.trains.len());
    println!("Seed: {}", level.seed);
    println!("Weather: {}\n", level.weather.name());

    let mut sink = CsvTelemetry::create(&config.telemetry)?;
    let report = run_level(&level, &config, &mut sink, &mut std::io::stdout().lock())?;

    println!("\n{}", summary_banner(&report));
    println!("Logs saved to {}", sink.dir().display());
    Ok(())
}

fn main() -> ExitCode {
    setup_logging();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}
