//! Command-line arguments for `railsim`.

use std::path::PathBuf;

use clap::Parser;
use railsim_data::SimConfig;

/// Runs a rail level headless, writing per-tick traces and end-of-run
/// metrics. Options override the values loaded from `--config`.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "railsim", version)]
pub struct CliArgs {
    /// Level file (.lvl, .ron, .json or .toml).
    #[arg(value_name = "LEVEL")]
    pub level: PathBuf,
    /// Run config (.ron, .json or .toml).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Tick cap.
    #[arg(long = "max-ticks", value_name = "TICKS")]
    pub max_ticks: Option<u64>,
    /// Telemetry output directory.
    #[arg(long = "out", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Pause between ticks, in milliseconds.
    #[arg(long = "delay-ms", value_name = "MS")]
    pub tick_delay_ms: Option<u64>,
    /// Draw the grid after every tick.
    #[arg(long)]
    pub render: bool,
    /// Write metrics.txt only.
    #[arg(long = "no-traces")]
    pub no_traces: bool,
}

impl CliArgs {
    /// Fold command-line overrides into `config`.
    pub fn apply(&self, config: &mut SimConfig) {
        if let Some(n) = self.max_ticks {
            config.max_ticks = n;
        }
        if let Some(dir) = &self.output_dir {
            config.telemetry.output_dir = dir.clone();
        }
        if let Some(ms) = self.tick_delay_ms {
            config.tick_delay_ms = ms;
        }
        if self.render {
            config.render = true;
        }
        if self.no_traces {
            config.telemetry.write_traces = false;
        }
    }
}
