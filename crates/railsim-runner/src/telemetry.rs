//! Per-tick trace output and the end-of-run metrics file.
//!
//! [`CsvTelemetry`] writes four files into the configured output directory:
//!
//! | file           | columns                                   |
//! |----------------|-------------------------------------------|
//! | `trace.csv`    | `Tick,TrainID,X,Y,Direction,State`        |
//! | `switches.csv` | `Tick,Switch,Mode,State`                  |
//! | `signals.csv`  | `Tick,Switch,Signal`                      |
//! | `metrics.txt`  | run totals, average wait and throughput   |

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use railsim_core::query::TickReport;
use railsim_data::TelemetryConfig;
use railsim_stats::RunSummary;

use crate::error::TelemetryError;

pub const TRACE_FILE: &str = "trace.csv";
pub const SWITCHES_FILE: &str = "switches.csv";
pub const SIGNALS_FILE: &str = "signals.csv";
pub const METRICS_FILE: &str = "metrics.txt";

const TRACE_HEADER: &str = "Tick,TrainID,X,Y,Direction,State";
const SWITCHES_HEADER: &str = "Tick,Switch,Mode,State";
const SIGNALS_HEADER: &str = "Tick,Switch,Signal";

// ===========================================================================
// Sink trait
// ===========================================================================

/// Receives one report per simulated tick and the summary at the end.
pub trait TelemetrySink {
    fn record_tick(&mut self, report: &TickReport) -> Result<(), TelemetryError>;

    fn finish(&mut self, summary: &RunSummary) -> Result<(), TelemetryError>;
}

// ===========================================================================
// Row formatting
// ===========================================================================

/// `trace.csv` rows for one tick.
pub fn trace_rows(report: &TickReport) -> impl Iterator<Item = String> + '_ {
    report.trains.iter().map(move |t| {
        format!(
            "{},{},{},{},{},{}",
            report.tick,
            t.id,
            t.position.x,
            t.position.y,
            t.direction.name(),
            t.status.name()
        )
    })
}

/// `switches.csv` rows for one tick.
pub fn switch_rows(report: &TickReport) -> impl Iterator<Item = String> + '_ {
    report.switches.iter().map(move |s| {
        format!(
            "{},{},{},{}",
            report.tick,
            s.label,
            s.mode.name(),
            s.state_name
        )
    })
}

/// `signals.csv` rows for one tick.
pub fn signal_rows(report: &TickReport) -> impl Iterator<Item = String> + '_ {
    report
        .switches
        .iter()
        .map(move |s| format!("{},{},{}", report.tick, s.label, s.signal.name()))
}

/// Contents of `metrics.txt`.
pub fn metrics_text(summary: &RunSummary) -> String {
    format!(
        "=== SWITCHBACK RAILS - SIMULATION METRICS ===\n\
         \n\
         Total Ticks: {}\n\
         Trains Delivered: {}\n\
         Trains Crashed: {}\n\
         Total Switch Flips: {}\n\
         Average Wait Time: {:.2} ticks\n\
         \n\
         Throughput: {:.2} trains per 100 ticks\n",
        summary.total_ticks,
        summary.delivered,
        summary.crashed,
        summary.flips,
        summary.average_wait,
        summary.throughput_per_100,
    )
}

// ===========================================================================
// CSV sink
// ===========================================================================

struct TraceFile {
    path: PathBuf,
    out: BufWriter<File>,
}

impl TraceFile {
    fn create(dir: &Path, name: &str, header: &str) -> Result<Self, TelemetryError> {
        let path = dir.join(name);
        let file = File::create(&path).map_err(|source| TelemetryError::Write {
            file: path.clone(),
            source,
        })?;
        let mut trace = Self {
            path,
            out: BufWriter::new(file),
        };
        trace.line(header)?;
        Ok(trace)
    }

    fn line(&mut self, row: &str) -> Result<(), TelemetryError> {
        writeln!(self.out, "{row}").map_err(|source| TelemetryError::Write {
            file: self.path.clone(),
            source,
        })
    }

    fn lines(&mut self, rows: impl Iterator<Item = String>) -> Result<(), TelemetryError> {
        rows.map(|row| self.line(&row)).collect()
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        self.out.flush().map_err(|source| TelemetryError::Write {
            file: self.path.clone(),
            source,
        })
    }
}

struct TraceFiles {
    trains: TraceFile,
    switches: TraceFile,
    signals: TraceFile,
}

/// Writes the CSV traces and `metrics.txt` to a directory.
pub struct CsvTelemetry {
    dir: PathBuf,
    traces: Option<TraceFiles>,
}

impl CsvTelemetry {
    /// Create the output directory and, unless traces are disabled, the
    /// three CSV files with their headers. Existing files are truncated.
    pub fn create(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        let dir = config.output_dir.clone();
        std::fs::create_dir_all(&dir).map_err(|source| TelemetryError::CreateDir {
            dir: dir.clone(),
            source,
        })?;

        let traces = if config.write_traces {
            Some(TraceFiles {
                trains: TraceFile::create(&dir, TRACE_FILE, TRACE_HEADER)?,
                switches: TraceFile::create(&dir, SWITCHES_FILE, SWITCHES_HEADER)?,
                signals: TraceFile::create(&dir, SIGNALS_FILE, SIGNALS_HEADER)?,
            })
        } else {
            None
        };

        tracing::debug!(dir = %dir.display(), traces = config.write_traces, "telemetry opened");
        Ok(Self { dir, traces })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TelemetrySink for CsvTelemetry {
    fn record_tick(&mut self, report: &TickReport) -> Result<(), TelemetryError> {
        let Some(traces) = &mut self.traces else {
            return Ok(());
        };
        traces.trains.lines(trace_rows(report))?;
        traces.switches.lines(switch_rows(report))?;
        traces.signals.lines(signal_rows(report))
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<(), TelemetryError> {
        if let Some(traces) = &mut self.traces {
            traces.trains.flush()?;
            traces.switches.flush()?;
            traces.signals.flush()?;
        }
        let path = self.dir.join(METRICS_FILE);
        std::fs::write(&path, metrics_text(summary))
            .map_err(|source| TelemetryError::Write { file: path, source })
    }
}

// ===========================================================================
// In-memory sink
// ===========================================================================

/// Keeps every report in memory. Used for comparisons and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub reports: Vec<TickReport>,
    pub summary: Option<RunSummary>,
}

impl TelemetrySink for RecordingSink {
    fn record_tick(&mut self, report: &TickReport) -> Result<(), TelemetryError> {
        self.reports.push(report.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<(), TelemetryError> {
        self.summary = Some(*summary);
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
