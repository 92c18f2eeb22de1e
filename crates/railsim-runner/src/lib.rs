//! Batch driver for the rail simulator: CSV telemetry, console rendering and
//! the `railsim` binary's plumbing.

pub mod cli;
pub mod driver;
pub mod error;
pub mod render;
pub mod telemetry;

pub use driver::{RunReport, run_level};
pub use error::{RunnerError, TelemetryError};
pub use telemetry::{CsvTelemetry, RecordingSink, TelemetrySink};
