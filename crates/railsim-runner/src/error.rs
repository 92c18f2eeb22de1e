use std::path::PathBuf;

use railsim_data::DataLoadError;

/// Failures while writing run telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("cannot create output directory {dir}: {source}")]
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write {file}: {source}")]
    Write {
        file: PathBuf,
        source: std::io::Error,
    },
}

/// Errors surfaced by the `railsim` driver.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Load(#[from] DataLoadError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// Writing the console view failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
