//! Run configuration for the batch driver.
//!
//! Every field has a default, so an empty RON `()` / JSON `{}` / TOML file
//! is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::loader::{DataLoadError, deserialize_file};

/// How a run is driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Tick cap; the run stops here even if trains are still active.
    pub max_ticks: u64,
    /// Real-time pause between ticks, in milliseconds.
    pub tick_delay_ms: u64,
    /// Per-kind event ring buffer size.
    pub event_capacity: usize,
    /// Draw the grid to stdout after every tick.
    pub render: bool,
    pub telemetry: TelemetryConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_ticks: 500,
            tick_delay_ms: 0,
            event_capacity: 1024,
            render: false,
            telemetry: TelemetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Directory for `trace.csv`, `switches.csv`, `signals.csv` and
    /// `metrics.txt`. Created if missing.
    pub output_dir: PathBuf,
    /// When false only `metrics.txt` is written.
    pub write_traces: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
            write_traces: true,
        }
    }
}

/// Load a run config from a RON, JSON or TOML file.
pub fn load_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    let config: SimConfig = deserialize_file(path)?;
    tracing::debug!(path = %path.display(), ?config, "config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn empty_files_give_defaults() {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [("a.ron", "()"), ("b.json", "{}"), ("c.toml", "")] {
            let path = dir.path().join(name);
            fs::write(&path, body).unwrap();
            assert_eq!(load_config(&path).unwrap(), SimConfig::default(), "{name}");
        }
    }

    #[test]
    fn partial_toml_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(
            &path,
            "max_ticks = 50\nrender = true\n\n[telemetry]\noutput_dir = \"logs\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.max_ticks, 50);
        assert!(config.render);
        assert_eq!(config.tick_delay_ms, 0);
        assert_eq!(config.telemetry.output_dir, PathBuf::from("logs"));
        assert!(config.telemetry.write_traces);
    }

    #[test]
    fn ron_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.ron");
        fs::write(
            &path,
            "(event_capacity: 16, telemetry: (write_traces: false))",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.event_capacity, 16);
        assert!(!config.telemetry.write_traces);
        assert_eq!(config.telemetry.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn lvl_is_not_a_config_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.lvl");
        fs::write(&path, "").unwrap();
        assert!(matches!(
            load_config(&path),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
    }
}
