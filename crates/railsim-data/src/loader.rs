//! Level and config loading: format detection, deserialization and the
//! top-level `load_*` entry points.
//!
//! Level files are `.lvl` (the line-oriented text format, see
//! [`crate::lvl`]) or `.ron` / `.json` / `.toml` encodings of
//! [`LevelData`]. Run configs are RON / JSON / TOML only.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use railsim_core::level::Level;

use crate::lvl::parse_lvl;
use crate::schema::{LevelData, build_level};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A structured (RON/JSON/TOML) deserialization error.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A malformed line in a `.lvl` file.
    #[error("{file}:{line}: {detail}")]
    Syntax {
        file: PathBuf,
        line: usize,
        detail: String,
    },

    /// A required `.lvl` section is absent.
    #[error("missing {section} section in {file}")]
    MissingSection { file: PathBuf, section: &'static str },

    #[error("invalid grid size {rows}x{cols} in {file}")]
    InvalidDimensions {
        file: PathBuf,
        rows: usize,
        cols: usize,
    },

    /// Trains are scheduled but the map has no `S` tile.
    #[error("no spawn point on the map in {file}")]
    NoSpawnPoint { file: PathBuf },

    #[error("train {train} refers to destination {index}, but {file} has only {available}")]
    UnknownDestination {
        file: PathBuf,
        train: usize,
        index: usize,
        available: usize,
    },

    #[error("train {train} has invalid direction {value} in {file}")]
    InvalidDirection { file: PathBuf, train: usize, value: u8 },

    #[error("switch '{label}' has invalid state {value} in {file}")]
    InvalidSwitchState {
        file: PathBuf,
        label: char,
        value: u8,
    },

    /// Switch labels must be `A`-`Z` other than `S` and `D`.
    #[error("'{label}' is not a valid switch label in {file}")]
    InvalidSwitchLabel { file: PathBuf, label: char },

    #[error("switch '{label}' is defined twice in {file}")]
    DuplicateSwitch { file: PathBuf, label: char },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Lvl,
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("lvl") => Ok(Format::Lvl),
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` according to a structured `format`.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    path: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Lvl => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Read a file and deserialize it according to its format (detected from
/// extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Levels
// ===========================================================================

/// Read a level file into its unresolved data form.
pub fn read_level_data(path: &Path) -> Result<LevelData, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    match format {
        Format::Lvl => parse_lvl(&content, path),
        _ => deserialize_str(&content, format, path),
    }
}

/// Load and resolve a level file.
pub fn load_level(path: &Path) -> Result<Level, DataLoadError> {
    let data = read_level_data(path)?;
    let level = build_level(&data, path)?;
    tracing::info!(
        path = %path.display(),
        level = %level.name,
        trains = level.trains.len(),
        "level loaded"
    );
    Ok(level)
}

// ===========================================================================
// Tests
// ===========================================================================
