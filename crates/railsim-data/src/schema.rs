//! Serde data structs for level files, and their resolution into a
//! [`Level`].
//!
//! `LevelData` is the on-disk shape shared by every format: the `.lvl` text
//! parser produces it, and RON / JSON / TOML deserialize straight into it.
//! [`build_level`] then snaps trains to spawn points, resolves destination
//! indices and validates switch definitions.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use railsim_core::grid::{Direction, Grid, Position, Tile};
use railsim_core::level::{Level, TrainDef, Weather};
use railsim_core::switch::{SwitchDef, SwitchMode, SwitchState};
use serde::{Deserialize, Serialize};

use crate::loader::DataLoadError;

// ===========================================================================
// Data structs
// ===========================================================================

/// A level as written in a data file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelData {
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub weather: Weather,
    pub rows: usize,
    pub cols: usize,
    /// One string per grid row. Short rows are padded with blanks.
    pub map: Vec<String>,
    #[serde(default)]
    pub switches: Vec<SwitchData>,
    #[serde(default)]
    pub trains: Vec<TrainData>,
}

/// A switch line: `L MODE STATE K0 K1 K2 K3 NAME0 NAME1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchData {
    pub label: char,
    pub mode: SwitchMode,
    /// Initial state index, 0 or 1.
    #[serde(default)]
    pub state: u8,
    pub thresholds: [u32; 4],
    pub names: [String; 2],
}

/// A train line: `TICK X Y DIR DEST_INDEX`.
///
/// `(x, y)` is only a hint; the train starts on the nearest spawn tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainData {
    pub tick: u64,
    pub x: i32,
    pub y: i32,
    /// 0 = up, 1 = right, 2 = down, 3 = left.
    pub direction: u8,
    /// Index into the grid's `D` tiles in row-major order.
    pub destination: usize,
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Largest grid a level file may declare, matching the 50x100 playfield of
/// the classic level format.
pub const MAX_ROWS: usize = 50;
pub const MAX_COLS: usize = 100;

/// Spawn point closest to `(x, y)` by Manhattan distance. The first point in
/// row-major order wins ties.
pub fn nearest_spawn(spawns: &[Position], hint: Position) -> Option<Position> {
    spawns
        .iter()
        .copied()
        .enumerate()
        .min_by_key(|(i, p)| (p.manhattan(hint), *i))
        .map(|(_, p)| p)
}

/// Validate `data` and turn it into an engine-ready [`Level`]. `file` is
/// only used in error messages.
pub fn build_level(data: &LevelData, file: &Path) -> Result<Level, DataLoadError> {
    let file: PathBuf = file.to_path_buf();

    let invalid = |file: PathBuf| DataLoadError::InvalidDimensions {
        file,
        rows: data.rows,
        cols: data.cols,
    };
    if !(1..=MAX_ROWS).contains(&data.rows) || !(1..=MAX_COLS).contains(&data.cols) {
        return Err(invalid(file));
    }

    let grid =
        Grid::parse_rows(data.rows, data.cols, &data.map).map_err(|_| invalid(file.clone()))?;
    let switches = build_switches(&data.switches, &grid, &file)?;
    let trains = build_trains(&data.trains, &grid, &file)?;

    tracing::debug!(
        level = %data.name,
        rows = data.rows,
        cols = data.cols,
        switches = switches.len(),
        trains = trains.len(),
        "level resolved"
    );

    Ok(Level {
        name: data.name.clone(),
        seed: data.seed,
        weather: data.weather,
        grid,
        switches,
        trains,
    })
}

fn build_switches(
    data: &[SwitchData],
    grid: &Grid,
    file: &Path,
) -> Result<Vec<SwitchDef>, DataLoadError> {
    let mut seen = HashSet::new();
    let mut defs = Vec::with_capacity(data.len());

    for sw in data {
        if !Tile::from_char(sw.label).is_switch() {
            return Err(DataLoadError::InvalidSwitchLabel {
                file: file.to_path_buf(),
                label: sw.label,
            });
        }
        if !seen.insert(sw.label) {
            return Err(DataLoadError::DuplicateSwitch {
                file: file.to_path_buf(),
                label: sw.label,
            });
        }
        let initial_state =
            SwitchState::from_index(sw.state).ok_or_else(|| DataLoadError::InvalidSwitchState {
                file: file.to_path_buf(),
                label: sw.label,
                value: sw.state,
            })?;

        if grid.find_first(Tile::Switch(sw.label)).is_none() {
            tracing::warn!(label = %sw.label, "switch is not placed on the grid");
        }

        defs.push(SwitchDef {
            label: sw.label,
            mode: sw.mode,
            initial_state,
            thresholds: sw.thresholds,
            state_names: sw.names.clone(),
        });
    }

    Ok(defs)
}

fn build_trains(
    data: &[TrainData],
    grid: &Grid,
    file: &Path,
) -> Result<Vec<TrainDef>, DataLoadError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let spawns = grid.spawn_points();
    let destinations = grid.destination_points();

    data.iter()
        .enumerate()
        .map(|(i, t)| {
            let direction =
                Direction::from_index(t.direction).ok_or_else(|| DataLoadError::InvalidDirection {
                    file: file.to_path_buf(),
                    train: i,
                    value: t.direction,
                })?;
            let destination = *destinations.get(t.destination).ok_or_else(|| {
                DataLoadError::UnknownDestination {
                    file: file.to_path_buf(),
                    train: i,
                    index: t.destination,
                    available: destinations.len(),
                }
            })?;
            let hint = Position::new(t.x, t.y);
            let position = nearest_spawn(&spawns, hint).ok_or_else(|| {
                DataLoadError::NoSpawnPoint {
                    file: file.to_path_buf(),
                }
            })?;
            if position != hint {
                tracing::debug!(train = i, from = %hint, to = %position, "train snapped to spawn");
            }

            Ok(TrainDef {
                spawn_tick: t.tick,
                position,
                direction,
                destination,
                color: t.destination as u32,
            })
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
