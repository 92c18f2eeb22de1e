//! Resolved level description consumed by [`crate::engine::Engine::new`].
//!
//! A `Level` is what every loader produces once spawn snapping and
//! destination lookup are done: positions are absolute and every train
//! refers to a concrete destination cell.

use serde::{Deserialize, Serialize};

use crate::grid::{Direction, Grid, Position};
use crate::sim::Ticks;
use crate::switch::SwitchDef;

/// Weather preset. Carried as level metadata; no decision logic reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Normal,
    Rain,
    Fog,
}

impl Weather {
    pub fn name(self) -> &'static str {
        match self {
            Weather::Normal => "NORMAL",
            Weather::Rain => "RAIN",
            Weather::Fog => "FOG",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NORMAL" => Some(Weather::Normal),
            "RAIN" => Some(Weather::Rain),
            "FOG" => Some(Weather::Fog),
            _ => None,
        }
    }
}

/// One train as scheduled by a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainDef {
    pub spawn_tick: Ticks,
    pub position: Position,
    pub direction: Direction,
    pub destination: Position,
    /// Group tag, the destination index in the source file.
    pub color: u32,
}

/// A complete, validated level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub name: String,
    /// Recorded for reproducibility; the simulation is fully deterministic
    /// without it.
    pub seed: u64,
    pub weather: Weather,
    pub grid: Grid,
    pub switches: Vec<SwitchDef>,
    /// Trains in id order: `trains[i]` becomes `TrainId(i)`.
    pub trains: Vec<TrainDef>,
}

impl Level {
    /// A level with the given grid and nothing else.
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            seed: 0,
            weather: Weather::Normal,
            grid,
            switches: Vec::new(),
            trains: Vec::new(),
        }
    }

    pub fn with_switch(mut self, def: SwitchDef) -> Self {
        self.switches.push(def);
        self
    }

    pub fn with_train(mut self, def: TrainDef) -> Self {
        self.trains.push(def);
        self
    }
}
