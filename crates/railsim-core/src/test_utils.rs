//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::engine::Engine;
use crate::grid::{Direction, Grid, Position};
use crate::level::{Level, TrainDef};
use crate::sim::Ticks;
use crate::switch::{SwitchDef, SwitchMode, SwitchState};

// ===========================================================================
// Definition helpers
// ===========================================================================

pub fn pos(x: i32, y: i32) -> Position {
    Position::new(x, y)
}

pub fn train_def(
    spawn_tick: Ticks,
    position: Position,
    direction: Direction,
    destination: Position,
) -> TrainDef {
    TrainDef {
        spawn_tick,
        position,
        direction,
        destination,
        color: 0,
    }
}

pub fn global_switch(label: char, threshold: u32) -> SwitchDef {
    SwitchDef {
        label,
        mode: SwitchMode::Global,
        initial_state: SwitchState::Normal,
        thresholds: [threshold, 0, 0, 0],
        state_names: ["STRAIGHT".into(), "DIVERGE".into()],
    }
}

pub fn per_direction_switch(label: char, thresholds: [u32; 4]) -> SwitchDef {
    SwitchDef {
        label,
        mode: SwitchMode::PerDirection,
        initial_state: SwitchState::Normal,
        thresholds,
        state_names: ["STRAIGHT".into(), "DIVERGE".into()],
    }
}

// ===========================================================================
// Levels
// ===========================================================================

/// One row `S--...--D` of `len` cells. Every train starts on `S` heading
/// right toward `D`. Spawn ticks should be at least one apart (and not 0
/// and 1 together) or the trains contend for the same cell.
pub fn straight_line_level(len: usize, spawn_ticks: &[Ticks]) -> Level {
    let row = format!("S{}D", "-".repeat(len.saturating_sub(2)));
    let grid = Grid::parse_rows(1, len, &[row]).unwrap();
    let dest = pos(len as i32 - 1, 0);
    spawn_ticks.iter().fold(Level::new("straight", grid), |level, &tick| {
        level.with_train(train_def(tick, pos(0, 0), Direction::Right, dest))
    })
}

/// `S-A---D` with a GLOBAL switch `A` and three trains spawning on ticks
/// 1, 2 and 3. Each train is counted on `A` the tick after it enters, so the
/// counts land on ticks 3, 4 and 5.
pub fn switch_line_level(threshold: u32) -> Level {
    let grid = Grid::parse_rows(1, 7, &["S-A---D"]).unwrap();
    (1..=3).fold(
        Level::new("switch-line", grid).with_switch(global_switch('A', threshold)),
        |level, tick| level.with_train(train_def(tick, pos(0, 0), Direction::Right, pos(6, 0))),
    )
}

/// A horizontal line crossed by a vertical one at `(3,3)`. Train 0 starts at
/// `(2,3)` heading right, 8 cells from `(10,3)`; train 1 starts at `(3,2)`
/// heading down, 3 cells from `(3,5)`. Both spawn on tick 1 and plan `(3,3)`.
pub fn crossing_level() -> Level {
    let grid = Grid::parse_rows(
        6,
        11,
        &[
            "   |       ",
            "   |       ",
            "   |       ",
            "---+------D",
            "   |       ",
            "   D       ",
        ],
    )
    .unwrap();
    Level::new("crossing", grid)
        .with_train(train_def(1, pos(2, 3), Direction::Right, pos(10, 3)))
        .with_train(train_def(1, pos(3, 2), Direction::Down, pos(3, 5)))
}

/// Two trains facing each other on adjacent cells, each 2 cells from its
/// destination.
pub fn head_on_level() -> Level {
    let grid = Grid::parse_rows(1, 6, &["D----D"]).unwrap();
    Level::new("head-on", grid)
        .with_train(train_def(1, pos(2, 0), Direction::Right, pos(4, 0)))
        .with_train(train_def(1, pos(3, 0), Direction::Left, pos(1, 0)))
}

/// A train on the right edge heading right.
pub fn off_grid_level() -> Level {
    let grid = Grid::parse_rows(1, 3, &["D--"]).unwrap();
    Level::new("off-grid", grid).with_train(train_def(1, pos(2, 0), Direction::Right, pos(0, 0)))
}

// ===========================================================================
// Engine helpers
// ===========================================================================

pub fn step_n(engine: &mut Engine, n: Ticks) {
    for _ in 0..n {
        engine.step();
    }
}
