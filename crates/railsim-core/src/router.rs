//! Per-train direction and next-cell resolution.
//!
//! Routing is greedy and local: the current tile alone decides the next
//! direction, except on a crossing where the train turns toward its
//! destination. Switch tiles pass trains straight through whatever their
//! state; state only feeds signals and logs.

use crate::grid::{Direction, Grid, Position, Tile};
use crate::train::{CrashCause, PlannedMove, Train};

/// Result of routing one train for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// The train is on its destination and stays there.
    Park(PlannedMove),
    /// The train intends to move one cell.
    Advance(PlannedMove),
    /// The next cell is unusable; the train crashes this tick.
    Crash(CrashCause),
}

impl RouteDecision {
    /// The planned move, unless the train crashed.
    pub fn planned(self) -> Option<PlannedMove> {
        match self {
            RouteDecision::Park(m) | RouteDecision::Advance(m) => Some(m),
            RouteDecision::Crash(_) => None,
        }
    }
}

/// Direction after traversing `tile` while facing `dir`. Crossings are
/// handled by [`crossing_direction`] and keep `dir` here.
pub fn next_direction(tile: Tile, dir: Direction) -> Direction {
    use Direction::*;
    match tile {
        Tile::CurveSlash => match dir {
            Up => Right,
            Right => Up,
            Down => Left,
            Left => Down,
        },
        Tile::CurveBackslash => match dir {
            Up => Left,
            Left => Up,
            Down => Right,
            Right => Down,
        },
        _ => dir,
    }
}

/// Smart routing on a crossing: head along the axis with more remaining
/// distance, never reversing. Ties keep the current direction.
pub fn crossing_direction(pos: Position, dir: Direction, destination: Position) -> Direction {
    let dx = destination.x - pos.x;
    let dy = destination.y - pos.y;

    let preferred = if dx.abs() > dy.abs() {
        if dx > 0 { Direction::Right } else { Direction::Left }
    } else if dy.abs() > dx.abs() {
        if dy > 0 { Direction::Down } else { Direction::Up }
    } else {
        return dir;
    };

    if preferred == dir.opposite() {
        dir
    } else {
        preferred
    }
}

/// Plan one tick of movement for `train`. Never mutates the train.
pub fn plan_route(grid: &Grid, train: &Train) -> RouteDecision {
    if train.at_destination() {
        return RouteDecision::Park(PlannedMove::advance(train.position, train.direction));
    }

    let dir = match grid.tile(train.position) {
        Some(Tile::Crossing) => crossing_direction(train.position, train.direction, train.destination),
        Some(tile) => next_direction(tile, train.direction),
        None => train.direction,
    };

    let candidate = train.position.step(dir);
    match grid.tile(candidate) {
        None => RouteDecision::Crash(CrashCause::OffGrid),
        Some(tile) if !tile.is_track() => RouteDecision::Crash(CrashCause::InvalidTile),
        Some(_) => RouteDecision::Advance(PlannedMove::advance(candidate, dir)),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
