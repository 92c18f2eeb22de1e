//! Train records and per-tick planned moves.

use serde::{Deserialize, Serialize};

use crate::grid::{Direction, Position};
use crate::id::TrainId;
use crate::sim::Ticks;

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle of a train. `Delivered` and `Crashed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainStatus {
    NotSpawned,
    Active,
    Delivered,
    Crashed,
}

impl TrainStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TrainStatus::Delivered | TrainStatus::Crashed)
    }
}

/// Why a train crashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrashCause {
    /// The planned move left the grid.
    OffGrid,
    /// The planned move landed on a non-track tile.
    InvalidTile,
    /// Two equidistant trains met head-on or on the same cell.
    CollisionTie,
}

// ---------------------------------------------------------------------------
// Planned move
// ---------------------------------------------------------------------------

/// Where a train intends to be at the end of the current tick.
///
/// Built by the router, possibly downgraded to a hold by collision
/// resolution, consumed by movement commit. Never outlives the tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedMove {
    pub target: Position,
    pub direction: Direction,
    /// Set when collision resolution made the train wait.
    pub held: bool,
}

impl PlannedMove {
    pub fn advance(target: Position, direction: Direction) -> Self {
        Self {
            target,
            direction,
            held: false,
        }
    }

    /// Stay on `position` facing `direction` because another train has
    /// priority.
    pub fn hold(position: Position, direction: Direction) -> Self {
        Self {
            target: position,
            direction,
            held: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Train
// ---------------------------------------------------------------------------

/// One train and its whole-run state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Train {
    pub id: TrainId,
    pub position: Position,
    pub direction: Direction,
    pub destination: Position,
    pub spawn_tick: Ticks,
    /// Group tag from the level (the destination index).
    pub color: u32,
    pub status: TrainStatus,
    /// Consecutive ticks spent held by collision resolution.
    pub wait_ticks: u32,
    /// All ticks ever spent held.
    pub total_wait_ticks: u32,
    /// Cell occupied before the last movement commit. `None` until the
    /// train has been through one commit. Only used to edge-trigger switch
    /// counters.
    pub previous_position: Option<Position>,
}

impl Train {
    pub fn new(
        id: TrainId,
        position: Position,
        direction: Direction,
        destination: Position,
        spawn_tick: Ticks,
        color: u32,
    ) -> Self {
        Self {
            id,
            position,
            direction,
            destination,
            spawn_tick,
            color,
            status: TrainStatus::NotSpawned,
            wait_ticks: 0,
            total_wait_ticks: 0,
            previous_position: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TrainStatus::Active
    }

    pub fn at_destination(&self) -> bool {
        self.position == self.destination
    }

    /// Remaining Manhattan distance to the destination.
    pub fn distance_to_destination(&self) -> u32 {
        self.position.manhattan(self.destination)
    }

    /// True when the train entered its current cell during the last commit.
    pub fn just_entered_cell(&self) -> bool {
        self.previous_position != Some(self.position)
    }
}
