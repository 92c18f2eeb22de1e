//! Read-only query API for inspecting simulation state.
//!
//! Snapshot types are owned copies, never references into engine storage,
//! so renderers and telemetry sinks can hold on to them across ticks.

use crate::grid::{Direction, Position};
use crate::id::{SwitchId, TrainId};
use crate::sim::Ticks;
use crate::switch::{SignalColor, Switch, SwitchMode, SwitchState};
use crate::train::{Train, TrainStatus};

// ---------------------------------------------------------------------------
// Train snapshot
// ---------------------------------------------------------------------------

/// Per-tick state of a train as written to the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceStatus {
    Moving,
    /// Held in place by collision resolution this tick.
    Waiting,
    Delivered,
    Crashed,
}

impl TraceStatus {
    pub fn name(self) -> &'static str {
        match self {
            TraceStatus::Moving => "MOVING",
            TraceStatus::Waiting => "WAITING",
            TraceStatus::Delivered => "DELIVERED",
            TraceStatus::Crashed => "CRASHED",
        }
    }
}

/// A view of one train at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainSnapshot {
    pub id: TrainId,
    pub position: Position,
    pub direction: Direction,
    pub destination: Position,
    pub status: TraceStatus,
    pub wait_ticks: u32,
    pub color: u32,
}

impl TrainSnapshot {
    /// Snapshot a train that is active or became terminal this tick.
    /// Returns `None` for trains that have not spawned yet.
    pub fn of(train: &Train) -> Option<Self> {
        let status = match train.status {
            TrainStatus::NotSpawned => return None,
            TrainStatus::Active if train.wait_ticks > 0 => TraceStatus::Waiting,
            TrainStatus::Active => TraceStatus::Moving,
            TrainStatus::Delivered => TraceStatus::Delivered,
            TrainStatus::Crashed => TraceStatus::Crashed,
        };
        Some(Self {
            id: train.id,
            position: train.position,
            direction: train.direction,
            destination: train.destination,
            status,
            wait_ticks: train.wait_ticks,
            color: train.color,
        })
    }
}

// ---------------------------------------------------------------------------
// Switch snapshot
// ---------------------------------------------------------------------------

/// A view of one switch at the end of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchSnapshot {
    pub id: SwitchId,
    pub label: char,
    pub mode: SwitchMode,
    pub state: SwitchState,
    pub state_name: String,
    pub counters: [u32; 4],
    pub signal: SignalColor,
    pub tile: Option<Position>,
}

impl SwitchSnapshot {
    pub fn of(id: SwitchId, switch: &Switch) -> Self {
        Self {
            id,
            label: switch.label,
            mode: switch.mode,
            state: switch.state,
            state_name: switch.state_name().to_owned(),
            counters: switch.counters,
            signal: switch.signal,
            tile: switch.tile,
        }
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Everything a telemetry sink needs to record one tick.
///
/// `trains` lists every active train plus each train that became delivered
/// or crashed during this tick, in id order. `switches` lists every switch
/// in label order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: Ticks,
    pub trains: Vec<TrainSnapshot>,
    pub switches: Vec<SwitchSnapshot>,
}

impl TickReport {
    pub fn trains_with(&self, status: TraceStatus) -> impl Iterator<Item = &TrainSnapshot> {
        self.trains.iter().filter(move |t| t.status == status)
    }
}
