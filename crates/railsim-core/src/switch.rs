//! Switch state, traffic counters, deferred flips and signal lights.
//!
//! Switches are keyed by an opaque [`SwitchId`]; the letter on the grid is
//! kept only as `label` for level files and logs.
//!
//! # Flip discipline
//!
//! Counters are bumped when a train enters a switch tile. When a counter
//! reaches its threshold the switch is *queued*, never flipped on the spot.
//! [`SwitchBank::apply_deferred_flips`] runs once per tick after movement
//! commit, so a flip requested mid-tick cannot affect routing already decided
//! in that tick.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::grid::{Direction, Position};
use crate::id::SwitchId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from the manual control surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("no switch is defined for label '{0}'")]
    UnknownSwitch(char),
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a switch pools its traffic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchMode {
    /// One shared counter (slot 0) regardless of direction.
    Global,
    /// One counter per travel direction.
    PerDirection,
}

impl SwitchMode {
    /// Name as written to the switch trace and level files.
    pub fn name(self) -> &'static str {
        match self {
            SwitchMode::Global => "GLOBAL",
            SwitchMode::PerDirection => "PER_DIR",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "GLOBAL" => Some(SwitchMode::Global),
            "PER_DIR" => Some(SwitchMode::PerDirection),
            _ => None,
        }
    }
}

/// Binary switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchState {
    Normal = 0,
    Reverse = 1,
}

impl SwitchState {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(SwitchState::Normal),
            1 => Some(SwitchState::Reverse),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn toggled(self) -> Self {
        match self {
            SwitchState::Normal => SwitchState::Reverse,
            SwitchState::Reverse => SwitchState::Normal,
        }
    }
}

/// Advisory signal colour shown at a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalColor {
    Green,
    Yellow,
    Red,
}

impl SignalColor {
    /// Colour for the closest active train being `distance` cells away.
    pub fn for_distance(distance: Option<u32>) -> Self {
        match distance {
            Some(0) => SignalColor::Red,
            Some(d) if d <= 2 => SignalColor::Yellow,
            _ => SignalColor::Green,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SignalColor::Green => "GREEN",
            SignalColor::Yellow => "YELLOW",
            SignalColor::Red => "RED",
        }
    }
}

// ---------------------------------------------------------------------------
// Switch definition (level data)
// ---------------------------------------------------------------------------

/// A switch as described by a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchDef {
    pub label: char,
    pub mode: SwitchMode,
    pub initial_state: SwitchState,
    /// Per-slot thresholds. 0 disables auto-flip for that slot.
    pub thresholds: [u32; 4],
    pub state_names: [String; 2],
}

// ---------------------------------------------------------------------------
// Switch
// ---------------------------------------------------------------------------

/// Runtime state of one switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub label: char,
    pub mode: SwitchMode,
    pub state: SwitchState,
    /// Traffic counters, one per direction. `Global` uses slot 0 only.
    pub counters: [u32; 4],
    pub thresholds: [u32; 4],
    pub state_names: [String; 2],
    pub flip_queued: bool,
    pub signal: SignalColor,
    /// First occurrence of the switch letter on the grid, if any.
    pub tile: Option<Position>,
}

impl Switch {
    pub fn from_def(def: &SwitchDef, tile: Option<Position>) -> Self {
        Self {
            label: def.label,
            mode: def.mode,
            state: def.initial_state,
            counters: [0; 4],
            thresholds: def.thresholds,
            state_names: def.state_names.clone(),
            flip_queued: false,
            signal: SignalColor::Green,
            tile,
        }
    }

    /// Count one train entering the switch while travelling `dir`.
    pub fn record_entry(&mut self, dir: Direction) {
        let slot = match self.mode {
            SwitchMode::PerDirection => dir.index(),
            SwitchMode::Global => 0,
        };
        self.counters[slot] += 1;
    }

    /// True when some checked slot has reached a non-zero threshold.
    pub fn threshold_reached(&self) -> bool {
        let slots = match self.mode {
            SwitchMode::PerDirection => 0..4,
            SwitchMode::Global => 0..1,
        };
        slots
            .into_iter()
            .any(|i| self.thresholds[i] > 0 && self.counters[i] >= self.thresholds[i])
    }

    /// Toggle the state and reset every counter. Clears the queued flag.
    fn apply_flip(&mut self) {
        self.state = self.state.toggled();
        self.counters = [0; 4];
        self.flip_queued = false;
    }

    /// Human-readable name of the current state.
    pub fn state_name(&self) -> &str {
        &self.state_names[self.state.index()]
    }
}

// ---------------------------------------------------------------------------
// SwitchBank
// ---------------------------------------------------------------------------

/// Every switch of a level plus the global flip counter.
#[derive(Debug, Clone, Default)]
pub struct SwitchBank {
    switches: SlotMap<SwitchId, Switch>,
    by_label: HashMap<char, SwitchId>,
    total_flips: u64,
}

impl SwitchBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a switch. A second definition for the same label replaces the
    /// first one's lookup entry; loaders reject duplicates before this point.
    pub fn insert(&mut self, def: &SwitchDef, tile: Option<Position>) -> SwitchId {
        let id = self.switches.insert(Switch::from_def(def, tile));
        self.by_label.insert(def.label, id);
        id
    }

    pub fn id_for(&self, label: char) -> Option<SwitchId> {
        self.by_label.get(&label).copied()
    }

    pub fn get(&self, id: SwitchId) -> Option<&Switch> {
        self.switches.get(id)
    }

    pub fn get_by_label(&self, label: char) -> Option<&Switch> {
        self.id_for(label).and_then(|id| self.switches.get(id))
    }

    /// Iterate switches in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (SwitchId, &Switch)> {
        self.switches.iter()
    }

    pub fn len(&self) -> usize {
        self.switches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.switches.is_empty()
    }

    /// Flips applied by the automatic pipeline since the run started.
    pub fn total_flips(&self) -> u64 {
        self.total_flips
    }

    /// Count a train entering the switch `id` while travelling `dir`.
    pub fn record_entry(&mut self, id: SwitchId, dir: Direction) {
        if let Some(sw) = self.switches.get_mut(id) {
            sw.record_entry(dir);
        }
    }

    /// Queue a flip on every switch whose threshold has been reached.
    /// Returns the switches queued by this call.
    pub fn queue_flips(&mut self) -> Vec<SwitchId> {
        let mut queued = Vec::new();
        for (id, sw) in &mut self.switches {
            if sw.threshold_reached() {
                sw.flip_queued = true;
                queued.push(id);
            }
        }
        queued
    }

    /// Apply every queued flip: toggle state, zero counters, clear the
    /// queue flag and bump the flip counter. Returns the flipped switches.
    pub fn apply_deferred_flips(&mut self) -> Vec<SwitchId> {
        let mut flipped = Vec::new();
        for (id, sw) in &mut self.switches {
            if sw.flip_queued {
                sw.apply_flip();
                self.total_flips += 1;
                flipped.push(id);
            }
        }
        flipped
    }

    /// Recompute every signal from the positions of the active trains.
    /// Switches whose letter is not on the grid keep their signal. Returns
    /// the switches whose colour changed.
    pub fn update_signals(&mut self, active: &[Position]) -> Vec<(SwitchId, SignalColor)> {
        let mut changed = Vec::new();
        for (id, sw) in &mut self.switches {
            let Some(tile) = sw.tile else {
                continue;
            };
            let nearest = active.iter().map(|p| p.manhattan(tile)).min();
            let color = SignalColor::for_distance(nearest);
            if color != sw.signal {
                sw.signal = color;
                changed.push((id, color));
            }
        }
        changed
    }

    /// Manually flip the switch labelled `label`, bypassing counters and the
    /// flip queue. Does not count toward [`Self::total_flips`].
    pub fn toggle(&mut self, label: char) -> Result<SwitchState, ControlError> {
        let id = self.id_for(label).ok_or(ControlError::UnknownSwitch(label))?;
        let sw = self
            .switches
            .get_mut(id)
            .ok_or(ControlError::UnknownSwitch(label))?;
        sw.state = sw.state.toggled();
        Ok(sw.state)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn def(label: char, mode: SwitchMode, thresholds: [u32; 4]) -> SwitchDef {
        SwitchDef {
            label,
            mode,
            initial_state: SwitchState::Normal,
            thresholds,
            state_names: ["STRAIGHT".into(), "TURN".into()],
        }
    }

    // -----------------------------------------------------------------------
    // Counters
    // -----------------------------------------------------------------------

    #[test]
    fn global_mode_pools_all_directions_in_slot_zero() {
        let mut sw = Switch::from_def(&def('A', SwitchMode::Global, [3, 0, 0, 0]), None);
        sw.record_entry(Direction::Up);
        sw.record_entry(Direction::Left);
        sw.record_entry(Direction::Down);
        assert_eq!(sw.counters, [3, 0, 0, 0]);
        assert!(sw.threshold_reached());
    }

    #[test]
    fn per_direction_mode_counts_each_direction() {
        let mut sw = Switch::from_def(&def('B', SwitchMode::PerDirection, [0, 2, 0, 0]), None);
        sw.record_entry(Direction::Right);
        sw.record_entry(Direction::Left);
        assert_eq!(sw.counters, [0, 1, 0, 1]);
        assert!(!sw.threshold_reached());
        sw.record_entry(Direction::Right);
        assert!(sw.threshold_reached());
    }

    #[test]
    fn zero_threshold_never_flips() {
        let mut sw = Switch::from_def(&def('C', SwitchMode::PerDirection, [0, 0, 0, 0]), None);
        for _ in 0..10 {
            sw.record_entry(Direction::Up);
        }
        assert!(!sw.threshold_reached());
    }

    #[test]
    fn global_mode_ignores_other_slots() {
        let mut sw = Switch::from_def(&def('E', SwitchMode::Global, [0, 1, 1, 1]), None);
        sw.counters = [0, 5, 5, 5];
        assert!(!sw.threshold_reached());
    }

    // -----------------------------------------------------------------------
    // Deferred flips
    // -----------------------------------------------------------------------

    #[test]
    fn queued_flip_applies_only_when_requested() {
        let mut bank = SwitchBank::new();
        let id = bank.insert(&def('A', SwitchMode::Global, [1, 0, 0, 0]), None);
        bank.record_entry(id, Direction::Right);

        let queued = bank.queue_flips();
        assert_eq!(queued, vec![id]);
        let sw = bank.get(id).unwrap();
        assert!(sw.flip_queued);
        assert_eq!(sw.state, SwitchState::Normal);
        assert_eq!(sw.counters[0], 1);

        let flipped = bank.apply_deferred_flips();
        assert_eq!(flipped, vec![id]);
        let sw = bank.get(id).unwrap();
        assert!(!sw.flip_queued);
        assert_eq!(sw.state, SwitchState::Reverse);
        assert_eq!(sw.counters, [0; 4]);
        assert_eq!(bank.total_flips(), 1);
    }

    #[test]
    fn apply_without_queue_is_a_no_op() {
        let mut bank = SwitchBank::new();
        let id = bank.insert(&def('A', SwitchMode::Global, [5, 0, 0, 0]), None);
        bank.record_entry(id, Direction::Up);
        assert!(bank.queue_flips().is_empty());
        assert!(bank.apply_deferred_flips().is_empty());
        assert_eq!(bank.get(id).unwrap().counters[0], 1);
        assert_eq!(bank.total_flips(), 0);
    }

    // -----------------------------------------------------------------------
    // Signals
    // -----------------------------------------------------------------------

    #[test]
    fn signal_colour_by_distance() {
        assert_eq!(SignalColor::for_distance(Some(0)), SignalColor::Red);
        assert_eq!(SignalColor::for_distance(Some(1)), SignalColor::Yellow);
        assert_eq!(SignalColor::for_distance(Some(2)), SignalColor::Yellow);
        assert_eq!(SignalColor::for_distance(Some(3)), SignalColor::Green);
        assert_eq!(SignalColor::for_distance(None), SignalColor::Green);
    }

    #[test]
    fn update_signals_uses_nearest_train() {
        let mut bank = SwitchBank::new();
        let id = bank.insert(
            &def('A', SwitchMode::Global, [0; 4]),
            Some(Position::new(5, 5)),
        );
        let changed = bank.update_signals(&[Position::new(0, 0), Position::new(5, 4)]);
        assert_eq!(changed, vec![(id, SignalColor::Yellow)]);

        let changed = bank.update_signals(&[Position::new(5, 5)]);
        assert_eq!(changed, vec![(id, SignalColor::Red)]);

        // Unchanged colour is not reported again.
        assert!(bank.update_signals(&[Position::new(5, 5)]).is_empty());

        let changed = bank.update_signals(&[]);
        assert_eq!(changed, vec![(id, SignalColor::Green)]);
    }

    #[test]
    fn switch_off_grid_keeps_its_signal() {
        let mut bank = SwitchBank::new();
        let id = bank.insert(&def('A', SwitchMode::Global, [0; 4]), None);
        assert!(bank.update_signals(&[Position::new(0, 0)]).is_empty());
        assert_eq!(bank.get(id).unwrap().signal, SignalColor::Green);
    }

    // -----------------------------------------------------------------------
    // Manual toggle
    // -----------------------------------------------------------------------

    #[test]
    fn manual_toggle_bypasses_counters() {
        let mut bank = SwitchBank::new();
        let id = bank.insert(&def('K', SwitchMode::Global, [2, 0, 0, 0]), None);
        bank.record_entry(id, Direction::Up);

        assert_eq!(bank.toggle('K'), Ok(SwitchState::Reverse));
        let sw = bank.get(id).unwrap();
        assert_eq!(sw.counters[0], 1);
        assert_eq!(sw.state_name(), "TURN");
        assert_eq!(bank.total_flips(), 0);

        assert_eq!(bank.toggle('K'), Ok(SwitchState::Normal));
    }

    #[test]
    fn manual_toggle_unknown_label() {
        let mut bank = SwitchBank::new();
        assert_eq!(bank.toggle('X'), Err(ControlError::UnknownSwitch('X')));
    }

    #[test]
    fn lookup_by_label() {
        let mut bank = SwitchBank::new();
        let a = bank.insert(&def('A', SwitchMode::Global, [0; 4]), None);
        let b = bank.insert(&def('B', SwitchMode::PerDirection, [0; 4]), None);
        assert_eq!(bank.id_for('A'), Some(a));
        assert_eq!(bank.id_for('B'), Some(b));
        assert_eq!(bank.id_for('C'), None);
        assert_eq!(bank.get_by_label('B').unwrap().mode, SwitchMode::PerDirection);
        assert_eq!(bank.len(), 2);
    }

    #[test]
    fn mode_names_match_trace_format() {
        assert_eq!(SwitchMode::Global.name(), "GLOBAL");
        assert_eq!(SwitchMode::PerDirection.name(), "PER_DIR");
    }
}
