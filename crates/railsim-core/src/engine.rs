//! The simulation engine: owns grid, trains and switches and runs the
//! per-tick phase pipeline.
//!
//! # Phase order
//!
//! Each [`Engine::step`] runs, in this fixed order:
//! 1. **Clock** -- increment the tick counter.
//! 2. **Spawn** -- trains scheduled for this tick become active.
//! 3. **Route** -- plan one move per active train; unusable cells mark a crash.
//! 4. **Switch counters** -- count trains that entered a switch tile last tick.
//! 5. **Flip queue** -- queue flips for switches whose threshold is reached.
//! 6. **Collisions** -- settle convergent and swap conflicts on planned moves.
//! 7. **Crash tally** -- the single place a crash is counted and applied.
//! 8. **Commit** -- snapshot previous positions, then apply planned moves.
//! 9. **Deferred flips** -- apply every queued flip.
//! 10. **Arrivals** -- trains on their destination are delivered.
//! 11. **Signals** -- recompute signal colours.
//! 12. **Telemetry** -- build the [`TickReport`], deliver events, hash state.

use crate::collision::{CollisionOutcome, Contender, resolve_collisions};
use crate::event::{Event, EventBus, EventKind, PassiveListener};
use crate::grid::{Grid, Tile};
use crate::id::{SwitchId, TrainId};
use crate::level::Level;
use crate::query::{SwitchSnapshot, TickReport, TrainSnapshot};
use crate::router::{RouteDecision, plan_route};
use crate::sim::{RunOutcome, SimState, StateHash, Ticks};
use crate::switch::{ControlError, Switch, SwitchBank, SwitchState};
use crate::train::{CrashCause, PlannedMove, Train, TrainStatus};

/// Default ring-buffer capacity per event kind.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Whole-run tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub delivered: u32,
    pub crashed: u32,
    /// Automatic flips only; manual toggles are not counted.
    pub flips: u64,
}

/// Per-tick working set. Never outlives one `step`.
struct TickScratch {
    plans: Vec<Option<PlannedMove>>,
    crashes: Vec<Option<CrashCause>>,
    became_terminal: Vec<bool>,
}

impl TickScratch {
    fn new(trains: usize) -> Self {
        Self {
            plans: vec![None; trains],
            crashes: vec![None; trains],
            became_terminal: vec![false; trains],
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The rail simulation engine.
#[derive(Debug)]
pub struct Engine {
    name: String,
    grid: Grid,
    /// Indexed by `TrainId`.
    trains: Vec<Train>,
    switches: SwitchBank,
    sim_state: SimState,
    delivered: u32,
    crashed: u32,
    event_bus: EventBus,
    last_report: TickReport,
    last_state_hash: u64,
}

impl Engine {
    /// Build an engine from a level. Trains scheduled for tick 0 are
    /// activated here; tick 1 is the first simulated tick.
    pub fn new(level: &Level) -> Self {
        Self::with_event_capacity(level, DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(level: &Level, event_capacity: usize) -> Self {
        let mut defs: Vec<_> = level.switches.iter().collect();
        defs.sort_by_key(|d| d.label);

        let mut switches = SwitchBank::new();
        for def in defs {
            let tile = level.grid.find_first(Tile::Switch(def.label));
            switches.insert(def, tile);
        }

        let trains = level
            .trains
            .iter()
            .enumerate()
            .map(|(i, def)| {
                Train::new(
                    TrainId(i as u32),
                    def.position,
                    def.direction,
                    def.destination,
                    def.spawn_tick,
                    def.color,
                )
            })
            .collect();

        let mut engine = Self {
            name: level.name.clone(),
            grid: level.grid.clone(),
            trains,
            switches,
            sim_state: SimState::new(),
            delivered: 0,
            crashed: 0,
            event_bus: EventBus::new(event_capacity),
            last_report: TickReport::default(),
            last_state_hash: 0,
        };

        engine.phase_spawn();
        engine.last_report = engine.build_report(&TickScratch::new(engine.trains.len()));
        engine.last_state_hash = engine.compute_state_hash();

        tracing::debug!(
            level = %engine.name,
            trains = engine.trains.len(),
            switches = engine.switches.len(),
            "engine created"
        );
        engine
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// All trains in id order.
    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    pub fn train(&self, id: TrainId) -> Option<&Train> {
        self.trains.get(id.index())
    }

    pub fn switches(&self) -> &SwitchBank {
        &self.switches
    }

    pub fn switch(&self, id: SwitchId) -> Option<&Switch> {
        self.switches.get(id)
    }

    pub fn switch_by_label(&self, label: char) -> Option<&Switch> {
        self.switches.get_by_label(label)
    }

    pub fn counters(&self) -> RunCounters {
        RunCounters {
            delivered: self.delivered,
            crashed: self.crashed,
            flips: self.switches.total_flips(),
        }
    }

    /// The last fully computed tick. 0 before the first step.
    pub fn tick(&self) -> Ticks {
        self.sim_state.tick
    }

    /// Hash of the state at the end of the last step.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    /// Report of the last step (or of the pre-run spawn before any step).
    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    /// Trains that have spawned so far.
    pub fn spawned_count(&self) -> usize {
        self.trains
            .iter()
            .filter(|t| t.status != TrainStatus::NotSpawned)
            .count()
    }

    /// Sum of every train's held ticks.
    pub fn total_wait_ticks(&self) -> u64 {
        self.trains.iter().map(|t| t.total_wait_ticks as u64).sum()
    }

    /// True when no train is active and none is scheduled after the
    /// current tick.
    pub fn is_complete(&self) -> bool {
        let tick = self.sim_state.tick;
        !self.trains.iter().any(|t| {
            t.is_active() || (t.status == TrainStatus::NotSpawned && t.spawn_tick > tick)
        })
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn suppress_event(&mut self, kind: EventKind) {
        self.event_bus.suppress(kind);
    }

    /// Register a passive listener. Events are delivered at the end of each
    /// step.
    pub fn on_event(&mut self, kind: EventKind, listener: PassiveListener) {
        self.event_bus.on_passive(kind, listener);
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // -----------------------------------------------------------------------
    // Manual control
    // -----------------------------------------------------------------------

    /// Flip a switch immediately, bypassing its counters. Intended for use
    /// between steps.
    pub fn toggle_switch_state(&mut self, label: char) -> Result<SwitchState, ControlError> {
        let state = self.switches.toggle(label)?;
        let switch = self
            .switches
            .id_for(label)
            .ok_or(ControlError::UnknownSwitch(label))?;
        self.event_bus.emit(Event::SwitchToggled {
            switch,
            state,
            tick: self.sim_state.tick,
        });
        tracing::debug!(label = %label, ?state, "switch toggled manually");
        Ok(state)
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Run one tick through every phase and return its report.
    pub fn step(&mut self) -> &TickReport {
        self.sim_state.tick += 1;
        let tick = self.sim_state.tick;
        tracing::trace!(tick, "step");

        let mut scratch = TickScratch::new(self.trains.len());

        self.phase_spawn();
        self.phase_route(&mut scratch);
        self.phase_switch_counters(&scratch);
        self.phase_queue_flips();
        self.phase_collisions(&mut scratch);
        self.phase_crash_tally(&mut scratch);
        self.phase_commit(&scratch);
        self.phase_deferred_flips();
        self.phase_arrivals(&mut scratch);
        self.phase_signals();
        self.phase_telemetry(&scratch);

        &self.last_report
    }

    /// Step until the run completes or `max_ticks` is reached.
    pub fn run(&mut self, max_ticks: Ticks) -> RunOutcome {
        while !self.is_complete() && self.sim_state.tick < max_ticks {
            self.step();
        }
        let tick = self.sim_state.tick;
        if self.is_complete() {
            RunOutcome::Completed { tick }
        } else {
            RunOutcome::TickCapReached { tick }
        }
    }

    // -----------------------------------------------------------------------
    // Phase: spawn
    // -----------------------------------------------------------------------

    fn phase_spawn(&mut self) {
        let tick = self.sim_state.tick;
        for train in &mut self.trains {
            if train.status == TrainStatus::NotSpawned && train.spawn_tick == tick {
                train.status = TrainStatus::Active;
                self.event_bus.emit(Event::TrainSpawned {
                    train: train.id,
                    position: train.position,
                    tick,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase: route
    // -----------------------------------------------------------------------

    fn phase_route(&mut self, scratch: &mut TickScratch) {
        for (i, train) in self.trains.iter().enumerate() {
            if !train.is_active() {
                continue;
            }
            let decision = plan_route(&self.grid, train);
            if let RouteDecision::Crash(cause) = decision {
                scratch.crashes[i] = Some(cause);
            }
            scratch.plans[i] = decision.planned();
        }
    }

    // -----------------------------------------------------------------------
    // Phase: switch counters and flip queue
    // -----------------------------------------------------------------------

    fn phase_switch_counters(&mut self, scratch: &TickScratch) {
        for (i, train) in self.trains.iter().enumerate() {
            if !train.is_active() || scratch.crashes[i].is_some() || !train.just_entered_cell() {
                continue;
            }
            let Some(label) = self.grid.tile(train.position).and_then(Tile::switch_label) else {
                continue;
            };
            if let Some(id) = self.switches.id_for(label) {
                self.switches.record_entry(id, train.direction);
            }
        }
    }

    fn phase_queue_flips(&mut self) {
        let tick = self.sim_state.tick;
        for switch in self.switches.queue_flips() {
            self.event_bus.emit(Event::SwitchFlipQueued { switch, tick });
        }
    }

    // -----------------------------------------------------------------------
    // Phase: collisions
    // -----------------------------------------------------------------------

    fn phase_collisions(&mut self, scratch: &mut TickScratch) {
        let mut contenders: Vec<Contender> = self
            .trains
            .iter()
            .enumerate()
            .filter(|(i, t)| t.is_active() && scratch.crashes[*i].is_none())
            .filter_map(|(i, t)| {
                scratch.plans[i].map(|plan| Contender {
                    train: t.id,
                    position: t.position,
                    direction: t.direction,
                    destination: t.destination,
                    plan,
                    crashed: false,
                })
            })
            .collect();

        if contenders.len() < 2 {
            return;
        }

        let collisions = resolve_collisions(&mut contenders);
        if collisions.is_empty() {
            return;
        }

        for c in &contenders {
            let i = c.train.index();
            if c.crashed {
                scratch.crashes[i] = Some(CrashCause::CollisionTie);
                scratch.plans[i] = None;
            } else {
                scratch.plans[i] = Some(c.plan);
            }
        }

        for collision in collisions {
            if let CollisionOutcome::Yield { held, .. } = collision.outcome {
                tracing::debug!(tick = self.sim_state.tick, train = %held, "train held");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase: crash tally
    // -----------------------------------------------------------------------

    fn phase_crash_tally(&mut self, scratch: &mut TickScratch) {
        let tick = self.sim_state.tick;
        for (i, train) in self.trains.iter_mut().enumerate() {
            let Some(cause) = scratch.crashes[i] else {
                continue;
            };
            if !train.is_active() {
                continue;
            }
            train.status = TrainStatus::Crashed;
            self.crashed += 1;
            scratch.became_terminal[i] = true;
            self.event_bus.emit(Event::TrainCrashed {
                train: train.id,
                position: train.position,
                cause,
                tick,
            });
            tracing::debug!(tick, train = %train.id, position = %train.position, ?cause, "train crashed");
        }
    }

    // -----------------------------------------------------------------------
    // Phase: movement commit
    // -----------------------------------------------------------------------

    fn phase_commit(&mut self, scratch: &TickScratch) {
        let tick = self.sim_state.tick;

        // Every train, spawned or not: a late spawn on a switch tile is not
        // an entry.
        for train in &mut self.trains {
            train.previous_position = Some(train.position);
        }

        for (i, train) in self.trains.iter_mut().enumerate() {
            if !train.is_active() {
                continue;
            }
            let Some(plan) = scratch.plans[i] else {
                continue;
            };

            if plan.held {
                train.wait_ticks += 1;
                train.total_wait_ticks += 1;
                self.event_bus.emit(Event::TrainHeld {
                    train: train.id,
                    position: train.position,
                    tick,
                });
                continue;
            }

            let from = train.position;
            train.position = plan.target;
            train.direction = plan.direction;
            train.wait_ticks = 0;
            if from != plan.target {
                self.event_bus.emit(Event::TrainMoved {
                    train: train.id,
                    from,
                    to: plan.target,
                    tick,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase: deferred flips
    // -----------------------------------------------------------------------

    fn phase_deferred_flips(&mut self) {
        let tick = self.sim_state.tick;
        for switch in self.switches.apply_deferred_flips() {
            let Some(sw) = self.switches.get(switch) else {
                continue;
            };
            tracing::debug!(tick, label = %sw.label, state = sw.state_name(), "switch flipped");
            self.event_bus.emit(Event::SwitchFlipped {
                switch,
                state: sw.state,
                tick,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Phase: arrivals
    // -----------------------------------------------------------------------

    fn phase_arrivals(&mut self, scratch: &mut TickScratch) {
        let tick = self.sim_state.tick;
        for (i, train) in self.trains.iter_mut().enumerate() {
            if train.is_active() && train.at_destination() {
                train.status = TrainStatus::Delivered;
                self.delivered += 1;
                scratch.became_terminal[i] = true;
                self.event_bus.emit(Event::TrainDelivered {
                    train: train.id,
                    tick,
                });
                tracing::debug!(tick, train = %train.id, "train delivered");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase: signals
    // -----------------------------------------------------------------------

    fn phase_signals(&mut self) {
        let tick = self.sim_state.tick;
        let active: Vec<_> = self
            .trains
            .iter()
            .filter(|t| t.is_active())
            .map(|t| t.position)
            .collect();
        for (switch, color) in self.switches.update_signals(&active) {
            self.event_bus.emit(Event::SignalChanged {
                switch,
                color,
                tick,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Phase: telemetry
    // -----------------------------------------------------------------------

    fn phase_telemetry(&mut self, scratch: &TickScratch) {
        self.last_report = self.build_report(scratch);
        self.event_bus.deliver();
        self.last_state_hash = self.compute_state_hash();
    }

    fn build_report(&self, scratch: &TickScratch) -> TickReport {
        let trains = self
            .trains
            .iter()
            .enumerate()
            .filter(|(i, t)| t.is_active() || scratch.became_terminal[*i])
            .filter_map(|(_, t)| TrainSnapshot::of(t))
            .collect();
        let switches = self
            .switches
            .iter()
            .map(|(id, sw)| SwitchSnapshot::of(id, sw))
            .collect();
        TickReport {
            tick: self.sim_state.tick,
            trains,
            switches,
        }
    }

    /// Deterministic hash of the current simulation state.
    fn compute_state_hash(&self) -> u64 {
        let mut hasher = StateHash::new();
        hasher.write_u64(self.sim_state.tick);

        for train in &self.trains {
            hasher.write_u8(train.status as u8);
            hasher.write_i32(train.position.x);
            hasher.write_i32(train.position.y);
            hasher.write_u8(train.direction as u8);
            hasher.write_u32(train.wait_ticks);
            hasher.write_u32(train.total_wait_ticks);
        }

        for (_, sw) in self.switches.iter() {
            hasher.write_u8(sw.state as u8);
            for c in sw.counters {
                hasher.write_u32(c);
            }
            hasher.write_u8(sw.flip_queued as u8);
            hasher.write_u8(sw.signal as u8);
        }

        hasher.write_u32(self.delivered);
        hasher.write_u32(self.crashed);
        hasher.finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
