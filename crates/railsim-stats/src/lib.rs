//! Run statistics for the rail simulator.
//!
//! Listens to core events (`TrainSpawned`, `TrainHeld`, `TrainDelivered`,
//! `TrainCrashed`, `SwitchFlipped`, `SwitchToggled`) and aggregates them into
//! whole-run totals, per-train journey records and a rolling delivery rate.
//! Ratios use [`Fixed64`] arithmetic so two identical runs report identical
//! numbers.
//!
//! # Usage
//!
//! ```ignore
//! let stats = attach(&mut engine, StatsConfig::default());
//! let outcome = engine.run(500);
//! stats.borrow_mut().end_tick(engine.tick());
//! let summary = stats.borrow().summary();
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use railsim_core::engine::Engine;
use railsim_core::event::{Event, EventKind};
use railsim_core::id::TrainId;
use railsim_core::sim::Ticks;

/// Q32.32 fixed-point number used for every reported ratio.
pub type Fixed64 = fixed::types::I32F32;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the statistics module.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Window size in ticks for the rolling delivery rate.
    pub window_size: usize,
    /// Number of per-tick rate snapshots kept for trend display.
    pub history_capacity: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            history_capacity: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity ring buffer storing [`Fixed64`] values for trend analysis.
///
/// When full, the oldest entry is overwritten. Iterates oldest-to-newest.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<Fixed64>,
    head: usize,
    len: usize,
}

impl RingBuffer {
    /// Create a ring buffer. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![Fixed64::ZERO; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Push a value, overwriting the oldest entry if at capacity.
    pub fn push(&mut self, value: Fixed64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The most recently pushed value, if any.
    pub fn latest(&self) -> Option<Fixed64> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.capacity() - 1) % self.capacity();
        Some(self.data[idx])
    }

    /// Iterate values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Fixed64> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).map(move |i| self.data[(start + i) % self.capacity()])
    }

    pub fn to_vec(&self) -> Vec<Fixed64> {
        self.iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Rolling window counter
// ---------------------------------------------------------------------------

/// Count over the most recent N committed ticks plus the in-progress tick.
///
/// Call [`add`](Self::add) during a tick and [`commit`](Self::commit) once at
/// its end.
#[derive(Debug, Clone)]
struct RollingWindow {
    tick_counts: Vec<u64>,
    write_pos: usize,
    committed_total: u64,
    current: u64,
    committed_count: usize,
}

impl RollingWindow {
    fn new(window_size: usize) -> Self {
        Self {
            tick_counts: vec![0; window_size.max(1)],
            write_pos: 0,
            committed_total: 0,
            current: 0,
            committed_count: 0,
        }
    }

    fn window_size(&self) -> usize {
        self.tick_counts.len()
    }

    fn add(&mut self, count: u64) {
        self.current += count;
    }

    /// Commit the current tick, evicting the oldest one when full.
    fn commit(&mut self) {
        if self.committed_count == self.window_size() {
            self.committed_total -= self.tick_counts[self.write_pos];
        }
        self.tick_counts[self.write_pos] = self.current;
        self.committed_total += self.current;
        self.current = 0;
        self.write_pos = (self.write_pos + 1) % self.window_size();
        if self.committed_count < self.window_size() {
            self.committed_count += 1;
        }
    }

    fn total(&self) -> u64 {
        self.committed_total + self.current
    }

    /// Average count per tick over the contributing ticks.
    fn rate(&self) -> Fixed64 {
        let effective = if self.current > 0 {
            self.committed_count + 1
        } else {
            self.committed_count
        };
        if effective == 0 {
            return Fixed64::ZERO;
        }
        Fixed64::from_num(self.total()) / Fixed64::from_num(effective)
    }
}

// ---------------------------------------------------------------------------
// Per-train records
// ---------------------------------------------------------------------------

/// How a train's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    Delivered,
    Crashed,
}

/// Lifetime record of one spawned train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainRecord {
    pub spawned_at: Ticks,
    pub finished: Option<(Ticks, Finish)>,
    /// Ticks spent held by collision resolution.
    pub wait_ticks: u64,
}

impl TrainRecord {
    /// Ticks from spawn to delivery. `None` unless delivered.
    pub fn journey_ticks(&self) -> Option<Ticks> {
        match self.finished {
            Some((at, Finish::Delivered)) => Some(at.saturating_sub(self.spawned_at)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// End-of-run figures, as written to `metrics.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub total_ticks: Ticks,
    pub delivered: u32,
    pub crashed: u32,
    pub flips: u64,
    pub total_wait_ticks: u64,
    /// `total_wait_ticks / delivered`, zero when nothing was delivered.
    pub average_wait: Fixed64,
    /// `delivered * 100 / total_ticks`, zero for an empty run.
    pub throughput_per_100: Fixed64,
}

impl RunSummary {
    pub fn new(
        total_ticks: Ticks,
        delivered: u32,
        crashed: u32,
        flips: u64,
        total_wait_ticks: u64,
    ) -> Self {
        let average_wait = if delivered > 0 {
            Fixed64::from_num(total_wait_ticks) / Fixed64::from_num(delivered)
        } else {
            Fixed64::ZERO
        };
        let throughput_per_100 = if total_ticks > 0 {
            Fixed64::from_num(u64::from(delivered) * 100) / Fixed64::from_num(total_ticks)
        } else {
            Fixed64::ZERO
        };
        Self {
            total_ticks,
            delivered,
            crashed,
            flips,
            total_wait_ticks,
            average_wait,
            throughput_per_100,
        }
    }

    /// Summary straight from the engine's own tallies.
    pub fn from_engine(engine: &Engine) -> Self {
        let counters = engine.counters();
        Self::new(
            engine.tick(),
            counters.delivered,
            counters.crashed,
            counters.flips,
            engine.total_wait_ticks(),
        )
    }
}

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Event-fed statistics aggregator.
///
/// Accepts events via [`process_event`](RunStats::process_event) and advances
/// time via [`end_tick`](RunStats::end_tick).
#[derive(Debug)]
pub struct RunStats {
    config: StatsConfig,
    trains: BTreeMap<TrainId, TrainRecord>,
    deliveries: RollingWindow,
    crashes: RollingWindow,
    delivery_history: RingBuffer,
    delivered: u32,
    crashed: u32,
    flips: u64,
    toggles: u64,
    total_wait_ticks: u64,
    current_tick: Ticks,
}

impl RunStats {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            trains: BTreeMap::new(),
            deliveries: RollingWindow::new(config.window_size),
            crashes: RollingWindow::new(config.window_size),
            delivery_history: RingBuffer::new(config.history_capacity),
            delivered: 0,
            crashed: 0,
            flips: 0,
            toggles: 0,
            total_wait_ticks: 0,
            current_tick: 0,
            config,
        }
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    /// The tick most recently passed to [`end_tick`](Self::end_tick).
    pub fn current_tick(&self) -> Ticks {
        self.current_tick
    }

    // -- Event processing ---------------------------------------------------

    pub fn process_event(&mut self, event: &Event) {
        match *event {
            Event::TrainSpawned { train, tick, .. } => {
                self.trains.insert(
                    train,
                    TrainRecord {
                        spawned_at: tick,
                        finished: None,
                        wait_ticks: 0,
                    },
                );
            }
            Event::TrainHeld { train, .. } => {
                self.total_wait_ticks += 1;
                if let Some(record) = self.trains.get_mut(&train) {
                    record.wait_ticks += 1;
                }
            }
            Event::TrainDelivered { train, tick } => {
                self.delivered += 1;
                self.deliveries.add(1);
                self.finish(train, tick, Finish::Delivered);
            }
            Event::TrainCrashed { train, tick, .. } => {
                self.crashed += 1;
                self.crashes.add(1);
                self.finish(train, tick, Finish::Crashed);
            }
            Event::SwitchFlipped { .. } => self.flips += 1,
            Event::SwitchToggled { .. } => self.toggles += 1,
            _ => {}
        }
    }

    fn finish(&mut self, train: TrainId, tick: Ticks, how: Finish) {
        if let Some(record) = self.trains.get_mut(&train) {
            record.finished = Some((tick, how));
        }
    }

    /// Close out `tick`: snapshot the delivery rate and advance the windows.
    pub fn end_tick(&mut self, tick: Ticks) {
        if tick <= self.current_tick && !self.delivery_history.is_empty() {
            return;
        }
        self.current_tick = tick;
        self.delivery_history.push(self.deliveries.rate());
        self.deliveries.commit();
        self.crashes.commit();
    }

    // -- Queries ------------------------------------------------------------

    pub fn delivered(&self) -> u32 {
        self.delivered
    }

    pub fn crashed(&self) -> u32 {
        self.crashed
    }

    /// Automatic flips. Manual toggles are counted separately.
    pub fn flips(&self) -> u64 {
        self.flips
    }

    pub fn toggles(&self) -> u64 {
        self.toggles
    }

    pub fn total_wait_ticks(&self) -> u64 {
        self.total_wait_ticks
    }

    pub fn train(&self, id: TrainId) -> Option<&TrainRecord> {
        self.trains.get(&id)
    }

    pub fn trains(&self) -> impl Iterator<Item = (TrainId, &TrainRecord)> {
        self.trains.iter().map(|(id, r)| (*id, r))
    }

    /// Mean spawn-to-delivery time over delivered trains.
    pub fn average_journey(&self) -> Fixed64 {
        let (sum, n) = self
            .trains
            .values()
            .filter_map(TrainRecord::journey_ticks)
            .fold((0u64, 0u64), |(s, n), t| (s + t, n + 1));
        if n == 0 {
            return Fixed64::ZERO;
        }
        Fixed64::from_num(sum) / Fixed64::from_num(n)
    }

    /// Deliveries per tick over the rolling window.
    pub fn recent_delivery_rate(&self) -> Fixed64 {
        self.deliveries.rate()
    }

    /// Crashes per tick over the rolling window.
    pub fn recent_crash_rate(&self) -> Fixed64 {
        self.crashes.rate()
    }

    /// Per-tick delivery rate snapshots, oldest first.
    pub fn delivery_history(&self) -> &RingBuffer {
        &self.delivery_history
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::new(
            self.current_tick,
            self.delivered,
            self.crashed,
            self.flips,
            self.total_wait_ticks,
        )
    }
}

/// Shared handle returned by [`attach`].
pub type SharedStats = Rc<RefCell<RunStats>>;

/// Subscribe a fresh [`RunStats`] to every tracked event kind on `engine`.
///
/// Events are delivered at the end of each step; call
/// [`RunStats::end_tick`] after the step to advance the rolling windows.
pub fn attach(engine: &mut Engine, config: StatsConfig) -> SharedStats {
    let stats = Rc::new(RefCell::new(RunStats::new(config)));
    for kind in [
        EventKind::TrainSpawned,
        EventKind::TrainHeld,
        EventKind::TrainDelivered,
        EventKind::TrainCrashed,
        EventKind::SwitchFlipped,
        EventKind::SwitchToggled,
    ] {
        let sink = Rc::clone(&stats);
        engine.on_event(kind, Box::new(move |e| sink.borrow_mut().process_event(e)));
    }
    stats
}

// ===========================================================================
// Tests
// ===========================================================================
