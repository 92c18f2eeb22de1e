//! Typed simulation events with pre-allocated ring buffers.
//!
//! Events are emitted while a tick's phases run and delivered in batch at the
//! end of [`crate::engine::Engine::step`]. Each event kind has its own
//! [`EventBuffer`] with a configurable capacity.
//!
//! Subscribers are passive: they observe events read-only and cannot feed
//! mutations back into the simulation. Statistics and telemetry are built on
//! top of them.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::grid::Position;
use crate::id::{SwitchId, TrainId};
use crate::sim::Ticks;
use crate::switch::{SignalColor, SwitchState};
use crate::train::CrashCause;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. All events carry the tick at which they occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // -- Trains --
    TrainSpawned {
        train: TrainId,
        position: Position,
        tick: Ticks,
    },
    TrainMoved {
        train: TrainId,
        from: Position,
        to: Position,
        tick: Ticks,
    },
    /// Collision resolution made the train wait in place.
    TrainHeld {
        train: TrainId,
        position: Position,
        tick: Ticks,
    },
    TrainDelivered {
        train: TrainId,
        tick: Ticks,
    },
    TrainCrashed {
        train: TrainId,
        position: Position,
        cause: CrashCause,
        tick: Ticks,
    },

    // -- Switches --
    SwitchFlipQueued {
        switch: SwitchId,
        tick: Ticks,
    },
    SwitchFlipped {
        switch: SwitchId,
        state: SwitchState,
        tick: Ticks,
    },
    /// Manual flip from the control surface.
    SwitchToggled {
        switch: SwitchId,
        state: SwitchState,
        tick: Ticks,
    },
    SignalChanged {
        switch: SwitchId,
        color: SignalColor,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TrainSpawned,
    TrainMoved,
    TrainHeld,
    TrainDelivered,
    TrainCrashed,
    SwitchFlipQueued,
    SwitchFlipped,
    SwitchToggled,
    SignalChanged,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 9;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TrainSpawned { .. } => EventKind::TrainSpawned,
            Event::TrainMoved { .. } => EventKind::TrainMoved,
            Event::TrainHeld { .. } => EventKind::TrainHeld,
            Event::TrainDelivered { .. } => EventKind::TrainDelivered,
            Event::TrainCrashed { .. } => EventKind::TrainCrashed,
            Event::SwitchFlipQueued { .. } => EventKind::SwitchFlipQueued,
            Event::SwitchFlipped { .. } => EventKind::SwitchFlipped,
            Event::SwitchToggled { .. } => EventKind::SwitchToggled,
            Event::SignalChanged { .. } => EventKind::SignalChanged,
        }
    }

    /// The tick stamped on this event.
    pub fn tick(&self) -> Ticks {
        match *self {
            Event::TrainSpawned { tick, .. }
            | Event::TrainMoved { tick, .. }
            | Event::TrainHeld { tick, .. }
            | Event::TrainDelivered { tick, .. }
            | Event::TrainCrashed { tick, .. }
            | Event::SwitchFlipQueued { tick, .. }
            | Event::SwitchFlipped { tick, .. }
            | Event::SwitchToggled { tick, .. }
            | Event::SignalChanged { tick, .. } => tick,
        }
    }
}

impl EventKind {
    pub const ALL: [EventKind; EVENT_KIND_COUNT] = [
        EventKind::TrainSpawned,
        EventKind::TrainMoved,
        EventKind::TrainHeld,
        EventKind::TrainDelivered,
        EventKind::TrainCrashed,
        EventKind::SwitchFlipQueued,
        EventKind::SwitchFlipped,
        EventKind::SwitchToggled,
        EventKind::SignalChanged,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Write position (wraps around).
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: vec![None; capacity],
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    /// Push an event. If full, the oldest event is dropped.
    pub fn push(&mut self, event: Event) {
        let capacity = self.capacity();
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Iterate over events from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        let start = if self.len < self.capacity() {
            0
        } else {
            // head is the next write slot, which holds the oldest entry
            self.head
        };
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    pub fn clear(&mut self) {
        self.events.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Optional predicate that filters events for a listener.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

struct ListenerEntry {
    listener: PassiveListener,
    filter: Option<EventFilter>,
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Holds one ring buffer per event kind, listener lists and suppression
/// flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<ListenerEntry>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: Default::default(),
            default_capacity,
        }
    }

    /// Suppress an event kind. Already buffered events of that kind are
    /// dropped.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event. No-op if its kind is suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener for an event kind. Listeners run in registration
    /// order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, None, listener);
    }

    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.listeners[kind.index()].push(ListenerEntry { listener, filter });
    }

    /// Deliver all buffered events to listeners, kind by kind in
    /// [`EventKind::ALL`] order, oldest first, then clear the buffers.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }

            let events: Vec<Event> = buffer.iter().copied().collect();
            buffer.clear();

            for entry in &mut self.listeners[idx] {
                for event in &events {
                    if let Some(filter) = &entry.filter
                        && !filter(event)
                    {
                        continue;
                    }
                    (entry.listener)(event);
                }
            }
        }
    }

    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Count of events currently buffered for a kind.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::len)
    }

    /// Total events ever emitted for a kind (including dropped).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffers[kind.index()]
            .as_ref()
            .map_or(0, EventBuffer::total_written)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
