//! Simulation clock, run outcome and state hashing.
//!
//! Time advances only through [`crate::engine::Engine::step`]; there is no
//! real-time accumulator in the core. A driver that wants a delay between
//! ticks sleeps between `step` calls.

/// Simulation time, in ticks.
pub type Ticks = u64;

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// Mutable clock tracked by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimState {
    /// The last tick that was fully computed. 0 before the first step.
    pub tick: Ticks,
}

impl SimState {
    /// Create a clock at tick 0.
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl Default for SimState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// How [`crate::engine::Engine::run`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every train is delivered or crashed and no spawn is outstanding.
    Completed { tick: Ticks },
    /// The tick budget ran out first.
    TickCapReached { tick: Ticks },
}

impl RunOutcome {
    /// The tick at which the run stopped.
    pub fn tick(self) -> Ticks {
        match self {
            RunOutcome::Completed { tick } | RunOutcome::TickCapReached { tick } => tick,
        }
    }

    pub fn is_completed(self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// A simple deterministic hash of simulation state for comparing runs.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    /// Finalize and return the hash value.
    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
