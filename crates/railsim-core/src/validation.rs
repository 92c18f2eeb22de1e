//! State comparison and determinism checking.
//!
//! [`diff_engines`] finds where two engines disagree; [`validate_determinism`]
//! runs one level twice and compares state hashes and tick reports tick by
//! tick.

use crate::engine::Engine;
use crate::id::TrainId;
use crate::level::Level;
use crate::sim::Ticks;

// ---------------------------------------------------------------------------
// State diff types
// ---------------------------------------------------------------------------

/// Difference between two engines for one train.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainDiff {
    OnlyInA(TrainId),
    OnlyInB(TrainId),
    StateMismatch { train: TrainId, description: String },
}

/// Difference between two engines for one switch, keyed by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchDiff {
    OnlyInA(char),
    OnlyInB(char),
    StateMismatch { label: char, description: String },
}

/// Full state diff between two engines.
#[derive(Debug, Clone)]
pub struct StateDiff {
    pub is_identical: bool,
    pub tick_matches: bool,
    pub counters_match: bool,
    pub train_diffs: Vec<TrainDiff>,
    pub switch_diffs: Vec<SwitchDiff>,
}

// ---------------------------------------------------------------------------
// Full diff
// ---------------------------------------------------------------------------

/// Compute a detailed diff between two engine states.
pub fn diff_engines(a: &Engine, b: &Engine) -> StateDiff {
    let tick_matches = a.tick() == b.tick();
    let counters_match = a.counters() == b.counters();

    let mut train_diffs = Vec::new();
    for ta in a.trains() {
        let Some(tb) = b.train(ta.id) else {
            train_diffs.push(TrainDiff::OnlyInA(ta.id));
            continue;
        };

        let mut mismatches = Vec::new();
        if ta.status != tb.status {
            mismatches.push("status");
        }
        if ta.position != tb.position {
            mismatches.push("position");
        }
        if ta.direction != tb.direction {
            mismatches.push("direction");
        }
        if ta.wait_ticks != tb.wait_ticks || ta.total_wait_ticks != tb.total_wait_ticks {
            mismatches.push("wait");
        }
        if !mismatches.is_empty() {
            train_diffs.push(TrainDiff::StateMismatch {
                train: ta.id,
                description: mismatches.join(", "),
            });
        }
    }
    for tb in b.trains().iter().skip(a.trains().len()) {
        train_diffs.push(TrainDiff::OnlyInB(tb.id));
    }

    let mut switch_diffs = Vec::new();
    for (_, sa) in a.switches().iter() {
        let Some(sb) = b.switch_by_label(sa.label) else {
            switch_diffs.push(SwitchDiff::OnlyInA(sa.label));
            continue;
        };

        let mut mismatches = Vec::new();
        if sa.state != sb.state {
            mismatches.push("state");
        }
        if sa.counters != sb.counters {
            mismatches.push("counters");
        }
        if sa.flip_queued != sb.flip_queued {
            mismatches.push("flip_queued");
        }
        if sa.signal != sb.signal {
            mismatches.push("signal");
        }
        if !mismatches.is_empty() {
            switch_diffs.push(SwitchDiff::StateMismatch {
                label: sa.label,
                description: mismatches.join(", "),
            });
        }
    }
    for (_, sb) in b.switches().iter() {
        if a.switch_by_label(sb.label).is_none() {
            switch_diffs.push(SwitchDiff::OnlyInB(sb.label));
        }
    }

    let is_identical =
        tick_matches && counters_match && train_diffs.is_empty() && switch_diffs.is_empty();

    StateDiff {
        is_identical,
        tick_matches,
        counters_match,
        train_diffs,
        switch_diffs,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

/// Result of a determinism validation run.
#[derive(Debug)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    /// First tick at which the runs diverged, if any.
    pub divergence_tick: Option<Ticks>,
    /// `(tick, hash_run1, hash_run2)` for each tick.
    pub hash_log: Vec<(Ticks, u64, u64)>,
}

/// Run `level` twice for `ticks` ticks and compare each tick's state hash
/// and report.
pub fn validate_determinism(level: &Level, ticks: Ticks) -> DeterminismResult {
    let mut engine_a = Engine::new(level);
    let mut engine_b = Engine::new(level);

    let mut hash_log = Vec::new();
    let mut divergence_tick = None;

    for _ in 0..ticks {
        let reports_match = engine_a.step() == engine_b.step();
        let hash_a = engine_a.state_hash();
        let hash_b = engine_b.state_hash();
        let tick = engine_a.tick();

        hash_log.push((tick, hash_a, hash_b));
        if (hash_a != hash_b || !reports_match) && divergence_tick.is_none() {
            divergence_tick = Some(tick);
        }
    }

    DeterminismResult {
        is_deterministic: divergence_tick.is_none(),
        divergence_tick,
        hash_log,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
