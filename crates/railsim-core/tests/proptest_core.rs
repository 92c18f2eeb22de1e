//! Property-based tests for the rail engine.
//!
//! Uses proptest to generate random grids, switches and train schedules,
//! then verify run-level invariants hold.

use proptest::prelude::*;
use railsim_core::engine::Engine;
use railsim_core::grid::{Direction, Grid, Position};
use railsim_core::level::{Level, TrainDef};
use railsim_core::switch::{SwitchDef, SwitchMode, SwitchState};
use railsim_core::validation::validate_determinism;

// ===========================================================================
// Generators
// ===========================================================================

const TILE_CHARS: &[char] = &['-', '|', '/', '\\', '=', '+', 'S', 'D', 'A', 'B', ' '];

fn arb_direction() -> impl Strategy<Value = Direction> {
    (0..4u8).prop_map(|i| Direction::from_index(i).unwrap_or(Direction::Up))
}

fn arb_switch(label: char) -> impl Strategy<Value = SwitchDef> {
    (any::<bool>(), any::<bool>(), proptest::array::uniform4(0..4u32)).prop_map(
        move |(per_dir, reverse, thresholds)| SwitchDef {
            label,
            mode: if per_dir {
                SwitchMode::PerDirection
            } else {
                SwitchMode::Global
            },
            initial_state: if reverse {
                SwitchState::Reverse
            } else {
                SwitchState::Normal
            },
            thresholds,
            state_names: ["N".into(), "R".into()],
        },
    )
}

/// A random level: random tiles, two switches, up to eight trains placed
/// anywhere on the grid with random headings and destinations.
fn arb_level() -> impl Strategy<Value = Level> {
    (2..8usize, 2..10usize).prop_flat_map(|(rows, cols)| {
        let cells = proptest::collection::vec(proptest::sample::select(TILE_CHARS), rows * cols);
        let train = (
            0..12u64,
            0..cols as i32,
            0..rows as i32,
            arb_direction(),
            0..cols as i32,
            0..rows as i32,
        );
        (
            cells,
            proptest::collection::vec(train, 0..8),
            arb_switch('A'),
            arb_switch('B'),
        )
            .prop_map(move |(cells, trains, a, b)| {
                let lines: Vec<String> = cells
                    .chunks(cols)
                    .map(|row| row.iter().collect())
                    .collect();
                let grid = Grid::parse_rows(rows, cols, &lines).unwrap();
                let mut level = Level::new("random", grid).with_switch(a).with_switch(b);
                for (tick, x, y, direction, dx, dy) in trains {
                    level = level.with_train(TrainDef {
                        spawn_tick: tick,
                        position: Position::new(x, y),
                        direction,
                        destination: Position::new(dx, dy),
                        color: 0,
                    });
                }
                level
            })
    })
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Two runs of the same level agree on every tick.
    #[test]
    fn runs_are_deterministic(level in arb_level()) {
        let result = validate_determinism(&level, 40);
        prop_assert!(result.is_deterministic);
    }

    /// Tallies never decrease and never exceed the trains spawned.
    #[test]
    fn counters_are_monotonic(level in arb_level()) {
        let mut engine = Engine::new(&level);
        let mut prev = engine.counters();
        for _ in 0..40 {
            engine.step();
            let now = engine.counters();
            prop_assert!(now.delivered >= prev.delivered);
            prop_assert!(now.crashed >= prev.crashed);
            prop_assert!(now.flips >= prev.flips);
            prop_assert!((now.delivered + now.crashed) as usize <= engine.spawned_count());
            prev = now;
        }
    }

    /// Every spawned train is delivered, crashed or still active; a finished
    /// run has no active trains left.
    #[test]
    fn run_accounts_for_every_train(level in arb_level()) {
        let mut engine = Engine::new(&level);
        // Closed loops can keep a train circling forever, so the cap may hit.
        let outcome = engine.run(200);
        let counters = engine.counters();
        let active = engine.trains().iter().filter(|t| t.is_active()).count();
        prop_assert_eq!(
            counters.delivered as usize + counters.crashed as usize + active,
            engine.spawned_count()
        );
        prop_assert_eq!(engine.spawned_count(), level.trains.len());
        if outcome.is_completed() {
            prop_assert_eq!(active, 0);
        }
    }

    /// A switch whose state changed during a step ends that step with zeroed
    /// counters and no queued flip.
    #[test]
    fn flipped_switches_have_reset_counters(level in arb_level()) {
        let mut engine = Engine::new(&level);
        for _ in 0..40 {
            let before: Vec<SwitchState> = engine.switches().iter().map(|(_, s)| s.state).collect();
            engine.step();
            for ((_, sw), old) in engine.switches().iter().zip(before) {
                if sw.state != old {
                    prop_assert_eq!(sw.counters, [0; 4]);
                }
                prop_assert!(!sw.flip_queued);
            }
        }
    }

    /// Only active trains and trains that just finished show up in reports.
    #[test]
    fn reports_only_list_live_or_just_finished_trains(level in arb_level()) {
        let mut engine = Engine::new(&level);
        for _ in 0..40 {
            let tick = engine.step().tick;
            for snap in &engine.last_report().trains {
                let train = engine.train(snap.id).unwrap();
                prop_assert!(train.spawn_tick <= tick);
            }
        }
    }
}
