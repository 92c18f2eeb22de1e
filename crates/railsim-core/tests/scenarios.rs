//! End-to-end tick behaviour on small hand-built levels.

use railsim_core::engine::Engine;
use railsim_core::event::{Event, EventKind};
use railsim_core::grid::{Direction, Grid};
use railsim_core::id::TrainId;
use railsim_core::level::Level;
use railsim_core::query::TraceStatus;
use railsim_core::sim::RunOutcome;
use railsim_core::switch::SwitchState;
use railsim_core::test_utils::*;
use railsim_core::train::TrainStatus;
use std::cell::RefCell;
use std::rc::Rc;

// ===========================================================================
// Straight-line delivery
// ===========================================================================

#[test]
fn straight_track_delivers_after_four_moves() {
    let grid = Grid::parse_rows(5, 5, &["", "", "S---D", "", ""]).unwrap();
    let level = Level::new("straight", grid)
        .with_train(train_def(2, pos(0, 2), Direction::Right, pos(4, 2)));
    let mut engine = Engine::new(&level);

    let mut positions = Vec::new();
    while !engine.is_complete() {
        engine.step();
        positions.push((engine.tick(), engine.trains()[0].position));
    }

    assert_eq!(
        positions,
        vec![
            (1, pos(0, 2)),
            (2, pos(1, 2)),
            (3, pos(2, 2)),
            (4, pos(3, 2)),
            (5, pos(4, 2)),
        ]
    );
    assert_eq!(engine.trains()[0].status, TrainStatus::Delivered);
    assert_eq!(engine.counters().delivered, 1);
    assert_eq!(engine.counters().crashed, 0);
}

// ===========================================================================
// Collisions
// ===========================================================================

#[test]
fn convergent_conflict_nearer_train_waits() {
    let mut engine = Engine::new(&crossing_level());

    engine.step();
    let t0 = &engine.trains()[0];
    let t1 = &engine.trains()[1];
    assert_eq!(t0.position, pos(3, 3));
    assert_eq!(t1.position, pos(3, 2));
    assert_eq!(t1.wait_ticks, 1);
    assert_eq!(t0.wait_ticks, 0);

    let statuses: Vec<TraceStatus> = engine.last_report().trains.iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![TraceStatus::Moving, TraceStatus::Waiting]);

    engine.step();
    let t1 = &engine.trains()[1];
    assert_eq!(t1.position, pos(3, 3));
    assert_eq!(t1.wait_ticks, 0);
    assert_eq!(t1.total_wait_ticks, 1);
    assert_eq!(engine.trains()[0].position, pos(4, 3));

    let outcome = engine.run(500);
    assert!(outcome.is_completed());
    assert_eq!(engine.counters().delivered, 2);
    assert_eq!(engine.counters().crashed, 0);
    assert_eq!(engine.total_wait_ticks(), 1);
}

#[test]
fn equal_distance_swap_crashes_both() {
    let mut engine = Engine::new(&head_on_level());
    engine.step();

    assert_eq!(engine.counters().crashed, 2);
    for t in engine.trains() {
        assert_eq!(t.status, TrainStatus::Crashed);
    }
    // Crashed trains stay where they were.
    assert_eq!(engine.trains()[0].position, pos(2, 0));
    assert_eq!(engine.trains()[1].position, pos(3, 0));
    assert!(engine.is_complete());

    let statuses: Vec<TraceStatus> = engine.last_report().trains.iter().map(|t| t.status).collect();
    assert_eq!(statuses, vec![TraceStatus::Crashed, TraceStatus::Crashed]);
}

#[test]
fn three_equidistant_trains_all_crash_at_a_crossing() {
    let grid = Grid::parse_rows(
        7,
        7,
        &[
            "   |   ", "   |   ", "   |   ", "D--+--D", "   |   ", "   |   ", "   D   ",
        ],
    )
    .unwrap();
    let level = Level::new("three-way", grid)
        .with_train(train_def(1, pos(2, 3), Direction::Right, pos(6, 3)))
        .with_train(train_def(1, pos(4, 3), Direction::Left, pos(0, 3)))
        .with_train(train_def(1, pos(3, 2), Direction::Down, pos(3, 6)));
    let mut engine = Engine::new(&level);
    engine.step();

    assert_eq!(engine.counters().crashed, 3);
    assert!(engine.trains().iter().all(|t| t.status == TrainStatus::Crashed));
    assert!(engine.is_complete());
}

#[test]
fn off_grid_train_crashes_and_leaves_the_pipeline() {
    let mut engine = Engine::new(&off_grid_level());
    let crashes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&crashes);
    engine.on_event(EventKind::TrainCrashed, Box::new(move |e| sink.borrow_mut().push(*e)));

    engine.step();
    assert_eq!(engine.trains()[0].status, TrainStatus::Crashed);
    assert_eq!(engine.counters().crashed, 1);

    engine.step();
    assert!(engine.last_report().trains.is_empty());
    assert_eq!(engine.counters().crashed, 1);
    assert_eq!(crashes.borrow().len(), 1);
    assert!(matches!(
        crashes.borrow()[0],
        Event::TrainCrashed { train: TrainId(0), tick: 1, .. }
    ));
}

// ===========================================================================
// Switches
// ===========================================================================

#[test]
fn global_switch_flips_on_third_entry_same_tick() {
    let mut engine = Engine::new(&switch_line_level(3));
    let flips = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&flips);
    engine.on_event(EventKind::SwitchFlipped, Box::new(move |e| sink.borrow_mut().push(e.tick())));

    step_n(&mut engine, 4);
    let a = engine.switch_by_label('A').unwrap();
    assert_eq!(a.counters[0], 2);
    assert_eq!(a.state, SwitchState::Normal);

    engine.step();
    let a = engine.switch_by_label('A').unwrap();
    assert_eq!(a.state, SwitchState::Reverse);
    assert_eq!(a.counters, [0; 4]);
    assert!(!a.flip_queued);
    assert_eq!(engine.counters().flips, 1);
    assert_eq!(*flips.borrow(), vec![5]);
}

#[test]
fn stationary_train_is_not_recounted() {
    // A train spawned onto its destination switch tile parks there; only the
    // first tick counts.
    let grid = Grid::parse_rows(1, 3, &["-A-"]).unwrap();
    let level = Level::new("park", grid)
        .with_switch(global_switch('A', 0))
        .with_train(train_def(1, pos(1, 0), Direction::Right, pos(1, 0)));
    let mut engine = Engine::new(&level);
    engine.step();
    // Delivered on the spawn tick, counted once on entry.
    assert_eq!(engine.switch_by_label('A').unwrap().counters[0], 1);
    engine.step();
    assert_eq!(engine.switch_by_label('A').unwrap().counters[0], 1);
}

#[test]
fn per_direction_switch_counts_by_heading() {
    let grid = Grid::parse_rows(1, 5, &["D-B-D"]).unwrap();
    let level = Level::new("per-dir", grid)
        .with_switch(per_direction_switch('B', [0, 0, 0, 0]))
        .with_train(train_def(1, pos(1, 0), Direction::Right, pos(4, 0)))
        .with_train(train_def(4, pos(3, 0), Direction::Left, pos(0, 0)));
    let mut engine = Engine::new(&level);
    engine.run(500);

    let b = engine.switch_by_label('B').unwrap();
    assert_eq!(b.counters[Direction::Right.index()], 1);
    assert_eq!(b.counters[Direction::Left.index()], 1);
    assert_eq!(engine.counters().delivered, 2);
}

#[test]
fn toggle_between_ticks_is_seen_by_next_report() {
    let mut engine = Engine::new(&switch_line_level(0));
    engine.step();
    engine.toggle_switch_state('A').unwrap();
    engine.step();
    let snapshot = &engine.last_report().switches[0];
    assert_eq!(snapshot.state, SwitchState::Reverse);
    assert_eq!(snapshot.state_name, "DIVERGE");
    assert_eq!(engine.counters().flips, 0);
}

// ===========================================================================
// Run control
// ===========================================================================

#[test]
fn spaced_trains_all_deliver() {
    let mut engine = Engine::new(&straight_line_level(8, &[1, 3, 5, 7]));
    let outcome = engine.run(500);
    // Last train spawns on 7 and needs 7 moves.
    assert_eq!(outcome, RunOutcome::Completed { tick: 13 });
    assert_eq!(engine.counters().delivered, 4);
    assert_eq!(engine.spawned_count(), 4);
}

#[test]
fn late_spawn_keeps_run_alive() {
    let mut engine = Engine::new(&straight_line_level(3, &[10]));
    engine.step();
    assert!(!engine.is_complete());
    let outcome = engine.run(500);
    assert_eq!(outcome, RunOutcome::Completed { tick: 11 });
}

#[test]
fn tick_cap_reports_unfinished_run() {
    let mut engine = Engine::new(&straight_line_level(50, &[1]));
    let outcome = engine.run(10);
    assert_eq!(outcome, RunOutcome::TickCapReached { tick: 10 });
    assert_eq!(engine.trains()[0].status, TrainStatus::Active);
}
