//! Railsim Core -- a deterministic, tick-driven rail traffic simulator.
//!
//! Trains spawn on a fixed tile grid, follow the track toward their
//! destinations, pass switches whose state flips on traffic thresholds, and
//! may collide. The crate is single-threaded and performs no I/O.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the simulation by one tick:
//!
//! 1. **Spawn** -- Trains scheduled for the tick become active.
//! 2. **Route** -- [`router::plan_route`] plans one move per train.
//! 3. **Switch counters** -- Trains entering a switch tile bump its counters.
//! 4. **Flip queue** -- Switches past their threshold queue a flip.
//! 5. **Collisions** -- [`collision::resolve_collisions`] settles conflicts.
//! 6. **Crash tally** -- Crashed trains are counted and deactivated.
//! 7. **Commit** -- Planned moves are applied.
//! 8. **Deferred flips** -- Queued flips are applied and counters reset.
//! 9. **Arrivals** -- Trains on their destination are delivered.
//! 10. **Signals** -- Signal colours follow the nearest active train.
//! 11. **Telemetry** -- A [`query::TickReport`] is built and events delivered.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns all state and runs the pipeline.
//! - [`grid::Grid`] -- Immutable tile map and tile classification.
//! - [`switch::SwitchBank`] -- Switch counters, deferred flips, signals.
//! - [`level::Level`] -- Resolved level description the engine starts from.
//! - [`event::EventBus`] -- Buffered events for passive listeners.

pub mod collision;
pub mod engine;
pub mod event;
pub mod grid;
pub mod id;
pub mod level;
pub mod query;
pub mod router;
pub mod sim;
pub mod switch;
pub mod train;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
