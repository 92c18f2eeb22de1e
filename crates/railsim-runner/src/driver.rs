//! Batch driver: steps an engine to completion or the tick cap, feeding
//! telemetry, statistics and the optional console view.

use std::io::Write;
use std::time::Duration;

use railsim_core::engine::Engine;
use railsim_core::level::Level;
use railsim_core::query::TraceStatus;
use railsim_core::sim::RunOutcome;
use railsim_data::SimConfig;
use railsim_stats::{Fixed64, RunSummary, StatsConfig, attach};

use crate::error::RunnerError;
use crate::render::render_tick;
use crate::telemetry::TelemetrySink;

/// What a finished run hands back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub summary: RunSummary,
    pub average_journey: Fixed64,
    pub state_hash: u64,
}

/// Run `level` under `config`. Every simulated tick is passed to `sink`;
/// when `config.render` is set the console view goes to `screen`.
pub fn run_level(
    level: &Level,
    config: &SimConfig,
    sink: &mut dyn TelemetrySink,
    screen: &mut dyn Write,
) -> Result<RunReport, RunnerError> {
    let mut engine = Engine::with_event_capacity(level, config.event_capacity);
    let stats = attach(&mut engine, StatsConfig::default());
    let delay = Duration::from_millis(config.tick_delay_ms);

    tracing::info!(
        level = %level.name,
        trains = level.trains.len(),
        switches = level.switches.len(),
        max_ticks = config.max_ticks,
        "run started"
    );

    while !engine.is_complete() && engine.tick() < config.max_ticks {
        engine.step();
        let report = engine.last_report();
        sink.record_tick(report)?;
        tracing::trace!(
            tick = report.tick,
            waiting = report.trains_with(TraceStatus::Waiting).count(),
            "tick recorded"
        );
        if config.render {
            screen.write_all(render_tick(engine.grid(), report).as_bytes())?;
            screen.flush()?;
        }
        stats.borrow_mut().end_tick(engine.tick());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }

    let tick = engine.tick();
    let outcome = if engine.is_complete() {
        RunOutcome::Completed { tick }
    } else {
        tracing::warn!(tick, "tick cap reached with trains still running");
        RunOutcome::TickCapReached { tick }
    };

    // Event buffers may drop under a small `event_capacity`; the engine's
    // own tallies are exact.
    let summary = RunSummary::from_engine(&engine);
    sink.finish(&summary)?;

    tracing::info!(
        tick,
        delivered = summary.delivered,
        crashed = summary.crashed,
        flips = summary.flips,
        "run finished"
    );

    Ok(RunReport {
        outcome,
        summary,
        average_journey: stats.borrow().average_journey(),
        state_hash: engine.state_hash(),
    })
}

/// The closing banner printed by the binary.
pub fn summary_banner(report: &RunReport) -> String {
    let s = &report.summary;
    let status = match report.outcome {
        RunOutcome::Completed { .. } => "SIMULATION COMPLETE",
        RunOutcome::TickCapReached { .. } => "TICK LIMIT REACHED",
    };
    format!(
        "========================================\n\
         {status:^40}\n\
         ========================================\n\
         Total Ticks: {}\n\
         Trains Delivered: {}\n\
         Trains Crashed: {}\n\
         Switch Flips: {}\n\
         Average Journey: {:.2} ticks\n\
         State Hash: {:#018x}\n",
        s.total_ticks, s.delivered, s.crashed, s.flips, report.average_journey, report.state_hash,
    )
}
