//! Console view of one tick: the grid with trains drawn over it, then a
//! status line per listed train.

use std::collections::HashMap;
use std::fmt::Write;

use railsim_core::grid::{Grid, Position};
use railsim_core::query::{TickReport, TraceStatus};

/// Render `report` over `grid`.
///
/// Moving and waiting trains are drawn as the last digit of their id. A
/// train finishing this tick is listed in the status block but not drawn.
pub fn render_tick(grid: &Grid, report: &TickReport) -> String {
    let mut drawn: HashMap<Position, char> = HashMap::new();
    for t in &report.trains {
        if matches!(t.status, TraceStatus::Moving | TraceStatus::Waiting) {
            let digit = char::from_digit(t.id.0 % 10, 10).unwrap_or('?');
            drawn.entry(t.position).or_insert(digit);
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "========== TICK {} ==========", report.tick);
    for y in 0..grid.rows() {
        let line: String = (0..grid.cols())
            .map(|x| {
                let pos = Position::new(x as i32, y as i32);
                match drawn.get(&pos) {
                    Some(&c) => c,
                    None => grid.tile(pos).map_or(' ', |tile| tile.to_char()),
                }
            })
            .collect();
        let _ = writeln!(out, "{}", line.trim_end());
    }

    if !report.trains.is_empty() {
        out.push_str("\nTrain Status:\n");
    }
    for t in &report.trains {
        let _ = write!(
            out,
            "Train {} at {} moving {}",
            t.id,
            t.position,
            t.direction.name()
        );
        match t.status {
            TraceStatus::Moving => {}
            TraceStatus::Waiting => {
                let _ = write!(out, " [WAITING {}]", t.wait_ticks);
            }
            other => {
                let _ = write!(out, " [{}]", other.name());
            }
        }
        out.push('\n');
    }

    if !report.switches.is_empty() {
        let signals: Vec<String> = report
            .switches
            .iter()
            .map(|s| format!("{}:{}/{}", s.label, s.state_name, s.signal.name()))
            .collect();
        let _ = writeln!(out, "Switches: {}", signals.join(" "));
    }
    out
}
