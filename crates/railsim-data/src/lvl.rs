//! Parser for the line-oriented `.lvl` level format.
//!
//! ```text
//! NAME:
//! Two Loops
//!
//! ROWS:
//! 3
//!
//! COLS:
//! 7
//!
//! MAP:
//! S-A---D
//!   |
//!   \---D
//!
//! SWITCHES:
//! A PER_DIR 0 2 0 0 0 STRAIGHT TURN
//!
//! TRAINS:
//! 0 0 0 1 0
//! ```
//!
//! Each header sits on its own line with its value on the next non-blank
//! line; `ROWS: 3` on one line is accepted too. `MAP:` takes the next
//! `ROWS` lines verbatim (blank lines included) and stops early at another
//! header. Switch lines are `L MODE STATE K0 K1 K2 K3 NAME0 NAME1`, train
//! lines are `TICK X Y DIR DEST_INDEX`.

use std::path::Path;

use railsim_core::level::Weather;
use railsim_core::switch::SwitchMode;

use crate::loader::DataLoadError;
use crate::schema::{LevelData, SwitchData, TrainData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Name,
    Rows,
    Cols,
    Seed,
    Weather,
    Map,
    Switches,
    Trains,
}

const HEADERS: &[(&str, Section)] = &[
    ("NAME", Section::Name),
    ("ROWS", Section::Rows),
    ("COLS", Section::Cols),
    ("SEED", Section::Seed),
    ("WEATHER", Section::Weather),
    ("MAP", Section::Map),
    ("SWITCHES", Section::Switches),
    ("TRAINS", Section::Trains),
];

/// A header line split into its section and any inline value.
fn header(line: &str) -> Option<(Section, &str)> {
    let (key, rest) = line.trim().split_once(':')?;
    let key = key.trim();
    HEADERS
        .iter()
        .find(|(h, _)| h.eq_ignore_ascii_case(key))
        .map(|&(_, section)| (section, rest.trim()))
}

// ===========================================================================
// Line cursor
// ===========================================================================

struct Lines<'a> {
    lines: Vec<&'a str>,
    next: usize,
    file: &'a Path,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str, file: &'a Path) -> Self {
        Self {
            lines: text.lines().map(|l| l.trim_end_matches('\r')).collect(),
            next: 0,
            file,
        }
    }

    /// 1-based number of the line most recently returned.
    fn line_no(&self) -> usize {
        self.next
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.next).copied()
    }

    fn advance(&mut self) -> Option<&'a str> {
        let line = self.peek()?;
        self.next += 1;
        Some(line)
    }

    fn skip_blank(&mut self) {
        while self.peek().is_some_and(|l| l.trim().is_empty()) {
            self.next += 1;
        }
    }

    /// Non-blank lines up to the next header or end of input.
    fn section_body(&mut self) -> Vec<(usize, &'a str)> {
        let mut body = Vec::new();
        while let Some(line) = self.peek() {
            if header(line).is_some() {
                break;
            }
            self.next += 1;
            if !line.trim().is_empty() {
                body.push((self.next, line));
            }
        }
        body
    }

    fn syntax(&self, line: usize, detail: impl Into<String>) -> DataLoadError {
        DataLoadError::Syntax {
            file: self.file.to_path_buf(),
            line,
            detail: detail.into(),
        }
    }

    /// The header's value: `inline` when present, else the next non-blank
    /// line.
    fn value(&mut self, key: Section, inline: &'a str) -> Result<(usize, &'a str), DataLoadError> {
        if !inline.is_empty() {
            return Ok((self.line_no(), inline));
        }
        self.skip_blank();
        match self.peek() {
            Some(line) if header(line).is_none() => {
                self.next += 1;
                Ok((self.line_no(), line.trim()))
            }
            _ => Err(self.syntax(self.line_no(), format!("{key:?} header has no value"))),
        }
    }
}

fn number<T: std::str::FromStr>(
    lines: &Lines<'_>,
    line: usize,
    what: &str,
    text: &str,
) -> Result<T, DataLoadError> {
    text.parse()
        .map_err(|_| lines.syntax(line, format!("expected {what}, found '{text}'")))
}

// ===========================================================================
// Entry point
// ===========================================================================

/// Parse `.lvl` text. `file` names the source in errors and supplies the
/// level name when `NAME:` is absent.
pub fn parse_lvl(text: &str, file: &Path) -> Result<LevelData, DataLoadError> {
    let mut lines = Lines::new(text, file);

    let mut name: Option<String> = None;
    let mut rows: Option<usize> = None;
    let mut cols: Option<usize> = None;
    let mut seed = 0u64;
    let mut weather = Weather::Normal;
    let mut map: Option<Vec<String>> = None;
    let mut switches = Vec::new();
    let mut trains = Vec::new();

    loop {
        lines.skip_blank();
        let Some(line) = lines.advance() else { break };
        let at = lines.line_no();
        let Some((key, inline)) = header(line) else {
            return Err(lines.syntax(at, format!("expected a section header, found '{}'", line.trim())));
        };

        match key {
            Section::Name => {
                let (_, v) = lines.value(key, inline)?;
                name = Some(v.to_string());
            }
            Section::Rows => {
                let (n, v) = lines.value(key, inline)?;
                rows = Some(number(&lines, n, "a row count", v)?);
            }
            Section::Cols => {
                let (n, v) = lines.value(key, inline)?;
                cols = Some(number(&lines, n, "a column count", v)?);
            }
            Section::Seed => {
                let (n, v) = lines.value(key, inline)?;
                seed = number(&lines, n, "a seed", v)?;
            }
            Section::Weather => {
                let (n, v) = lines.value(key, inline)?;
                weather = Weather::from_name(&v.to_ascii_uppercase())
                    .ok_or_else(|| lines.syntax(n, format!("unknown weather '{v}'")))?;
            }
            Section::Map => {
                let Some(rows) = rows else {
                    return Err(DataLoadError::MissingSection {
                        file: file.to_path_buf(),
                        section: "ROWS",
                    });
                };
                map = Some(read_map(&mut lines, rows));
            }
            Section::Switches => {
                for (n, l) in lines.section_body() {
                    switches.push(parse_switch(&lines, n, l)?);
                }
            }
            Section::Trains => {
                for (n, l) in lines.section_body() {
                    trains.push(parse_train(&lines, n, l)?);
                }
            }
        }
    }

    let missing = |section| DataLoadError::MissingSection {
        file: file.to_path_buf(),
        section,
    };
    let rows = rows.ok_or_else(|| missing("ROWS"))?;
    let cols = cols.ok_or_else(|| missing("COLS"))?;
    let map = map.ok_or_else(|| missing("MAP"))?;
    let name = name.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    tracing::trace!(
        file = %file.display(),
        rows,
        cols,
        switches = switches.len(),
        trains = trains.len(),
        "parsed .lvl"
    );

    Ok(LevelData {
        name,
        seed,
        weather,
        rows,
        cols,
        map,
        switches,
        trains,
    })
}

/// Up to `rows` raw lines; a header ends the map early.
fn read_map(lines: &mut Lines<'_>, rows: usize) -> Vec<String> {
    let mut map = Vec::new();
    while map.len() < rows {
        match lines.peek() {
            Some(line) if header(line).is_none() => {
                lines.advance();
                map.push(line.to_string());
            }
            _ => break,
        }
    }
    map
}

fn parse_switch(lines: &Lines<'_>, n: usize, line: &str) -> Result<SwitchData, DataLoadError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [label, mode, state, k0, k1, k2, k3, name0, name1] = fields[..] else {
        return Err(lines.syntax(
            n,
            format!("switch line needs 9 fields, found {}", fields.len()),
        ));
    };

    let mut chars = label.chars();
    let (Some(label), None) = (chars.next(), chars.next()) else {
        return Err(lines.syntax(n, format!("switch label '{label}' is not one letter")));
    };
    let mode = SwitchMode::from_name(&mode.to_ascii_uppercase())
        .ok_or_else(|| lines.syntax(n, format!("unknown switch mode '{mode}'")))?;

    Ok(SwitchData {
        label,
        mode,
        state: number(lines, n, "a switch state", state)?,
        thresholds: [
            number(lines, n, "a threshold", k0)?,
            number(lines, n, "a threshold", k1)?,
            number(lines, n, "a threshold", k2)?,
            number(lines, n, "a threshold", k3)?,
        ],
        names: [name0.to_string(), name1.to_string()],
    })
}

fn parse_train(lines: &Lines<'_>, n: usize, line: &str) -> Result<TrainData, DataLoadError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [tick, x, y, dir, dest] = fields[..] else {
        return Err(lines.syntax(
            n,
            format!("train line needs 5 fields, found {}", fields.len()),
        ));
    };
    Ok(TrainData {
        tick: number(lines, n, "a spawn tick", tick)?,
        x: number(lines, n, "an x coordinate", x)?,
        y: number(lines, n, "a y coordinate", y)?,
        direction: number(lines, n, "a direction", dir)?,
        destination: number(lines, n, "a destination index", dest)?,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "NAME:
Two Loops

ROWS:
3

COLS:
7

SEED:
12345

WEATHER:
RAIN

MAP:
S-A---D
  |
  \\---D

SWITCHES:
A PER_DIR 0 2 0 0 0 STRAIGHT TURN

TRAINS:
0 0 0 1 0
4 1 0 1 1
";

    fn parse(text: &str) -> Result<LevelData, DataLoadError> {
        parse_lvl(text, Path::new("levels/sample.lvl"))
    }

    #[test]
    fn parses_full_file() {
        let data = parse(SAMPLE).unwrap();
        assert_eq!(data.name, "Two Loops");
        assert_eq!((data.rows, data.cols), (3, 7));
        assert_eq!(data.seed, 12345);
        assert_eq!(data.weather, Weather::Rain);
        assert_eq!(data.map, vec!["S-A---D", "  |", "  \\---D"]);

        let sw = &data.switches[0];
        assert_eq!(sw.label, 'A');
        assert_eq!(sw.mode, SwitchMode::PerDirection);
        assert_eq!(sw.thresholds, [2, 0, 0, 0]);
        assert_eq!(sw.names, ["STRAIGHT".to_string(), "TURN".to_string()]);

        assert_eq!(data.trains.len(), 2);
        assert_eq!(
            data.trains[1],
            TrainData {
                tick: 4,
                x: 1,
                y: 0,
                direction: 1,
                destination: 1
            }
        );
    }

    #[test]
    fn inline_values_and_defaults() {
        let text = "ROWS: 1\nCOLS: 3\nMAP:\nS-D\nTRAINS:\n0 0 0 1 0\n";
        let data = parse(text).unwrap();
        assert_eq!(data.name, "sample");
        assert_eq!(data.seed, 0);
        assert_eq!(data.weather, Weather::Normal);
        assert!(data.switches.is_empty());
        assert_eq!(data.trains.len(), 1);
    }

    #[test]
    fn map_stops_at_next_header() {
        let text = "ROWS:\n4\nCOLS:\n3\nMAP:\nS-D\nSWITCHES:\nTRAINS:\n";
        let data = parse(text).unwrap();
        assert_eq!(data.map, vec!["S-D"]);
        assert_eq!(data.rows, 4);
    }

    #[test]
    fn blank_map_rows_are_kept() {
        let text = "ROWS:\n3\nCOLS:\n3\nMAP:\nS-D\n\nD-S\n";
        let data = parse(text).unwrap();
        assert_eq!(data.map, vec!["S-D", "", "D-S"]);
    }

    #[test]
    fn missing_sections() {
        assert!(matches!(
            parse("COLS:\n3\nMAP:\nS-D\n"),
            Err(DataLoadError::MissingSection { section: "ROWS", .. })
        ));
        assert!(matches!(
            parse("ROWS:\n1\nMAP:\nS-D\n"),
            Err(DataLoadError::MissingSection { section: "COLS", .. })
        ));
        assert!(matches!(
            parse("ROWS:\n1\nCOLS:\n3\n"),
            Err(DataLoadError::MissingSection { section: "MAP", .. })
        ));
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        let bad_train = "ROWS: 1\nCOLS: 3\nMAP:\nS-D\nTRAINS:\n0 0 0 1\n";
        assert!(matches!(
            parse(bad_train),
            Err(DataLoadError::Syntax { line: 6, .. })
        ));

        let bad_mode = "ROWS: 1\nCOLS: 3\nMAP:\nS-D\nSWITCHES:\nA SOMETIMES 0 1 1 1 1 X Y\n";
        assert!(matches!(
            parse(bad_mode),
            Err(DataLoadError::Syntax { line: 6, .. })
        ));

        let bad_rows = "ROWS:\nmany\n";
        assert!(matches!(
            parse(bad_rows),
            Err(DataLoadError::Syntax { line: 2, .. })
        ));

        let stray = "hello\n";
        assert!(matches!(
            parse(stray),
            Err(DataLoadError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn unknown_weather_rejected() {
        let text = "WEATHER:\nSNOW\nROWS: 1\nCOLS: 1\nMAP:\nS\n";
        assert!(matches!(parse(text), Err(DataLoadError::Syntax { line: 2, .. })));
    }

    #[test]
    fn windows_line_endings() {
        let text = SAMPLE.replace('\n', "\r\n");
        let data = parse(&text).unwrap();
        assert_eq!(data.map[0], "S-A---D");
        assert_eq!(data.switches[0].names[1], "TURN");
    }
}
