//! Static tile classification and bounds checking.
//!
//! The [`Grid`] is the authority on tile semantics for every other
//! component. It is built once from level data and never mutated while a
//! simulation runs; switch tiles only name a switch; the switch's mutable
//! state lives in [`crate::switch::SwitchBank`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Facing direction of a train. The discriminants match the level-file and
/// trace encoding (0 = up, clockwise).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    /// All four directions in encoding order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    /// Decode a level-file direction index.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// The 0-3 encoding used by level files and traces.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 2) % 4]
    }

    /// Unit step `(dx, dy)` for one cell of movement. Rows grow downward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }

    /// Upper-case name as written to traces.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Right => "RIGHT",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
        }
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A grid cell. `x` is the column, `y` the row. Signed so that a candidate
/// one step past the edge is representable before the bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance to `other`.
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Tile
// ---------------------------------------------------------------------------

/// One grid cell's static content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// `-`
    Horizontal,
    /// `|`
    Vertical,
    /// `/`
    CurveSlash,
    /// `\`
    CurveBackslash,
    /// `=` (safety track, behaves as straight track)
    Safety,
    /// `+`
    Crossing,
    /// `S`
    Spawn,
    /// `D`
    Destination,
    /// `A`-`Z`
    Switch(char),
    /// Anything else. Impassable.
    Blank,
}

impl Tile {
    pub fn from_char(c: char) -> Self {
        match c {
            '-' => Tile::Horizontal,
            '|' => Tile::Vertical,
            '/' => Tile::CurveSlash,
            '\\' => Tile::CurveBackslash,
            '=' => Tile::Safety,
            '+' => Tile::Crossing,
            // `S` and `D` are claimed by spawn and destination tiles before
            // the switch-letter range is considered.
            'S' => Tile::Spawn,
            'D' => Tile::Destination,
            'A'..='Z' => Tile::Switch(c),
            _ => Tile::Blank,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Tile::Horizontal => '-',
            Tile::Vertical => '|',
            Tile::CurveSlash => '/',
            Tile::CurveBackslash => '\\',
            Tile::Safety => '=',
            Tile::Crossing => '+',
            Tile::Spawn => 'S',
            Tile::Destination => 'D',
            Tile::Switch(c) => c,
            Tile::Blank => ' ',
        }
    }

    /// True for any tile a train may occupy.
    pub fn is_track(self) -> bool {
        !matches!(self, Tile::Blank)
    }

    /// True for switch letters.
    pub fn is_switch(self) -> bool {
        matches!(self, Tile::Switch(_))
    }

    /// The switch letter on this tile, if any.
    pub fn switch_label(self) -> Option<char> {
        match self {
            Tile::Switch(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Rectangular, row-major tile array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
}

/// `rows × cols` does not fit in `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("grid of {rows}x{cols} tiles is too large")]
pub struct GridTooLarge {
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    /// An all-blank grid.
    pub fn new(rows: usize, cols: usize) -> Result<Self, GridTooLarge> {
        let cells = rows
            .checked_mul(cols)
            .ok_or(GridTooLarge { rows, cols })?;
        Ok(Self {
            rows,
            cols,
            tiles: vec![Tile::Blank; cells],
        })
    }

    /// Build a `rows × cols` grid from text lines. Missing rows and the tail
    /// of short rows are blank; characters past `cols` are ignored.
    pub fn parse_rows<S: AsRef<str>>(
        rows: usize,
        cols: usize,
        lines: &[S],
    ) -> Result<Self, GridTooLarge> {
        let mut grid = Self::new(rows, cols)?;
        for (y, line) in lines.iter().take(rows).enumerate() {
            for (x, c) in line.as_ref().chars().take(cols).enumerate() {
                grid.tiles[y * cols + x] = Tile::from_char(c);
            }
        }
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.cols && (pos.y as usize) < self.rows
    }

    /// The tile at `pos`, or `None` off-grid.
    pub fn tile(&self, pos: Position) -> Option<Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        Some(self.tiles[pos.y as usize * self.cols + pos.x as usize])
    }

    /// Iterate `(position, tile)` in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.tiles.iter().enumerate().map(|(i, &t)| {
            let pos = Position::new((i % self.cols) as i32, (i / self.cols) as i32);
            (pos, t)
        })
    }

    /// First row-major occurrence of `tile`.
    pub fn find_first(&self, tile: Tile) -> Option<Position> {
        self.iter().find(|&(_, t)| t == tile).map(|(p, _)| p)
    }

    /// Every `S` tile, row-major.
    pub fn spawn_points(&self) -> Vec<Position> {
        self.positions_of(Tile::Spawn)
    }

    /// Every `D` tile, row-major.
    pub fn destination_points(&self) -> Vec<Position> {
        self.positions_of(Tile::Destination)
    }

    fn positions_of(&self, tile: Tile) -> Vec<Position> {
        self.iter().filter(|&(_, t)| t == tile).map(|(p, _)| p).collect()
    }

    /// The grid as text rows, for rendering and level export.
    pub fn to_rows(&self) -> Vec<String> {
        self.tiles
            .chunks(self.cols.max(1))
            .take(self.rows)
            .map(|row| row.iter().map(|t| t.to_char()).collect())
            .collect()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
