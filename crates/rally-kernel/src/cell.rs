//! Cell types: the static contents of a grid slot and the coordinates used to address it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Robot identifier; doubles as the index into the robot registry.
pub type RobotId = usize;

/// A (row, col) coordinate on the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Take one unit step. Returns `None` when the step would leave the
    /// top or left edge; the caller checks the bottom and right edges.
    pub fn step(self, direction: Direction) -> Option<Self> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self { row, ..self }),
            Direction::South => Some(Self { row: self.row + 1, ..self }),
            Direction::East => Some(Self { col: self.col + 1, ..self }),
            Direction::West => self.col.checked_sub(1).map(|col| Self { col, ..self }),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the four orthogonal headings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Neighbour scan order used by the steal transaction.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Parse a movement symbol: `N`orte, `S`ul, `L`este, `O`este.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'N' => Some(Direction::North),
            'S' => Some(Direction::South),
            'L' => Some(Direction::East),
            'O' => Some(Direction::West),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Direction::North => 'N',
            Direction::South => 'S',
            Direction::East => 'L',
            Direction::West => 'O',
        }
    }
}

/// A single entry of a robot's movement program.
///
/// Unknown symbols are kept rather than rejected: executing one costs the
/// robot its turn's move but nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveToken {
    Heading(Direction),
    Unknown(char),
}

impl MoveToken {
    pub fn parse(symbol: char) -> Self {
        Direction::from_symbol(symbol).map_or(MoveToken::Unknown(symbol), MoveToken::Heading)
    }

    /// Parse a whole program string, one token per character.
    pub fn parse_program(program: &str) -> Vec<Self> {
        program.chars().map(Self::parse).collect()
    }

    pub fn symbol(self) -> char {
        match self {
            MoveToken::Heading(direction) => direction.symbol(),
            MoveToken::Unknown(symbol) => symbol,
        }
    }
}

/// Static object lying on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellObject {
    #[default]
    Empty,
    /// Blocks movement permanently
    Pillar,
    /// Recharges the robot that steps on it, then disappears
    Battery,
    /// Collected by the robot that steps on it, then disappears
    Figure,
}

impl CellObject {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(CellObject::Empty),
            'x' => Some(CellObject::Pillar),
            'b' => Some(CellObject::Battery),
            'f' => Some(CellObject::Figure),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            CellObject::Empty => '.',
            CellObject::Pillar => 'x',
            CellObject::Battery => 'b',
            CellObject::Figure => 'f',
        }
    }

    pub fn is_pillar(self) -> bool {
        self == CellObject::Pillar
    }
}

/// Mutable contents of one grid slot. The arena wraps each in its own lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub object: CellObject,
    pub occupant: Option<RobotId>,
}

impl Cell {
    pub fn new(object: CellObject) -> Self {
        Self {
            object,
            occupant: None,
        }
    }
}
