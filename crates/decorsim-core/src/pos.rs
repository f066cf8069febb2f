//! Block positions and the six axis directions.

use serde::{Deserialize, Serialize};

/// Integer position of a block in the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The position one block away in `dir`.
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.delta();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The position `n` blocks away in `dir`.
    pub fn offset_n(self, dir: Direction, n: i32) -> Self {
        let (dx, dy, dz) = dir.delta();
        Self::new(self.x + dx * n, self.y + dy * n, self.z + dz * n)
    }

    pub fn above(self) -> Self {
        self.offset(Direction::Up)
    }

    pub fn below(self) -> Self {
        self.offset(Direction::Down)
    }
}

/// One of the six axis-aligned directions.
///
/// [`Direction::ALL`] is the canonical visitation order for every
/// neighbour scan, so that exchange results are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    pub fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    pub fn is_horizontal(self) -> bool {
        !matches!(self, Direction::Down | Direction::Up)
    }

    /// Unit offset `(dx, dy, dz)`. North is -z, east is +x.
    pub fn delta(self) -> (i32, i32, i32) {
        match self {
            Direction::Down => (0, -1, 0),
            Direction::Up => (0, 1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::West => (-1, 0, 0),
            Direction::East => (1, 0, 0),
        }
    }

    /// Stable index in `0..6`, matching the order of [`Direction::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}
