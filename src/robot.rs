//! Karel's own state: position, facing and beeper bag.

use crate::grid::{Point, checked_step};
use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four directions Karel can face.
///
/// Screen coordinates are used, so North is `(0, -1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    East,
    North,
    West,
    South,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::North,
        Direction::West,
        Direction::South,
    ];

    /// Unit step in this direction.
    pub fn vector(self) -> IVec2 {
        match self {
            Direction::East => IVec2::new(1, 0),
            Direction::North => IVec2::new(0, -1),
            Direction::West => IVec2::new(-1, 0),
            Direction::South => IVec2::new(0, 1),
        }
    }

    pub fn from_vector(vector: IVec2) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.vector() == vector)
    }

    /// Single character label: one of `>^<v`.
    pub fn glyph(self) -> char {
        match self {
            Direction::East => '>',
            Direction::North => '^',
            Direction::West => '<',
            Direction::South => 'v',
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '>' => Some(Direction::East),
            '^' => Some(Direction::North),
            '<' => Some(Direction::West),
            'v' => Some(Direction::South),
            _ => None,
        }
    }

    /// 90° anti-clockwise: `(dx, dy) -> (dy, -dx)`.
    pub fn left(self) -> Self {
        match self {
            Direction::East => Direction::North,
            Direction::North => Direction::West,
            Direction::West => Direction::South,
            Direction::South => Direction::East,
        }
    }

    /// 90° clockwise: `(dx, dy) -> (-dy, dx)`.
    pub fn right(self) -> Self {
        match self {
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::North => Direction::East,
        }
    }

    pub fn opposite(self) -> Self {
        self.left().left()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Karel the Robot.
///
/// A shortsighted robot that carries around and picks up beepers (possibly
/// infinitely many) on a 2D grid. Preconditions that depend on the grid are
/// checked by [`Board`](crate::Board); this type only tracks state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    pub position: Point,
    pub facing: Direction,
    /// Beepers in the bag, `None` means unlimited.
    pub beepers: Option<u32>,
}

impl Default for Robot {
    fn default() -> Self {
        Self {
            position: Point::ZERO,
            facing: Direction::East,
            beepers: None,
        }
    }
}

impl Robot {
    pub fn new(position: Point, facing: Direction, beepers: Option<u32>) -> Self {
        Self {
            position,
            facing,
            beepers,
        }
    }

    /// The cell directly in front of Karel, `None` at the edge of the
    /// coordinate space.
    pub fn front(&self) -> Option<Point> {
        checked_step(self.position, self.facing.vector())
    }

    pub fn turn_left(&mut self) {
        self.facing = self.facing.left();
    }

    pub fn turn_right(&mut self) {
        self.facing = self.facing.right();
    }

    /// True if Karel has some or unlimited beepers.
    pub fn holding_beepers(&self) -> bool {
        self.beepers.is_none_or(|b| b > 0)
    }

    pub fn facing_is(&self, direction: Direction) -> bool {
        self.facing == direction
    }

    pub(crate) fn step(&mut self) {
        if let Some(front) = self.front() {
            self.position = front;
        }
    }

    pub(crate) fn gain_beeper(&mut self) {
        if let Some(b) = self.beepers.as_mut() {
            *b = b.saturating_add(1);
        }
    }

    /// Takes one beeper out of the bag; false when the bag is empty.
    pub(crate) fn spend_beeper(&mut self) -> bool {
        match self.beepers.as_mut() {
            None => true,
            Some(0) => false,
            Some(b) => {
                *b -= 1;
                true
            }
        }
    }
}
