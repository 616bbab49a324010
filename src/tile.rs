//! The four kinds of tile a grid cell can hold.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// A single cell of Karel's world.
///
/// `Empty` is the implicit default of every cell and is never stored by a
/// [`Grid`](crate::Grid). A `Beeper` always holds at least one beeper.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Empty,
    /// Blocks Karel from passing.
    Wall,
    /// A pile of beepers for Karel to pick up.
    Beeper(NonZeroU32),
    /// A treasure chest, blocks Karel like a wall.
    Treasure,
}

impl Tile {
    /// Beeper pile of `count`, or `Empty` when `count` is zero.
    pub fn beepers(count: u32) -> Self {
        NonZeroU32::new(count).map_or(Tile::Empty, Tile::Beeper)
    }

    /// Whether Karel can not pass through this tile.
    pub fn blocking(self) -> bool {
        matches!(self, Tile::Wall | Tile::Treasure)
    }

    /// Nothing on the tile.
    pub fn is_empty(self) -> bool {
        self == Tile::Empty
    }

    /// A pile of at least one beeper.
    pub fn is_beeper(self) -> bool {
        matches!(self, Tile::Beeper(_))
    }

    /// Number of beepers on the tile, zero for anything but a beeper pile.
    pub fn beeper_count(self) -> u32 {
        match self {
            Tile::Beeper(count) => count.get(),
            _ => 0,
        }
    }

    /// Single character drawn on screen.
    ///
    /// Piles above nine beepers are drawn as `+`; the count itself stays exact.
    pub fn glyph(self) -> char {
        match self {
            Tile::Empty => '.',
            Tile::Wall => '#',
            Tile::Treasure => '$',
            Tile::Beeper(count) => char::from_digit(count.get(), 10).unwrap_or('+'),
        }
    }

    /// Space separated token used by header style maps, e.g. `12` or `#`.
    pub fn token(self) -> String {
        match self {
            Tile::Beeper(count) => count.to_string(),
            other => other.glyph().to_string(),
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}
