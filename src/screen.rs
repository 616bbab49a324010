//! The surface a session draws on and reads keys from.

use crate::error::DisplayError;
use crate::robot::Direction;
use crate::tile::Tile;
use std::time::Duration;

/// What is drawn in one cell of the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glyph {
    Tile(Tile),
    Robot {
        facing: Direction,
        on_beeper: bool,
    },
}

impl Glyph {
    pub fn char(self) -> char {
        match self {
            Glyph::Tile(tile) => tile.glyph(),
            Glyph::Robot { facing, .. } => facing.glyph(),
        }
    }
}

/// Colouring of a message line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MessageStyle {
    #[default]
    Status,
    Error,
    Complete,
}

/// A key press relevant to Karel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Char(char),
    Resize,
    Help,
}

/// A character grid with a message line.
///
/// Columns and rows are zero-based from the top left corner.
pub trait Screen {
    /// `(columns, rows)` available.
    fn size(&self) -> Result<(u16, u16), DisplayError>;

    /// Blanks the whole screen.
    fn clear(&mut self) -> Result<(), DisplayError>;

    fn draw(&mut self, column: u16, row: u16, glyph: Glyph) -> Result<(), DisplayError>;

    /// Replaces the text of line `row`.
    fn message(&mut self, row: u16, text: &str, style: MessageStyle) -> Result<(), DisplayError>;

    /// Flushes everything drawn since the last call.
    fn present(&mut self) -> Result<(), DisplayError>;

    /// Waits for a key, at most `timeout` if given.
    fn next_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>, DisplayError>;

    /// Short sound or flash to draw attention to an error.
    fn alert(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}
