//! # karel-robot
//!
//! Karel the Robot, the grid-world robot used to teach programming.
//!
//! Karel stands on a [`Grid`] of tiles (walls, treasures and piles of
//! beepers), carries a bag of beepers and can move, turn, pick and put. The
//! world is read from map text by a [`MapParser`], watched through a
//! [`BoardView`] that slides along with Karel, and driven either from Rust,
//! from the keyboard in a [`Session`], or by a recursive [`Program`] in the
//! little `DEFINE`/`RUN` language.

pub mod board;
pub mod error;
pub mod grid;
pub mod interpreter;
pub mod map;
pub mod robot;
pub mod screen;
pub mod session;
pub mod terminal;
pub mod tile;
pub mod view;

pub use board::*;
pub use error::*;
pub use grid::*;
pub use interpreter::*;
pub use map::*;
pub use robot::*;
pub use screen::*;
pub use session::*;
pub use terminal::*;
pub use tile::*;
pub use view::*;
