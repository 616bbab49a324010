//! A fixed size window over the board that slides along with Karel.
//!
//! The window keeps a margin of `lookahead` tiles between Karel and the edge
//! it is walking towards. It scrolls one tile per step only once that margin
//! is breached, and never past a finite border of the map.

use crate::board::Board;
use crate::error::{RobotError, ViewError};
use crate::grid::{Point, checked_step};
use crate::robot::Direction;
use crate::tile::Tile;
use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Size and scrolling behaviour of a [`BoardView`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub width: i32,
    pub height: i32,
    /// Number of tiles kept visible ahead of Karel.
    pub lookahead: i32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: 40,
            height: 20,
            lookahead: 1,
        }
    }
}

/// Board with limited view, that shifts with Karel.
#[derive(Clone, Debug)]
pub struct BoardView {
    board: Board,
    size: IVec2,
    lookahead_setting: i32,
    /// Top left tile of the view in map coordinates.
    offset: Point,
    advanced: bool,
}

impl BoardView {
    pub fn new(board: Board, config: ViewConfig) -> Self {
        let mut view = Self {
            board,
            size: IVec2::ONE,
            lookahead_setting: config.lookahead.max(0),
            offset: Point::ZERO,
            advanced: false,
        };
        view.resize(config.width, config.height);
        view
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn size(&self) -> IVec2 {
        self.size
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Whether the last [`move_forward`](Self::move_forward) scrolled the
    /// view; false after a blocked move.
    pub fn advanced(&self) -> bool {
        self.advanced
    }

    /// Effective lookahead, limited so at least the robot's own row and
    /// column fit between the two margins.
    pub fn lookahead(&self) -> IVec2 {
        let half = (self.size - IVec2::ONE) / 2;
        IVec2::splat(self.lookahead_setting).min(half)
    }

    /// Changes the window size and recomputes the offset around Karel.
    pub fn resize(&mut self, width: i32, height: i32) {
        self.size = IVec2::new(width.max(1), height.max(1));
        self.reset_offset();
    }

    pub fn set_lookahead(&mut self, lookahead: i32) {
        self.lookahead_setting = lookahead.max(0);
        self.reset_offset();
    }

    /// Recalculates the top left corner so Karel is inside the margins,
    /// moving the window as little as possible.
    pub fn reset_offset(&mut self) {
        let position = self.board.robot().position;
        let bounds = self.board.bounds();
        let lookahead = self.lookahead();
        self.offset = IVec2::new(
            axis_offset(
                position.x,
                self.offset.x,
                bounds.width,
                self.size.x,
                lookahead.x,
            ),
            axis_offset(
                position.y,
                self.offset.y,
                bounds.height,
                self.size.y,
                lookahead.y,
            ),
        );
    }

    /// Karel's position in view coordinates.
    pub fn robot_position(&self) -> Point {
        self.board.robot().position - self.offset
    }

    /// Whether the edge of the view in `direction` is a finite map border.
    pub fn border_visible(&self, direction: Direction) -> bool {
        let bounds = self.board.bounds();
        match direction {
            Direction::West => bounds.width.is_some() && self.offset.x <= 0,
            Direction::North => bounds.height.is_some() && self.offset.y <= 0,
            Direction::East => bounds
                .width
                .is_some_and(|w| self.offset.x + self.size.x >= w),
            Direction::South => bounds
                .height
                .is_some_and(|h| self.offset.y + self.size.y >= h),
        }
    }

    /// Whether Karel stands within the lookahead margin of the edge it faces.
    pub fn lookahead_reached(&self) -> bool {
        let relative = self.robot_position();
        let lookahead = self.lookahead();
        match self.board.robot().facing {
            Direction::West => relative.x <= lookahead.x,
            Direction::East => relative.x >= self.size.x - lookahead.x - 1,
            Direction::North => relative.y <= lookahead.y,
            Direction::South => relative.y >= self.size.y - lookahead.y - 1,
        }
    }

    /// Moves Karel and scrolls the view along when it breaches the margin.
    ///
    /// On a blocked move neither Karel nor the offset change.
    pub fn move_forward(&mut self) -> Result<(), RobotError> {
        let facing = self.board.robot().facing;
        let advanced = !self.border_visible(facing) && self.lookahead_reached();
        if let Err(error) = self.board.move_forward() {
            self.advanced = false;
            return Err(error);
        }
        self.advanced = advanced;
        if advanced {
            let step = facing.vector();
            self.offset = IVec2::new(
                self.offset.x.saturating_add(step.x),
                self.offset.y.saturating_add(step.y),
            );
        }
        Ok(())
    }

    pub fn turn_left(&mut self) {
        self.board.turn_left();
    }

    pub fn turn_right(&mut self) {
        self.board.turn_right();
    }

    pub fn pick_beeper(&mut self) -> Result<(), RobotError> {
        self.board.pick_beeper()
    }

    pub fn put_beeper(&mut self) -> Result<(), RobotError> {
        self.board.put_beeper()
    }

    pub fn front_is_blocked(&self) -> bool {
        self.board.front_is_blocked()
    }

    pub fn front_is_treasure(&self) -> bool {
        self.board.front_is_treasure()
    }

    pub fn beeper_is_present(&self) -> bool {
        self.board.beeper_is_present()
    }

    pub fn facing_is(&self, direction: Direction) -> bool {
        self.board.facing_is(direction)
    }

    pub fn set_beepers(&mut self, beepers: Option<u32>) {
        self.board.set_beepers(beepers);
    }

    pub fn set_front_tile(&mut self, tile: Tile) {
        self.board.set_front_tile(tile);
    }

    pub fn set_robot_beepers(&mut self, count: u32) {
        self.board.set_robot_beepers(count);
    }

    /// Translates a view position to map coordinates.
    ///
    /// Works for one tile beyond the view on every side, e.g. to draw the
    /// tile Karel just left. Positions that have no map coordinate at the
    /// edge of the `i32` range are errors too.
    pub fn to_absolute(&self, x: i32, y: i32) -> Result<Point, ViewError> {
        self.check_slack(x, y)?;
        checked_step(self.offset, IVec2::new(x, y)).ok_or(ViewError {
            position: IVec2::new(x, y),
            size: self.size,
        })
    }

    /// Translates a map position to view coordinates, with the same one
    /// tile slack as [`to_absolute`](Self::to_absolute).
    pub fn to_relative(&self, point: Point) -> Result<Point, ViewError> {
        let error = ViewError {
            position: point,
            size: self.size,
        };
        let relative = point
            .x
            .checked_sub(self.offset.x)
            .zip(point.y.checked_sub(self.offset.y))
            .map(|(x, y)| IVec2::new(x, y))
            .ok_or(error)?;
        self.check_slack(relative.x, relative.y).map(|_| relative)
    }

    /// The tile at a view position; `Wall` past the edge of the `i32` range.
    pub fn tile_at(&self, x: i32, y: i32) -> Result<Tile, ViewError> {
        self.check_slack(x, y)?;
        Ok(checked_step(self.offset, IVec2::new(x, y))
            .map_or(Tile::Wall, |point| self.board.tile(point)))
    }

    fn check_slack(&self, x: i32, y: i32) -> Result<(), ViewError> {
        if (-1..=self.size.x).contains(&x) && (-1..=self.size.y).contains(&y) {
            Ok(())
        } else {
            Err(ViewError {
                position: IVec2::new(x, y),
                size: self.size,
            })
        }
    }
}

/// Offset along one axis that keeps `position` inside the view.
///
/// Keeps `current` when Karel is already between the margins, otherwise
/// shifts it the minimum needed. A finite axis is then clamped so the view
/// never shows more than the map's own border.
fn axis_offset(
    position: i32,
    current: i32,
    bound: Option<i32>,
    view: i32,
    lookahead: i32,
) -> i32 {
    let relative = position.saturating_sub(current);
    let mut offset = current;
    if relative < lookahead {
        offset = position.saturating_sub(lookahead);
    } else if relative > view - 1 - lookahead {
        offset = position.saturating_sub(view - 1 - lookahead);
    }
    match bound {
        Some(bound) => offset.clamp(0, (bound - view).max(0)),
        None => offset,
    }
}
