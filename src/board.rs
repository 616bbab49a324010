//! Karel placed on a grid, with every operation's preconditions enforced.

use crate::error::RobotError;
use crate::grid::{Bounds, Grid, Point};
use crate::robot::{Direction, Robot};
use crate::tile::Tile;
use std::num::NonZeroU32;

/// Manages [`Robot`] on a [`Grid`].
///
/// A failed operation returns [`RobotError`] and leaves both the robot and
/// the grid untouched.
#[derive(Clone, Debug)]
pub struct Board {
    robot: Robot,
    grid: Grid,
}

impl Board {
    /// Places `robot` on `grid`, refusing a blocking starting tile.
    pub fn new(robot: Robot, grid: Grid) -> Result<Self, RobotError> {
        let tile = grid.get(robot.position);
        if tile.blocking() {
            return Err(RobotError::PlacedOnBlocking {
                position: robot.position,
                tile,
            });
        }
        Ok(Self { robot, grid })
    }

    /// An empty world of the given bounds with a default robot at the origin.
    pub fn empty(bounds: Bounds) -> Result<Self, RobotError> {
        Self::new(Robot::default(), Grid::new(bounds))
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn bounds(&self) -> Bounds {
        self.grid.bounds()
    }

    pub fn tile(&self, point: Point) -> Tile {
        self.grid.get(point)
    }

    /// The tile Karel is standing on.
    pub fn robot_tile(&self) -> Tile {
        self.grid.get(self.robot.position)
    }

    /// The tile Karel is facing, `Wall` beyond a finite border and at the
    /// edge of the coordinate space.
    pub fn front_tile(&self) -> Tile {
        self.robot
            .front()
            .map_or(Tile::Wall, |front| self.grid.get(front))
    }

    pub fn move_forward(&mut self) -> Result<(), RobotError> {
        let tile = self.front_tile();
        if tile.blocking() {
            return Err(RobotError::Blocked {
                position: self.robot.position,
                direction: self.robot.facing,
                tile,
            });
        }
        self.robot.step();
        Ok(())
    }

    pub fn turn_left(&mut self) {
        self.robot.turn_left();
    }

    pub fn turn_right(&mut self) {
        self.robot.turn_right();
    }

    pub fn pick_beeper(&mut self) -> Result<(), RobotError> {
        let position = self.robot.position;
        let Tile::Beeper(count) = self.robot_tile() else {
            return Err(RobotError::NoBeeperHere {
                position,
                tile: self.robot_tile(),
            });
        };
        self.grid.set(position, Tile::beepers(count.get() - 1));
        self.robot.gain_beeper();
        Ok(())
    }

    pub fn put_beeper(&mut self) -> Result<(), RobotError> {
        if !self.robot.spend_beeper() {
            return Err(RobotError::NoBeepersLeft);
        }
        let position = self.robot.position;
        let tile = match self.robot_tile() {
            Tile::Beeper(count) => Tile::Beeper(count.saturating_add(1)),
            _ => Tile::Beeper(NonZeroU32::MIN),
        };
        self.grid.set(position, tile);
        Ok(())
    }

    pub fn front_is_blocked(&self) -> bool {
        self.front_tile().blocking()
    }

    pub fn front_is_treasure(&self) -> bool {
        self.front_tile() == Tile::Treasure
    }

    pub fn beeper_is_present(&self) -> bool {
        self.robot_tile().is_beeper()
    }

    pub fn facing_is(&self, direction: Direction) -> bool {
        self.robot.facing_is(direction)
    }

    /// Sets the bag, `None` for unlimited.
    pub fn set_beepers(&mut self, beepers: Option<u32>) {
        self.robot.beepers = beepers;
    }

    /// Overwrites the tile in front of Karel. Ignored beyond a finite border.
    pub fn set_front_tile(&mut self, tile: Tile) {
        if let Some(front) = self.robot.front() {
            self.grid.set(front, tile);
        }
    }

    /// Leaves exactly `count` beepers under Karel, clearing the tile on zero.
    pub fn set_robot_beepers(&mut self, count: u32) {
        self.grid.set(self.robot.position, Tile::beepers(count));
    }
}
