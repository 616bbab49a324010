//! Sparse storage of tiles with independently optional bounds.

use crate::error::SizeUndefined;
use crate::tile::Tile;
use glam::IVec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A position on the grid. `y` grows downwards, row by row as maps are read.
pub type Point = IVec2;

/// `point + step` per axis, `None` past the range of `i32`.
pub(crate) fn checked_step(point: Point, step: IVec2) -> Option<Point> {
    Some(IVec2::new(
        point.x.checked_add(step.x)?,
        point.y.checked_add(step.y)?,
    ))
}

/// Optional finite width and height of a grid.
///
/// An axis with `None` is unbounded in both signs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: Option<i32>,
    pub height: Option<i32>,
}

impl Bounds {
    /// `None` leaves that axis unbounded.
    pub fn new(width: Option<i32>, height: Option<i32>) -> Self {
        Self { width, height }
    }

    /// No border on either axis.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Both axes bounded.
    pub fn finite(width: i32, height: i32) -> Self {
        Self::new(Some(width), Some(height))
    }

    /// Whether `point` lies inside every finite bound.
    pub fn contains(&self, point: Point) -> bool {
        let within = |i: i32, bound: Option<i32>| bound.is_none_or(|b| 0 <= i && i < b);
        within(point.x, self.width) && within(point.y, self.height)
    }
}

/// Smallest rectangle covering a set of points, both corners inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Extent {
    pub min: Point,
    pub max: Point,
}

impl Extent {
    pub fn around(point: Point) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    pub fn include(&mut self, point: Point) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y + 1
    }
}

/// Container for tiles on a square grid.
///
/// Reading beyond a finite bound yields [`Tile::Wall`], reading an unset
/// cell yields [`Tile::Empty`]. Only non-empty tiles are stored.
#[derive(Clone, Debug, Default)]
pub struct Grid {
    bounds: Bounds,
    tiles: HashMap<Point, Tile>,
}

impl Grid {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            tiles: HashMap::new(),
        }
    }

    /// Builds a grid from `(point, tile)` pairs, dropping empties and
    /// anything outside `bounds`.
    pub fn with_tiles(bounds: Bounds, tiles: impl IntoIterator<Item = (Point, Tile)>) -> Self {
        let mut grid = Self::new(bounds);
        for (point, tile) in tiles {
            grid.set(point, tile);
        }
        grid
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Changes the bounds. Stored tiles now outside are forgotten.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        self.tiles.retain(|point, _| bounds.contains(*point));
    }

    /// `None` when unbounded.
    pub fn width(&self) -> Option<i32> {
        self.bounds.width
    }

    /// `None` when unbounded.
    pub fn height(&self) -> Option<i32> {
        self.bounds.height
    }

    /// Whether `point` lies inside the bounds.
    pub fn in_range(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    /// The tile at `point`, `Wall` outside the bounds.
    pub fn get(&self, point: Point) -> Tile {
        if !self.in_range(point) {
            return Tile::Wall;
        }
        self.tiles.get(&point).copied().unwrap_or_default()
    }

    /// Stores `tile` at `point`. Writes beyond a finite bound are ignored.
    pub fn set(&mut self, point: Point, tile: Tile) {
        if tile.is_empty() {
            self.tiles.remove(&point);
        } else if self.in_range(point) {
            self.tiles.insert(point, tile);
        }
    }

    /// `(width, height)` when both axes are bounded.
    pub fn size(&self) -> Result<(i32, i32), SizeUndefined> {
        match (self.bounds.width, self.bounds.height) {
            (Some(width), Some(height)) => Ok((width, height)),
            _ => Err(SizeUndefined),
        }
    }

    /// Bounding rectangle of all stored tiles and `anchor`.
    pub fn extent(&self, anchor: Point) -> Extent {
        let mut extent = Extent::around(anchor);
        for point in self.tiles.keys() {
            extent.include(*point);
        }
        extent
    }

    /// Number of stored (non-empty) tiles.
    pub fn stored(&self) -> usize {
        self.tiles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Point, Tile)> + '_ {
        self.tiles.iter().map(|(point, tile)| (*point, *tile))
    }
}
