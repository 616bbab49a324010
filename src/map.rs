//! Reading and writing Karel map text.
//!
//! Simple maps use one character per tile and place Karel with a direction
//! glyph:
//!
//! ```text
//! 1..#..
//! #....^
//! ```
//!
//! For more than 9 beepers, or beepers under Karel, use the header form
//! with space separated tokens:
//!
//! ```text
//! KAREL 2 1 > 0
//! .  .  .  .  .  #
//! $  #  5  . 12  .
//! ```
//!
//! This puts Karel right on the `5` beepers with an empty bag (`0`);
//! `N` gives an unlimited bag.

use crate::board::Board;
use crate::error::{MapFormatError, SaveError};
use crate::grid::{Bounds, Grid, Point};
use crate::robot::{Direction, Robot};
use crate::tile::Tile;
use glam::IVec2;
use std::path::Path;

/// Which of the two text forms a map is written in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MapStyle {
    #[default]
    Simple,
    Header,
}

impl MapStyle {
    /// `.km2` files are header style, anything else simple.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("km2") => MapStyle::Header,
            _ => MapStyle::Simple,
        }
    }
}

/// The world described by a map: Karel, the tiles and the rectangle size.
#[derive(Clone, Debug)]
pub struct ParsedMap {
    pub robot: Robot,
    pub grid: Grid,
    pub width: i32,
    pub height: i32,
}

impl ParsedMap {
    /// Places the robot on the grid, see [`Board::new`].
    pub fn into_board(self) -> Result<Board, crate::error::RobotError> {
        Board::new(self.robot, self.grid)
    }
}

/// Turns map text into a [`ParsedMap`].
#[derive(Clone, Debug, Default)]
pub struct MapParser {
    style: MapStyle,
    robot: Option<Robot>,
}

impl MapParser {
    pub fn new(style: MapStyle) -> Self {
        Self { style, robot: None }
    }

    /// Uses this robot instead of the one in the map.
    ///
    /// Direction glyphs and the header still have to be well formed but no
    /// longer place Karel.
    pub fn with_robot(mut self, robot: Robot) -> Self {
        self.robot = Some(robot);
        self
    }

    pub fn parse(&self, text: &str) -> Result<ParsedMap, MapFormatError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let mut robot = self.robot.clone();
        if self.style == MapStyle::Header {
            let (lineno, header) = lines.next().ok_or(MapFormatError::Empty)?;
            let from_header = parse_header(lineno, header)?;
            robot.get_or_insert(from_header);
        }

        let mut state = RowState {
            placed: None,
            tiles: Vec::new(),
            width: None,
        };
        let mut height = 0;
        for (lineno, line) in lines {
            let tokens: Vec<String> = match self.style {
                MapStyle::Simple => line.trim().chars().map(String::from).collect(),
                MapStyle::Header => line.split_whitespace().map(String::from).collect(),
            };
            self.parse_row(&mut state, lineno, height, &tokens)?;
            height += 1;
        }

        let width = state.width.ok_or(MapFormatError::Empty)?;
        let robot = match (robot, state.placed) {
            (Some(robot), _) => robot,
            (None, Some(placed)) => placed,
            (None, None) => return Err(MapFormatError::MissingRobot),
        };
        let bounds = Bounds::finite(width as i32, height);
        Ok(ParsedMap {
            robot,
            grid: Grid::with_tiles(bounds, state.tiles),
            width: width as i32,
            height,
        })
    }

    fn parse_row(
        &self,
        state: &mut RowState,
        lineno: usize,
        y: i32,
        tokens: &[String],
    ) -> Result<(), MapFormatError> {
        if let Some(expected) = state.width
            && expected != tokens.len()
        {
            return Err(MapFormatError::Ragged {
                line: lineno,
                expected,
                found: tokens.len(),
            });
        }
        state.width = Some(tokens.len());

        for (x, token) in tokens.iter().enumerate() {
            let point = IVec2::new(x as i32, y);
            let column = x + 1;
            if let Some(direction) = single_char(token).and_then(Direction::from_glyph) {
                if self.style == MapStyle::Header {
                    return Err(MapFormatError::InvalidToken {
                        line: lineno,
                        column,
                        token: token.clone(),
                    });
                }
                if self.robot.is_none() {
                    if let Some(first) = &state.placed {
                        return Err(MapFormatError::DuplicateRobot {
                            line: lineno,
                            column,
                            first: first.position,
                        });
                    }
                    state.placed = Some(Robot::new(point, direction, None));
                }
                continue;
            }
            let tile = parse_tile(token, self.style).ok_or_else(|| {
                MapFormatError::InvalidToken {
                    line: lineno,
                    column,
                    token: token.clone(),
                }
            })?;
            if !tile.is_empty() {
                state.tiles.push((point, tile));
            }
        }
        Ok(())
    }
}

struct RowState {
    placed: Option<Robot>,
    tiles: Vec<(Point, Tile)>,
    width: Option<usize>,
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// One tile token; digits `1`-`9` in simple maps, any positive count in
/// header maps.
fn parse_tile(token: &str, style: MapStyle) -> Option<Tile> {
    match token {
        "." | "0" => Some(Tile::Empty),
        "#" => Some(Tile::Wall),
        "$" => Some(Tile::Treasure),
        _ if style == MapStyle::Simple => single_char(token)
            .and_then(|c| c.to_digit(10))
            .map(Tile::beepers),
        _ if token.bytes().all(|b| b.is_ascii_digit()) => {
            let count: u32 = token.parse().ok()?;
            (count > 0).then(|| Tile::beepers(count))
        }
        _ => None,
    }
}

/// Parses `KAREL X Y > B`, `B` being a count or `N` for unlimited.
pub fn parse_header(lineno: usize, line: &str) -> Result<Robot, MapFormatError> {
    let error = |reason: &str| MapFormatError::Header {
        line: lineno,
        reason: reason.to_string(),
    };
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [keyword, x, y, direction, beepers] = fields.as_slice() else {
        return Err(error("expected five fields"));
    };
    if !keyword.eq_ignore_ascii_case("karel") {
        return Err(error(&format!("Karel not set ({keyword} != KAREL)")));
    }
    let x: i32 = x.parse().map_err(|_| error("X is not an integer"))?;
    let y: i32 = y.parse().map_err(|_| error("Y is not an integer"))?;
    let facing = single_char(direction)
        .and_then(Direction::from_glyph)
        .ok_or_else(|| error("direction is not one of > ^ < v"))?;
    let beepers = match *beepers {
        "N" | "n" => None,
        b => Some(
            b.parse::<u32>()
                .map_err(|_| error("beepers is not a count or N"))?,
        ),
    };
    Ok(Robot::new(IVec2::new(x, y), facing, beepers))
}

/// Writes the header form of a bounded world.
///
/// Only the smallest rectangle holding every non-empty tile and Karel is
/// written; Karel's position is given relative to that rectangle.
pub fn format_map(board: &Board) -> Result<String, SaveError> {
    board.grid().size().map_err(|_| SaveError::Unbounded)?;
    let robot = board.robot();
    let extent = board.grid().extent(robot.position);
    let relative = robot.position - extent.min;
    let beepers = robot
        .beepers
        .map_or_else(|| "N".to_string(), |b| b.to_string());

    let mut out = format!(
        "KAREL {} {} {} {}\n",
        relative.x, relative.y, robot.facing, beepers
    );
    for y in extent.min.y..=extent.max.y {
        let row: Vec<String> = (extent.min.x..=extent.max.x)
            .map(|x| board.tile(IVec2::new(x, y)).token())
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    Ok(out)
}

/// Writes a bounded world in simple form over its whole rectangle.
pub fn format_simple(board: &Board) -> Result<String, SaveError> {
    let (width, height) = board.grid().size().map_err(|_| SaveError::Unbounded)?;
    let robot = board.robot();
    if robot.beepers.is_some() {
        return Err(SaveError::NotRepresentable(
            "simple maps give Karel unlimited beepers".to_string(),
        ));
    }
    let mut out = String::new();
    for y in 0..height {
        for x in 0..width {
            let point = IVec2::new(x, y);
            let tile = board.tile(point);
            if point == robot.position {
                if !tile.is_empty() {
                    return Err(SaveError::NotRepresentable(format!(
                        "{tile:?} under Karel"
                    )));
                }
                out.push(robot.facing.glyph());
                continue;
            }
            if tile.beeper_count() > 9 {
                return Err(SaveError::NotRepresentable(format!(
                    "{} beepers at ({x}, {y})",
                    tile.beeper_count()
                )));
            }
            out.push(tile.glyph());
        }
        out.push('\n');
    }
    Ok(out)
}
