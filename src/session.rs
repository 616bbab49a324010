//! One Karel session: the world, the screen it is drawn on and the settings.
//!
//! Every command goes through [`Session::execute`], which runs the robot
//! operation, redraws what changed, updates the status line and waits one
//! tick so a human can follow. Robot errors are shown on screen and handed
//! back to the caller, who may simply carry on.

use crate::error::{DisplayError, RobotError, SaveError, SessionError};
use crate::interpreter::{Program, RobotControl, Step, Vocabulary};
use crate::map::format_map;
use crate::robot::Direction;
use crate::screen::{Glyph, Key, MessageStyle, Screen};
use crate::tile::Tile;
use crate::view::BoardView;
use glam::IVec2;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How much the status line shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    /// Also shows the view offset.
    Detailed,
}

impl Verbosity {
    fn next(self) -> Self {
        match self {
            Verbosity::Quiet => Verbosity::Normal,
            Verbosity::Normal => Verbosity::Detailed,
            Verbosity::Detailed => Verbosity::Quiet,
        }
    }
}

/// What happens before each statement of a running program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepMode {
    #[default]
    Off,
    /// Show the statement and wait for a key.
    Confirm,
    /// Show the statement without waiting.
    Show,
    /// Only log the statement.
    Log,
}

impl StepMode {
    /// Mode for a repeated `-W` flag.
    pub fn from_count(count: u8) -> Self {
        match count {
            0 => StepMode::Off,
            1 => StepMode::Confirm,
            2 => StepMode::Show,
            _ => StepMode::Log,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionConfig {
    /// Ticks per second, `None` for no delay.
    pub speed: Option<f64>,
    pub verbosity: Verbosity,
    /// Where [`Session::save`] writes when not given a path.
    pub output: Option<PathBuf>,
    pub step: StepMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            speed: Some(3.0),
            verbosity: Verbosity::Normal,
            output: None,
            step: StepMode::Off,
        }
    }
}

/// How much of the screen to redraw after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redraw {
    /// Nothing changed on screen.
    None,
    /// Only Karel's own tile.
    Robot,
    /// Karel's tile and the one it just left, or everything if the view
    /// scrolled.
    Moved,
    Full,
}

/// Why [`Session::interactive`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractiveExit {
    /// The user asked to end the whole session.
    Quit,
    /// The user left interactive mode only.
    Stopped,
}

const HELP: &str = "Use arrows to move, i/u/q to pIck, pUt and Quit.";

/// A world drawn on a [`Screen`].
pub struct Session<S: Screen> {
    view: BoardView,
    screen: S,
    config: SessionConfig,
}

impl<S: Screen> Session<S> {
    /// Opens a session and draws the world.
    ///
    /// Fails with [`DisplayError::TooSmall`] when the view and its two text
    /// lines do not fit the screen.
    pub fn new(view: BoardView, screen: S, config: SessionConfig) -> Result<Self, DisplayError> {
        let mut session = Self {
            view,
            screen,
            config,
        };
        session.check_fits()?;
        session.screen.clear()?;
        session.draw_full()?;
        session.screen.present()?;
        Ok(session)
    }

    pub fn view(&self) -> &BoardView {
        &self.view
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn into_parts(self) -> (BoardView, S) {
        (self.view, self.screen)
    }

    fn status_row(&self) -> u16 {
        self.view.size().y as u16
    }

    fn message_row(&self) -> u16 {
        self.status_row() + 1
    }

    fn check_fits(&self) -> Result<(), DisplayError> {
        let (columns, rows) = self.screen.size()?;
        let size = self.view.size();
        let needed_columns = size.x as u16;
        let needed_rows = size.y as u16 + 2;
        if columns < needed_columns || rows < needed_rows {
            return Err(DisplayError::TooSmall {
                columns,
                rows,
                needed_columns,
                needed_rows,
            });
        }
        Ok(())
    }

    /// Runs `action` on the world and shows its outcome.
    ///
    /// On success the screen is redrawn per `redraw`, the status line shows
    /// `label` and, if anything was drawn, one tick passes. On a robot error
    /// the error is shown until a key is pressed and then returned.
    pub fn execute<T>(
        &mut self,
        label: &str,
        redraw: Redraw,
        action: impl FnOnce(&mut BoardView) -> Result<T, RobotError>,
    ) -> Result<T, SessionError> {
        match action(&mut self.view) {
            Ok(value) => {
                let robot = self.view.board().robot();
                debug!(
                    command = label,
                    x = robot.position.x,
                    y = robot.position.y,
                    facing = %robot.facing,
                    "executed"
                );
                self.redraw(redraw)?;
                self.status(label)?;
                self.screen.present()?;
                if redraw != Redraw::None {
                    self.tick()?;
                }
                Ok(value)
            }
            Err(error) => {
                warn!(command = label, %error, "robot error");
                self.show_error(&error.to_string())?;
                Err(SessionError::Robot(error))
            }
        }
    }

    fn redraw(&mut self, redraw: Redraw) -> Result<(), DisplayError> {
        match redraw {
            Redraw::None => Ok(()),
            Redraw::Robot => self.draw_robot(),
            Redraw::Moved if self.view.advanced() => self.draw_full(),
            Redraw::Moved => {
                let facing = self.view.board().robot().facing;
                let vacated = self.view.robot_position() - facing.vector();
                self.draw_cell(vacated)?;
                self.draw_robot()
            }
            Redraw::Full => self.draw_full(),
        }
    }

    fn draw_full(&mut self) -> Result<(), DisplayError> {
        let size = self.view.size();
        for y in 0..size.y {
            for x in 0..size.x {
                self.draw_cell(IVec2::new(x, y))?;
            }
        }
        self.draw_robot()
    }

    /// Draws the tile at a view position; positions off screen are skipped.
    fn draw_cell(&mut self, relative: IVec2) -> Result<(), DisplayError> {
        let size = self.view.size();
        if relative.x < 0 || relative.y < 0 || relative.x >= size.x || relative.y >= size.y {
            return Ok(());
        }
        let Ok(tile) = self.view.tile_at(relative.x, relative.y) else {
            return Ok(());
        };
        self.screen
            .draw(relative.x as u16, relative.y as u16, Glyph::Tile(tile))
    }

    fn draw_robot(&mut self) -> Result<(), DisplayError> {
        let position = self.view.robot_position();
        let glyph = Glyph::Robot {
            facing: self.view.board().robot().facing,
            on_beeper: self.view.beeper_is_present(),
        };
        self.screen.draw(position.x as u16, position.y as u16, glyph)
    }

    fn status_text(&self, label: &str) -> String {
        let board = self.view.board();
        let robot = board.robot();
        let beepers = robot
            .beepers
            .map_or_else(|| "inf".to_string(), |b| b.to_string());
        let mut text = format!(
            "{label:<5} ({}, {}) {:?} bag:{beepers}",
            robot.position.x,
            robot.position.y,
            board.robot_tile()
        );
        if self.config.verbosity == Verbosity::Detailed {
            let offset = self.view.offset();
            text.push_str(&format!(" View({}, {})", offset.x, offset.y));
        }
        text
    }

    fn status(&mut self, label: &str) -> Result<(), DisplayError> {
        if self.config.verbosity == Verbosity::Quiet {
            return Ok(());
        }
        let text = self.status_text(label);
        let row = self.status_row();
        self.screen.message(row, &text, MessageStyle::Status)
    }

    /// Waits one tick, watching for `q` (quit) and `p` (pause).
    fn tick(&mut self) -> Result<(), SessionError> {
        let timeout = match self.config.speed {
            Some(speed) if speed > 0.0 => Duration::from_secs_f64(1.0 / speed),
            _ => Duration::ZERO,
        };
        match self.screen.next_key(Some(timeout))? {
            Some(Key::Char('q')) => Err(SessionError::Quit),
            Some(Key::Char('p')) => self.pause(),
            _ => Ok(()),
        }
    }

    /// Shows `text` in the error colour until a key is pressed.
    fn show_error(&mut self, text: &str) -> Result<(), SessionError> {
        self.screen.alert()?;
        self.prompt(text, MessageStyle::Error)
    }

    /// Shows `text` on the message line until a key is pressed, then
    /// clears it. `q` requests quit.
    fn prompt(&mut self, text: &str, style: MessageStyle) -> Result<(), SessionError> {
        let row = self.message_row();
        self.screen
            .message(row, &format!("{text} Press any key to continue"), style)?;
        self.screen.present()?;
        let key = self.screen.next_key(None)?;
        self.screen.message(row, "", MessageStyle::Status)?;
        self.screen.present()?;
        match key {
            Some(Key::Char('q')) => Err(SessionError::Quit),
            _ => Ok(()),
        }
    }

    /// Shows `text` on the message line.
    pub fn message(&mut self, text: &str, style: MessageStyle) -> Result<(), SessionError> {
        let row = self.message_row();
        self.screen.message(row, text, style)?;
        self.screen.present()?;
        Ok(())
    }

    /// Waits for any key; `q` requests quit.
    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.prompt("PAUSED", MessageStyle::Status)
    }

    /// Shows the completion message and waits for a key.
    pub fn complete(&mut self) -> Result<(), SessionError> {
        self.message(
            "Program Complete! Press any key to exit",
            MessageStyle::Complete,
        )?;
        self.screen.next_key(None)?;
        Ok(())
    }

    pub fn move_forward(&mut self) -> Result<(), SessionError> {
        self.execute("MOVE", Redraw::Moved, BoardView::move_forward)
    }

    pub fn turn_left(&mut self) -> Result<(), SessionError> {
        self.execute("LEFT", Redraw::Robot, |view| {
            BoardView::turn_left(view);
            Ok(())
        })
    }

    pub fn turn_right(&mut self) -> Result<(), SessionError> {
        self.execute("RIGHT", Redraw::Robot, |view| {
            BoardView::turn_right(view);
            Ok(())
        })
    }

    pub fn pick_beeper(&mut self) -> Result<(), SessionError> {
        self.execute("TAKE", Redraw::Robot, BoardView::pick_beeper)
    }

    pub fn put_beeper(&mut self) -> Result<(), SessionError> {
        self.execute("PUT", Redraw::Robot, BoardView::put_beeper)
    }

    pub fn front_is_blocked(&mut self) -> Result<bool, SessionError> {
        self.execute("IF_WALL", Redraw::None, |view| Ok(BoardView::front_is_blocked(view)))
    }

    pub fn front_is_treasure(&mut self) -> Result<bool, SessionError> {
        self.execute("IF_GOLD", Redraw::None, |view| Ok(BoardView::front_is_treasure(view)))
    }

    pub fn beeper_is_present(&mut self) -> Result<bool, SessionError> {
        self.execute("IF_MARK", Redraw::None, |view| Ok(BoardView::beeper_is_present(view)))
    }

    pub fn facing_is(&mut self, direction: Direction) -> Result<bool, SessionError> {
        let label = match direction {
            Direction::North => "IF_NORTH",
            Direction::East => "IF_EAST",
            Direction::South => "IF_SOUTH",
            Direction::West => "IF_WEST",
        };
        self.execute(label, Redraw::None, |view| Ok(BoardView::facing_is(view, direction)))
    }

    /// Sets the number of ticks per second; zero, negative or `None` removes
    /// the delay.
    pub fn set_speed(&mut self, speed: Option<f64>) {
        self.config.speed = speed.filter(|s| *s > 0.0);
    }

    /// Sets Karel's bag, `None` for unlimited.
    pub fn set_beepers(&mut self, beepers: Option<u32>) -> Result<(), SessionError> {
        self.execute("BAG", Redraw::None, |view| {
            view.set_beepers(beepers);
            Ok(())
        })
    }

    pub fn set_front_tile(&mut self, tile: Tile) -> Result<(), SessionError> {
        self.execute(&format!("SET {tile}"), Redraw::Full, |view| {
            view.set_front_tile(tile);
            Ok(())
        })
    }

    pub fn set_robot_beepers(&mut self, count: u32) -> Result<(), SessionError> {
        self.execute(&format!("SET{count}"), Redraw::Robot, |view| {
            view.set_robot_beepers(count);
            Ok(())
        })
    }

    /// Cycles quiet, normal and detailed status lines; returns the old one.
    pub fn toggle_status_line(&mut self) -> Result<Verbosity, SessionError> {
        let old = self.config.verbosity;
        self.config.verbosity = old.next();
        let row = self.status_row();
        self.screen.message(row, "", MessageStyle::Status)?;
        self.status("TOGGLE")?;
        self.screen.present()?;
        Ok(old)
    }

    /// Shrinks or grows the view to the screen, keeping Karel in sight.
    pub fn resize(&mut self) -> Result<(), SessionError> {
        let (columns, rows) = self.screen.size()?;
        let bounds = self.view.board().bounds();
        let mut width = i32::from(columns);
        let mut height = i32::from(rows) - 2;
        if let Some(w) = bounds.width {
            width = width.min(w);
        }
        if let Some(h) = bounds.height {
            height = height.min(h);
        }
        if width < 1 || height < 1 {
            return Err(DisplayError::TooSmall {
                columns,
                rows,
                needed_columns: 1,
                needed_rows: 3,
            }
            .into());
        }
        self.view.resize(width, height);
        self.screen.clear()?;
        self.execute("RESIZE", Redraw::Full, |_| Ok(()))
    }

    /// Writes the world in header form to `path`, or the configured output.
    ///
    /// A failure is shown on screen and returned; the world is unaffected.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf, SessionError> {
        match self.try_save(path) {
            Ok(path) => {
                info!(path = %path.display(), "saved map");
                self.message(&format!("Saved to {}", path.display()), MessageStyle::Status)?;
                Ok(path)
            }
            Err(error) => {
                warn!(%error, "save failed");
                self.show_error(&error.to_string())?;
                Err(SessionError::Save(error))
            }
        }
    }

    fn try_save(&self, path: Option<&Path>) -> Result<PathBuf, SaveError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| self.config.output.clone())
            .ok_or(SaveError::NoOutput)?;
        let text = format_map(self.view.board())?;
        std::fs::write(&path, text).map_err(|source| SaveError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Runs a program parsed against [`Session::vocabulary`].
    ///
    /// Robot errors are shown and the program carries on, as a user at the
    /// keyboard would.
    pub fn run_program(&mut self, program: &Program) -> Result<(), SessionError>
    where
        S: 'static,
    {
        let vocabulary = Self::vocabulary();
        self.message("LOADED PROGRAM", MessageStyle::Status)?;
        program.run_traced(&vocabulary, self, |session, step| session.observe(step))?;
        Ok(())
    }

    /// The standard command and condition names bound to this session.
    pub fn vocabulary() -> Vocabulary<Self, SessionError>
    where
        S: 'static,
    {
        Vocabulary::standard()
    }

    fn observe(&mut self, step: &Step<'_>) -> Result<(), SessionError> {
        match self.config.step {
            StepMode::Off => Ok(()),
            StepMode::Log => {
                info!(%step, "program step");
                Ok(())
            }
            StepMode::Show => self.message(&step.to_string(), MessageStyle::Status),
            StepMode::Confirm => {
                self.message(&step.to_string(), MessageStyle::Status)?;
                match self.screen.next_key(None)? {
                    Some(Key::Char('q')) => Err(SessionError::Quit),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Commands Karel with the keyboard until the user quits or leaves.
    pub fn interactive(&mut self) -> Result<InteractiveExit, SessionError> {
        let outer_speed = self.config.speed;
        self.config.speed = None;
        self.message("INTERACTIVE  Press q to quit, p to pause", MessageStyle::Status)?;
        let exit = self.interactive_loop();
        self.config.speed = outer_speed;
        exit
    }

    fn interactive_loop(&mut self) -> Result<InteractiveExit, SessionError> {
        loop {
            let Some(key) = self.screen.next_key(None)? else {
                continue;
            };
            let outcome = match key {
                Key::Char('q') => return Ok(InteractiveExit::Quit),
                Key::Char('I') => return Ok(InteractiveExit::Stopped),
                Key::Up => self.move_forward(),
                Key::Left => self.turn_left(),
                Key::Right => self.turn_right(),
                Key::Char('u') => self.put_beeper(),
                Key::Char('i') => self.pick_beeper(),
                Key::Char('p') => self.pause(),
                Key::Char('w') => self.save(None).map(|_| ()),
                Key::Char('#') => self.set_front_tile(Tile::Wall),
                Key::Char('.') => self.set_front_tile(Tile::Empty),
                Key::Char('$') => self.set_front_tile(Tile::Treasure),
                Key::Char('V') => self.toggle_status_line().map(|_| ()),
                Key::Char('R') | Key::Resize => self.resize(),
                Key::Char('h') | Key::Help => self.message(HELP, MessageStyle::Status),
                Key::Char(c) => match c.to_digit(10) {
                    Some(n) => self.set_robot_beepers(n),
                    None => Ok(()),
                },
                Key::Down => Ok(()),
            };
            match outcome {
                Ok(()) | Err(SessionError::Robot(_) | SessionError::Save(_)) => {}
                Err(SessionError::Quit) => return Ok(InteractiveExit::Quit),
                Err(error) => return Err(error),
            }
        }
    }
}

/// Robot errors were already shown; a program keeps going after them.
fn recover<T: Default>(result: Result<T, SessionError>) -> Result<T, SessionError> {
    match result {
        Err(SessionError::Robot(_)) => Ok(T::default()),
        other => other,
    }
}

impl<S: Screen> RobotControl for Session<S> {
    type Error = SessionError;

    fn move_forward(&mut self) -> Result<(), SessionError> {
        recover(Session::move_forward(self))
    }

    fn turn_left(&mut self) -> Result<(), SessionError> {
        recover(Session::turn_left(self))
    }

    fn turn_right(&mut self) -> Result<(), SessionError> {
        recover(Session::turn_right(self))
    }

    fn pick_beeper(&mut self) -> Result<(), SessionError> {
        recover(Session::pick_beeper(self))
    }

    fn put_beeper(&mut self) -> Result<(), SessionError> {
        recover(Session::put_beeper(self))
    }

    fn front_is_blocked(&mut self) -> Result<bool, SessionError> {
        Session::front_is_blocked(self)
    }

    fn front_is_treasure(&mut self) -> Result<bool, SessionError> {
        Session::front_is_treasure(self)
    }

    fn beeper_is_present(&mut self) -> Result<bool, SessionError> {
        Session::beeper_is_present(self)
    }

    fn facing_is(&mut self, direction: Direction) -> Result<bool, SessionError> {
        Session::facing_is(self, direction)
    }
}
