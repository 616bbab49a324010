// tests/session.rs
use glam::IVec2;
use karel_robot::{
    BoardView, DisplayError, Glyph, InteractiveExit, Key, MapParser, MapStyle, MessageStyle,
    Program, Robot, RobotError, SaveError, Screen, Session, SessionConfig, SessionError, StepMode,
    Tile, Verbosity, ViewConfig,
};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::time::Duration;
use tempfile::tempdir;

/// In-memory screen fed from a key script.
///
/// Blocking reads take from `keys` and fail once it runs dry; timed reads
/// (ticks) take from `timed_keys` and return nothing once it runs dry.
#[derive(Debug, Default)]
struct ScriptedScreen {
    columns: u16,
    rows: u16,
    cells: HashMap<(u16, u16), Glyph>,
    lines: HashMap<u16, (String, MessageStyle)>,
    history: Vec<(String, MessageStyle)>,
    keys: VecDeque<Key>,
    timed_keys: VecDeque<Key>,
    alerts: usize,
}

impl ScriptedScreen {
    fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    fn char_at(&self, column: u16, row: u16) -> Option<char> {
        self.cells.get(&(column, row)).map(|glyph| glyph.char())
    }

    fn line(&self, row: u16) -> &str {
        self.lines.get(&row).map_or("", |(text, _)| text.as_str())
    }
}

impl Screen for ScriptedScreen {
    fn size(&self) -> Result<(u16, u16), DisplayError> {
        Ok((self.columns, self.rows))
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.cells.clear();
        self.lines.clear();
        Ok(())
    }

    fn draw(&mut self, column: u16, row: u16, glyph: Glyph) -> Result<(), DisplayError> {
        self.cells.insert((column, row), glyph);
        Ok(())
    }

    fn message(&mut self, row: u16, text: &str, style: MessageStyle) -> Result<(), DisplayError> {
        self.history.push((text.to_string(), style));
        self.lines.insert(row, (text.to_string(), style));
        Ok(())
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    fn next_key(&mut self, timeout: Option<Duration>) -> Result<Option<Key>, DisplayError> {
        match timeout {
            Some(_) => Ok(self.timed_keys.pop_front()),
            None => self
                .keys
                .pop_front()
                .map(Some)
                .ok_or_else(|| DisplayError::Io(io::Error::other("key script ran out"))),
        }
    }

    fn alert(&mut self) -> Result<(), DisplayError> {
        self.alerts += 1;
        Ok(())
    }
}

const MAP: &str = "#..\n.>.";

fn config() -> SessionConfig {
    SessionConfig {
        speed: None,
        ..SessionConfig::default()
    }
}

/// A 3x2 map shown whole, with the status on row 2 and messages on row 3.
fn setup(map: &str, config: SessionConfig) -> Session<ScriptedScreen> {
    let parsed = MapParser::new(MapStyle::Simple).parse(map).unwrap();
    let view = ViewConfig {
        width: parsed.width,
        height: parsed.height,
        lookahead: 1,
    };
    let board = parsed.into_board().unwrap();
    let screen = ScriptedScreen::new(view.width as u16, view.height as u16 + 2);
    Session::new(BoardView::new(board, view), screen, config).unwrap()
}

#[test]
fn test_new_session_draws_the_world() {
    let session = setup(MAP, config());
    let screen = session.screen();
    assert_eq!(screen.char_at(0, 0), Some('#'));
    assert_eq!(screen.char_at(2, 0), Some('.'));
    assert_eq!(screen.char_at(1, 1), Some('>'));
}

#[test]
fn test_screen_must_fit_view_and_two_lines() {
    let board = MapParser::new(MapStyle::Simple)
        .parse(MAP)
        .unwrap()
        .into_board()
        .unwrap();
    let view = BoardView::new(
        board,
        ViewConfig {
            width: 3,
            height: 2,
            lookahead: 1,
        },
    );
    let err = Session::new(view, ScriptedScreen::new(3, 3), config()).err();
    assert!(matches!(
        err,
        Some(DisplayError::TooSmall {
            needed_columns: 3,
            needed_rows: 4,
            ..
        })
    ));
}

#[test]
fn test_move_redraws_both_tiles_and_status() {
    let mut session = setup(MAP, config());
    session.move_forward().unwrap();

    let screen = session.screen();
    assert_eq!(screen.char_at(1, 1), Some('.'), "vacated tile is redrawn");
    assert_eq!(screen.char_at(2, 1), Some('>'));
    assert!(screen.line(2).starts_with("MOVE"), "status: {}", screen.line(2));
    assert!(screen.line(2).contains("(2, 1)"));
}

#[test]
fn test_robot_error_is_shown_then_returned() {
    let mut session = setup(MAP, config());
    session.move_forward().unwrap();
    session.screen_mut().keys.push_back(Key::Char('x'));

    let err = session.move_forward().unwrap_err();
    assert!(matches!(err, SessionError::Robot(RobotError::Blocked { .. })));
    assert!(!err.is_fatal());

    let screen = session.screen();
    assert_eq!(screen.alerts, 1);
    assert!(
        screen
            .history
            .iter()
            .any(|(m, style)| *style == MessageStyle::Error
                && m.contains("blocked")
                && m.ends_with("Press any key to continue")),
        "{:?}",
        screen.history
    );
    assert_eq!(screen.line(3), "", "error line is cleared after the key");
    assert_eq!(session.view().board().robot().position, IVec2::new(2, 1));
}

#[test]
fn test_quit_while_error_is_shown() {
    let mut session = setup(MAP, config());
    session.screen_mut().keys.push_back(Key::Char('q'));
    let err = session.pick_beeper().unwrap_err();
    assert!(matches!(err, SessionError::Quit));
    assert!(err.is_fatal());
}

#[test]
fn test_pause_during_tick_waits_without_alert() {
    let mut session = setup(MAP, config());
    session.screen_mut().timed_keys.push_back(Key::Char('p'));
    session.screen_mut().keys.push_back(Key::Char('x'));

    session.turn_right().unwrap();
    let screen = session.screen();
    assert_eq!(screen.alerts, 0, "pausing is not an error");
    assert!(
        screen
            .history
            .iter()
            .any(|(m, style)| *style == MessageStyle::Status && m.starts_with("PAUSED"))
    );
    assert!(screen.keys.is_empty(), "the pause consumed a key");
}

#[test]
fn test_quit_during_tick() {
    let mut session = setup(MAP, config());
    session.screen_mut().timed_keys.push_back(Key::Char('q'));
    assert!(matches!(session.turn_left(), Err(SessionError::Quit)));
    // The command itself already happened.
    assert_eq!(session.screen().char_at(1, 1), Some('^'));
}

#[test]
fn test_queries_do_not_tick() {
    let mut session = setup(MAP, config());
    session.screen_mut().timed_keys.push_back(Key::Char('q'));
    assert!(!session.front_is_blocked().unwrap());
    assert!(!session.beeper_is_present().unwrap());
    assert!(session.facing_is(karel_robot::Direction::East).unwrap());
    assert_eq!(session.screen().timed_keys.len(), 1);
}

#[test]
fn test_interactive_keys() {
    let mut session = setup(MAP, config());
    session
        .screen_mut()
        .keys
        .extend([Key::Up, Key::Char('u'), Key::Char('u'), Key::Left, Key::Char('I')]);

    assert_eq!(session.interactive().unwrap(), InteractiveExit::Stopped);
    let board = session.view().board();
    assert_eq!(board.robot().position, IVec2::new(2, 1));
    assert_eq!(board.robot_tile(), Tile::beepers(2));
    assert_eq!(session.screen().char_at(2, 1), Some('^'));
    assert_eq!(session.config().speed, None);
}

#[test]
fn test_interactive_survives_robot_errors() {
    let mut session = setup(MAP, config());
    // `i` fails on an empty tile and waits for a key; `x` dismisses it.
    session
        .screen_mut()
        .keys
        .extend([Key::Char('i'), Key::Char('x'), Key::Char('#'), Key::Char('q')]);

    assert_eq!(session.interactive().unwrap(), InteractiveExit::Quit);
    assert_eq!(session.view().board().front_tile(), Tile::Wall);
    assert_eq!(session.screen().char_at(2, 1), Some('#'));
}

#[test]
fn test_interactive_restores_speed() {
    let mut session = setup(
        MAP,
        SessionConfig {
            speed: Some(1000.0),
            ..SessionConfig::default()
        },
    );
    session.screen_mut().keys.push_back(Key::Char('q'));
    assert_eq!(session.interactive().unwrap(), InteractiveExit::Quit);
    assert_eq!(session.config().speed, Some(1000.0));
}

#[test]
fn test_set_speed_drops_non_positive() {
    let mut session = setup(MAP, config());
    session.set_speed(Some(-1.0));
    assert_eq!(session.config().speed, None);
    session.set_speed(Some(5.0));
    assert_eq!(session.config().speed, Some(5.0));
}

#[test]
fn test_toggle_status_line_cycles() {
    let mut session = setup(MAP, config());
    assert_eq!(session.toggle_status_line().unwrap(), Verbosity::Normal);
    assert!(session.screen().line(2).contains("View(0, 0)"));
    assert_eq!(session.toggle_status_line().unwrap(), Verbosity::Detailed);
    assert_eq!(session.screen().line(2), "", "quiet hides the status");
    assert_eq!(session.toggle_status_line().unwrap(), Verbosity::Quiet);
}

#[test]
fn test_save_writes_header_map() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved.km2");
    let mut session = setup(MAP, config());

    let saved = session.save(Some(path.as_path())).unwrap();
    assert_eq!(saved, path);
    let text = std::fs::read_to_string(&path).unwrap();

    // Only the rectangle around the wall and Karel is written.
    assert_eq!(text, "KAREL 1 1 > N\n# .\n. .\n");
    let parsed = MapParser::new(MapStyle::Header).parse(&text).unwrap();
    assert_eq!(parsed.robot, session.view().board().robot().clone());
    assert!(
        session
            .screen()
            .history
            .iter()
            .any(|(m, _)| m.starts_with("Saved to"))
    );
}

#[test]
fn test_save_uses_configured_output() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.km2");
    let mut session = setup(
        MAP,
        SessionConfig {
            output: Some(output.clone()),
            ..config()
        },
    );
    session.screen_mut().keys.push_back(Key::Char('w'));
    session.screen_mut().keys.push_back(Key::Char('q'));

    assert_eq!(session.interactive().unwrap(), InteractiveExit::Quit);
    assert!(std::fs::read_to_string(&output).unwrap().starts_with("KAREL 1 1 > N"));
}

#[test]
fn test_save_without_output_is_shown_and_returned() {
    let mut session = setup(MAP, config());
    session.screen_mut().keys.push_back(Key::Char('x'));
    let err = session.save(None).unwrap_err();
    assert!(matches!(err, SessionError::Save(SaveError::NoOutput)));
    assert_eq!(session.screen().alerts, 1);
}

#[test]
fn test_resize_to_smaller_screen() {
    let mut session = setup(MAP, config());
    session.screen_mut().columns = 2;
    session.resize().unwrap();
    assert_eq!(session.view().size(), IVec2::new(2, 2));
    assert_eq!(session.view().robot_position(), IVec2::new(1, 1));

    session.screen_mut().rows = 2;
    let err = session.resize().unwrap_err();
    assert!(matches!(err, SessionError::Display(DisplayError::TooSmall { .. })));
    assert!(err.is_fatal());
}

#[test]
fn test_program_walks_and_redraws() {
    let vocabulary = Session::<ScriptedScreen>::vocabulary();
    let source = "\
DEFINE MAIN
    IFWALL SKIP STEP
END
DEFINE STEP
    MOVE
    MAIN
END
RUN MAIN
";
    let program = Program::parse(source, &vocabulary).unwrap();
    let mut session = setup(">...", config());

    session.run_program(&program).unwrap();
    assert_eq!(session.view().board().robot().position, IVec2::new(3, 0));
    assert_eq!(session.screen().char_at(3, 0), Some('>'));
    assert_eq!(session.screen().char_at(0, 0), Some('.'));
}

#[test]
fn test_program_carries_on_after_robot_error() {
    let vocabulary = Session::<ScriptedScreen>::vocabulary();
    let program = Program::parse("DEFINE MAIN\nPICK\nMOVE\nEND\nRUN MAIN", &vocabulary).unwrap();
    let mut session = setup(">...", config());
    session.screen_mut().keys.push_back(Key::Char('x'));

    session.run_program(&program).unwrap();
    assert_eq!(session.view().board().robot().position, IVec2::new(1, 0));
    assert_eq!(session.screen().alerts, 1);
}

#[test]
fn test_confirm_steps_can_quit() {
    let vocabulary = Session::<ScriptedScreen>::vocabulary();
    let program = Program::parse("DEFINE MAIN\nMOVE\nMOVE\nEND\nRUN MAIN", &vocabulary).unwrap();
    let mut session = setup(
        ">...",
        SessionConfig {
            step: StepMode::Confirm,
            ..config()
        },
    );
    session
        .screen_mut()
        .keys
        .extend([Key::Char(' '), Key::Char('q')]);

    let err = session.run_program(&program).unwrap_err();
    assert!(matches!(err, SessionError::Quit));
    assert_eq!(session.view().board().robot().position, IVec2::new(1, 0));
    assert!(
        session
            .screen()
            .history
            .iter()
            .any(|(m, _)| m == "[MAIN:1,stack size:1] MOVE")
    );
}

#[test]
fn test_complete_waits_for_a_key() {
    let mut session = setup(MAP, config());
    assert!(matches!(
        session.complete(),
        Err(SessionError::Display(DisplayError::Io(_)))
    ));
    session.screen_mut().keys.push_back(Key::Char('x'));
    session.complete().unwrap();
    assert_eq!(session.screen().line(3), "Program Complete! Press any key to exit");

    let (view, _) = session.into_parts();
    assert_eq!(view.board().robot(), &Robot::new(IVec2::new(1, 1), karel_robot::Direction::East, None));
}
