//! Karel the Robot in the terminal.
//!
//! Opens a map (or an infinite empty world) and lets the user command
//! Karel with the keyboard. With `--program` a recursive Karel program is
//! run first.

use clap::{ArgAction, Parser};
use karel_robot::{
    Board, Bounds, BoardView, Direction, Grid, MapParser, MapStyle, Program, Robot, Session,
    SessionConfig, SessionError, StepMode, TerminalScreen, Verbosity, ViewConfig,
};
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "karel", version, about = "Karel the Robot in your terminal.")]
struct Cli {
    /// The width of the real map (default infinite).
    #[arg(short = 'x', long = "cols", value_name = "X")]
    x_map: Option<i32>,

    /// The height of the real map (default infinite).
    #[arg(short = 'y', long = "rows", value_name = "Y")]
    y_map: Option<i32>,

    /// Force infinite map in the x-dimension.
    #[arg(short = 'X', long)]
    infinite_x: bool,

    /// Force infinite map in the y-dimension.
    #[arg(short = 'Y', long)]
    infinite_y: bool,

    /// The direction Karel starts with (one of > ^ < v).
    #[arg(short = 'd', long, value_name = ">", value_parser = parse_direction)]
    kareldir: Option<Direction>,

    /// Sets the position Karel starts on.
    #[arg(short = 'k', long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    karelpos: Option<Vec<i32>>,

    /// Sets the number of beepers Karel starts with (default unlimited).
    #[arg(short = 'b', long, value_name = "B")]
    beepers: Option<u32>,

    /// Sets the number of ticks per second, 0 is no limit.
    #[arg(short = 's', long, default_value_t = 3.0, value_name = "S")]
    speed: f64,

    /// Hides the status line.
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,

    /// Shows the status line with more info.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Writes logging information to the file.
    #[arg(short = 'l', long, value_name = "FILE.log")]
    logfile: Option<PathBuf>,

    /// Set the number of fields visible ahead of Karel.
    #[arg(short = 'L', long, default_value_t = 1, value_name = "L")]
    lookahead: i32,

    /// Set the output file, saved with 'w' (map must be finite).
    #[arg(short = 'o', long, value_name = "OUT.km2")]
    output: Option<PathBuf>,

    /// Map starts with 'KAREL X Y > B' and has spaces between tiles.
    #[arg(short = 'n', long)]
    new_style_map: bool,

    /// Text file with a map of Karel's world.
    #[arg(short = 'm', long, value_name = "MAP.km2")]
    karelmap: Option<PathBuf>,

    /// Parse and run a recursive Karel program.
    #[arg(short = 'p', long, value_name = "PROGRAM.ks")]
    program: Option<PathBuf>,

    /// Step through --program: -W waits for a key, -WW only shows each
    /// step, -WWW only logs it.
    #[arg(short = 'W', action = ArgAction::Count)]
    wait: u8,
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    let mut chars = s.chars();
    match (chars.next().and_then(Direction::from_glyph), chars.next()) {
        (Some(direction), None) => Ok(direction),
        _ => Err(format!("'{s}' is not one of > ^ < v")),
    }
}

impl Cli {
    fn session_config(&self) -> SessionConfig {
        let verbosity = if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Detailed
        } else {
            Verbosity::Normal
        };
        SessionConfig {
            speed: Some(self.speed).filter(|s| *s > 0.0),
            verbosity,
            output: self.output.clone(),
            step: StepMode::from_count(self.wait),
        }
    }

    /// Karel as given by `-k` and `-d`, if either was.
    fn robot_override(&self) -> Option<Robot> {
        if self.karelpos.is_none() && self.kareldir.is_none() {
            return None;
        }
        let position = match self.karelpos.as_deref() {
            Some([x, y]) => glam::IVec2::new(*x, *y),
            _ => glam::IVec2::ZERO,
        };
        Some(Robot::new(
            position,
            self.kareldir.unwrap_or(Direction::East),
            None,
        ))
    }

    fn load_board(&self) -> Result<Board, String> {
        let robot = self.robot_override();
        let mut board = match &self.karelmap {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("Failed reading {}: {e}", path.display()))?;
                let style = if self.new_style_map {
                    MapStyle::Header
                } else {
                    MapStyle::from_path(path)
                };
                let mut parser = MapParser::new(style);
                if let Some(robot) = robot {
                    parser = parser.with_robot(robot);
                }
                let mut parsed = parser
                    .parse(&text)
                    .map_err(|e| format!("Failed setting up the map:\n{e}"))?;
                info!(path = %path.display(), width = parsed.width, height = parsed.height, "loaded map");

                let width = if self.infinite_x {
                    None
                } else {
                    Some(self.x_map.unwrap_or(parsed.width))
                };
                let height = if self.infinite_y {
                    None
                } else {
                    Some(self.y_map.unwrap_or(parsed.height))
                };
                parsed.grid.set_bounds(Bounds::new(width, height));
                parsed.into_board()
            }
            None => {
                let bounds = Bounds::new(self.x_map, self.y_map);
                Board::new(robot.unwrap_or_default(), Grid::new(bounds))
            }
        }
        .map_err(|e| format!("Failed setting up the map:\n{e}"))?;

        if self.beepers.is_some() {
            board.set_beepers(self.beepers);
        }
        Ok(board)
    }
}

fn init_logging(logfile: Option<&PathBuf>, verbose: bool) -> Result<(), String> {
    let Some(path) = logfile else {
        return Ok(());
    };
    let file: File = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed opening log file {}: {e}", path.display()))?;
    let default = if verbose { "karel_robot=trace" } else { "karel_robot=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let board = cli.load_board()?;
    let program = match &cli.program {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed reading {}: {e}", path.display()))?;
            let vocabulary = Session::<TerminalScreen>::vocabulary();
            let program = Program::parse(&text, &vocabulary)
                .map_err(|e| format!("Failed parsing {}:\n{e}", path.display()))?;
            Some(program)
        }
        None => None,
    };

    let screen = TerminalScreen::open().map_err(|e| e.to_string())?;
    let (columns, rows) = karel_robot::Screen::size(&screen).map_err(|e| e.to_string())?;
    let bounds = board.bounds();
    let view = ViewConfig {
        width: bounds.width.unwrap_or(i32::MAX).min(i32::from(columns)),
        height: bounds
            .height
            .unwrap_or(i32::MAX)
            .min(i32::from(rows) - 2),
        lookahead: cli.lookahead,
    };
    let mut session = Session::new(BoardView::new(board, view), screen, cli.session_config())
        .map_err(|e| format!("Probably a problem with the terminal:\n{e}"))?;

    let outcome = match drive(&mut session, program.as_ref()) {
        Err(SessionError::Quit) => Ok(()),
        other => other,
    };
    if let Err(e) = &outcome {
        error!(error = %e, "session ended");
        if session.config().output.is_some() {
            let _ = session.save(None);
        }
    }
    drop(session);
    outcome.map_err(|e| e.to_string())
}

fn drive(
    session: &mut Session<TerminalScreen>,
    program: Option<&Program>,
) -> Result<(), SessionError> {
    if let Some(program) = program {
        session.run_program(program)?;
        session.complete()?;
    }
    session.interactive()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.logfile.as_ref(), cli.verbose) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
