//! Error taxonomy shared by the world model, the parsers and the session.

use crate::robot::Direction;
use crate::tile::Tile;
use glam::IVec2;
use std::path::PathBuf;
use thiserror::Error;

/// A robot operation that violated its precondition.
///
/// Always recoverable: the world is left exactly as it was before the call.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RobotError {
    #[error("Can't move. Karel is blocked by {tile:?} at ({}, {}) facing {direction}.", .position.x, .position.y)]
    Blocked {
        position: IVec2,
        direction: Direction,
        tile: Tile,
    },
    #[error("Can't pick beeper from {tile:?} at ({}, {}).", .position.x, .position.y)]
    NoBeeperHere { position: IVec2, tile: Tile },
    #[error("Can't put beeper. Karel has none!")]
    NoBeepersLeft,
    #[error("Karel can not stand on {tile:?} at ({}, {}).", .position.x, .position.y)]
    PlacedOnBlocking { position: IVec2, tile: Tile },
}

/// A malformed map text. Line numbers and columns are 1-based.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapFormatError {
    #[error("Map is empty!")]
    Empty,
    #[error("line {line}: map header not in form 'KAREL X Y > B' ({reason})")]
    Header { line: usize, reason: String },
    #[error("line {line}: Karel map must be a rectangle (expected {expected} columns, found {found})")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: invalid token '{token}' in column {column}")]
    InvalidToken {
        line: usize,
        column: usize,
        token: String,
    },
    #[error("line {line}: Karel in column {column} is already on ({}, {})", .first.x, .first.y)]
    DuplicateRobot {
        line: usize,
        column: usize,
        first: IVec2,
    },
    #[error("Karel must be placed on the map!")]
    MissingRobot,
}

/// An undefined name together with every line that referenced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndefinedName {
    pub name: String,
    pub lines: Vec<usize>,
}

impl std::fmt::Display for UndefinedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self.lines.iter().map(ToString::to_string).collect();
        write!(
            f,
            "procedure '{}' not defined on lines {}",
            self.name,
            lines.join(", ")
        )
    }
}

fn join_undefined(names: &[UndefinedName]) -> String {
    let parts: Vec<String> = names.iter().map(ToString::to_string).collect();
    parts.join("; ")
}

/// A malformed interpreter program, detected before anything runs.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProgramFormatError {
    #[error("line {line}: wrong number of tokens (expected {expected}, found {found})")]
    Arity {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: unknown declaration '{word}'")]
    UnknownDeclaration { line: usize, word: String },
    #[error("line {line}: last procedure not ENDed before {keyword}")]
    Unterminated { line: usize, keyword: String },
    #[error("last defined procedure '{name}' not ENDed")]
    UnterminatedAtEof { name: String },
    #[error("line {line}: multiple definitions of '{name}'")]
    DuplicateProcedure { line: usize, name: String },
    #[error("line {line}: multiple RUN declarations")]
    DuplicateRun { line: usize },
    #[error("line {line}: procedure cannot be empty, use SKIP")]
    EmptyProcedure { line: usize },
    #[error("{}", join_undefined(.0))]
    Undefined(Vec<UndefinedName>),
}

/// A failure while running a parsed program.
///
/// `Command` carries whatever error an injected command or condition returned;
/// the other variants indicate a program that should never have passed parsing.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ProgramRuntimeError<E> {
    #[error("no RUN declaration")]
    NoRun,
    #[error("procedure not found: {0}")]
    UndefinedProcedure(String),
    #[error("condition not found: {0}")]
    UnknownCondition(String),
    #[error("{0}")]
    Command(E),
}

/// Failure writing a map out.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("no output file set")]
    NoOutput,
    #[error("can not save an unbounded map")]
    Unbounded,
    #[error("map can not be written in simple form: {0}")]
    NotRepresentable(String),
    #[error("failed writing {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Operations that need both grid bounds finite.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("the grid is unbounded, its size is undefined")]
pub struct SizeUndefined;

/// Access to a view coordinate further than one tile outside the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("view accessed beyond the boundary at ({}, {}) of a {}x{} view", .position.x, .position.y, .size.x, .size.y)]
pub struct ViewError {
    pub position: IVec2,
    pub size: IVec2,
}

/// Environmental failures of the screen the world is drawn on.
#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("screen too small ({columns}, {rows}) for a view of ({needed_columns}, {needed_rows})")]
    TooSmall {
        columns: u16,
        rows: u16,
        needed_columns: u16,
        needed_rows: u16,
    },
    #[error("terminal failure: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a session command can report to its caller.
///
/// `Robot` and `Save` have already been shown to the user when returned;
/// the session stays usable after them.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Robot(#[from] RobotError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Display(#[from] DisplayError),
    #[error(transparent)]
    Program(ProgramRuntimeError<std::convert::Infallible>),
    #[error("quit requested")]
    Quit,
}

impl SessionError {
    /// Whether the session should end after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SessionError::Display(_) | SessionError::Program(_) | SessionError::Quit
        )
    }
}

impl From<ProgramRuntimeError<SessionError>> for SessionError {
    fn from(error: ProgramRuntimeError<SessionError>) -> Self {
        match error {
            ProgramRuntimeError::Command(error) => error,
            ProgramRuntimeError::NoRun => SessionError::Program(ProgramRuntimeError::NoRun),
            ProgramRuntimeError::UndefinedProcedure(name) => {
                SessionError::Program(ProgramRuntimeError::UndefinedProcedure(name))
            }
            ProgramRuntimeError::UnknownCondition(name) => {
                SessionError::Program(ProgramRuntimeError::UnknownCondition(name))
            }
        }
    }
}
