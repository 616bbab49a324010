//! Parser and runner for recursive Karel programs.
//!
//! A program is a list of procedure definitions and one `RUN` line:
//!
//! ```text
//! DEFINE MAIN
//!     IFWALL PUT MOVE
//!     IFWALL SKIP MAIN   # walk to the wall
//! END
//! RUN MAIN
//! ```
//!
//! Lines are case-insensitive and `#` starts a comment. A statement is a
//! command, a procedure call or a conditional `<condition> <then> <else>`
//! whose branches are again command or procedure names.
//!
//! The names of commands and conditions come from a [`Vocabulary`], which
//! binds each of them to a closure over some context `C` (a [`Board`], a
//! session, a test double). Register them with
//! [`set_command`](Vocabulary::set_command) and
//! [`set_condition`](Vocabulary::set_condition) or take the
//! [`standard`](Vocabulary::standard) set, then [`Program::parse`] the text
//! and [`Program::run`] it.

use crate::board::Board;
use crate::error::{ProgramFormatError, ProgramRuntimeError, RobotError, UndefinedName};
use crate::robot::Direction;
use crate::view::BoardView;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, trace};

/// Action run for a command name.
pub type Action<C, E> = Box<dyn Fn(&mut C) -> Result<(), E>>;

/// Check evaluated for a condition name.
pub type Check<C, E> = Box<dyn Fn(&mut C) -> Result<bool, E>>;

/// The robot operations a program can drive.
///
/// Every method may fail so that a context can surface its own errors
/// (a quit key, a broken terminal) through the interpreter.
pub trait RobotControl {
    type Error;

    fn move_forward(&mut self) -> Result<(), Self::Error>;
    fn turn_left(&mut self) -> Result<(), Self::Error>;
    fn turn_right(&mut self) -> Result<(), Self::Error>;
    fn pick_beeper(&mut self) -> Result<(), Self::Error>;
    fn put_beeper(&mut self) -> Result<(), Self::Error>;
    fn front_is_blocked(&mut self) -> Result<bool, Self::Error>;
    fn front_is_treasure(&mut self) -> Result<bool, Self::Error>;
    fn beeper_is_present(&mut self) -> Result<bool, Self::Error>;
    fn facing_is(&mut self, direction: Direction) -> Result<bool, Self::Error>;
}

impl RobotControl for Board {
    type Error = RobotError;

    fn move_forward(&mut self) -> Result<(), RobotError> {
        Board::move_forward(self)
    }

    fn turn_left(&mut self) -> Result<(), RobotError> {
        Board::turn_left(self);
        Ok(())
    }

    fn turn_right(&mut self) -> Result<(), RobotError> {
        Board::turn_right(self);
        Ok(())
    }

    fn pick_beeper(&mut self) -> Result<(), RobotError> {
        Board::pick_beeper(self)
    }

    fn put_beeper(&mut self) -> Result<(), RobotError> {
        Board::put_beeper(self)
    }

    fn front_is_blocked(&mut self) -> Result<bool, RobotError> {
        Ok(Board::front_is_blocked(self))
    }

    fn front_is_treasure(&mut self) -> Result<bool, RobotError> {
        Ok(Board::front_is_treasure(self))
    }

    fn beeper_is_present(&mut self) -> Result<bool, RobotError> {
        Ok(Board::beeper_is_present(self))
    }

    fn facing_is(&mut self, direction: Direction) -> Result<bool, RobotError> {
        Ok(Board::facing_is(self, direction))
    }
}

impl RobotControl for BoardView {
    type Error = RobotError;

    fn move_forward(&mut self) -> Result<(), RobotError> {
        BoardView::move_forward(self)
    }

    fn turn_left(&mut self) -> Result<(), RobotError> {
        BoardView::turn_left(self);
        Ok(())
    }

    fn turn_right(&mut self) -> Result<(), RobotError> {
        BoardView::turn_right(self);
        Ok(())
    }

    fn pick_beeper(&mut self) -> Result<(), RobotError> {
        BoardView::pick_beeper(self)
    }

    fn put_beeper(&mut self) -> Result<(), RobotError> {
        BoardView::put_beeper(self)
    }

    fn front_is_blocked(&mut self) -> Result<bool, RobotError> {
        Ok(BoardView::front_is_blocked(self))
    }

    fn front_is_treasure(&mut self) -> Result<bool, RobotError> {
        Ok(BoardView::front_is_treasure(self))
    }

    fn beeper_is_present(&mut self) -> Result<bool, RobotError> {
        Ok(BoardView::beeper_is_present(self))
    }

    fn facing_is(&mut self, direction: Direction) -> Result<bool, RobotError> {
        Ok(BoardView::facing_is(self, direction))
    }
}

/// Command and condition names available to programs.
pub struct Vocabulary<C, E> {
    commands: HashMap<String, Action<C, E>>,
    conditions: HashMap<String, Check<C, E>>,
}

impl<C, E> Default for Vocabulary<C, E> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
            conditions: HashMap::new(),
        }
    }
}

impl<C, E> Vocabulary<C, E> {
    /// An empty vocabulary; every single name is then a procedure call.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a command name. Names are case-insensitive.
    pub fn set_command(&mut self, name: &str, action: impl Fn(&mut C) -> Result<(), E> + 'static) {
        self.commands.insert(name.to_lowercase(), Box::new(action));
    }

    /// Binds a condition name. Names are case-insensitive.
    pub fn set_condition(
        &mut self,
        name: &str,
        check: impl Fn(&mut C) -> Result<bool, E> + 'static,
    ) {
        self.conditions.insert(name.to_lowercase(), Box::new(check));
    }

    /// Builder form of [`set_command`](Self::set_command).
    pub fn with_command(
        mut self,
        name: &str,
        action: impl Fn(&mut C) -> Result<(), E> + 'static,
    ) -> Self {
        self.set_command(name, action);
        self
    }

    /// Builder form of [`set_condition`](Self::set_condition).
    pub fn with_condition(
        mut self,
        name: &str,
        check: impl Fn(&mut C) -> Result<bool, E> + 'static,
    ) -> Self {
        self.set_condition(name, check);
        self
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn is_condition(&self, name: &str) -> bool {
        self.conditions.contains_key(name)
    }
}

impl<C: RobotControl<Error = E> + 'static, E: 'static> Vocabulary<C, E> {
    /// The conventional Karel vocabulary.
    ///
    /// | name      | meaning                          |
    /// |-----------|----------------------------------|
    /// | `skip`    | do nothing                       |
    /// | `move`    | step forward                     |
    /// | `left`    | turn left                        |
    /// | `right`   | turn right                       |
    /// | `pick`    | pick a beeper                    |
    /// | `put`     | put a beeper                     |
    /// | `ifwall`  | front is blocked                 |
    /// | `ifmark`  | beeper is present                |
    /// | `ifgold`  | front is a treasure              |
    /// | `ifnorth` `ifeast` `ifsouth` `ifwest` | facing that way |
    pub fn standard() -> Self {
        let mut vocabulary = Self::new()
            .with_command("skip", |_| Ok(()))
            .with_command("move", C::move_forward)
            .with_command("left", C::turn_left)
            .with_command("right", C::turn_right)
            .with_command("pick", C::pick_beeper)
            .with_command("put", C::put_beeper)
            .with_condition("ifwall", C::front_is_blocked)
            .with_condition("ifmark", C::beeper_is_present)
            .with_condition("ifgold", C::front_is_treasure);

        let facings = [
            ("ifnorth", Direction::North),
            ("ifeast", Direction::East),
            ("ifsouth", Direction::South),
            ("ifwest", Direction::West),
        ];
        for (name, direction) in facings {
            vocabulary.set_condition(name, move |c: &mut C| c.facing_is(direction));
        }
        vocabulary
    }
}

/// One entry of a procedure body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// A command or a procedure call.
    Invoke(String),
    /// `<condition> <then> <else>`.
    Conditional {
        condition: String,
        then: String,
        otherwise: String,
    },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Invoke(name) => write!(f, "{}", name.to_uppercase()),
            Statement::Conditional {
                condition,
                then,
                otherwise,
            } => write!(
                f,
                "{} {} {}",
                condition.to_uppercase(),
                then.to_uppercase(),
                otherwise.to_uppercase()
            ),
        }
    }
}

/// The statement about to run, as shown to a step-through observer.
#[derive(Clone, Copy, Debug)]
pub struct Step<'a> {
    pub procedure: &'a str,
    pub index: usize,
    /// Call stack size including the current frame.
    pub depth: usize,
    pub statement: &'a Statement,
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{},stack size:{}] {}",
            self.procedure.to_uppercase(),
            self.index,
            self.depth,
            self.statement
        )
    }
}

/// A procedure being executed and its program counter.
#[derive(Clone, Copy, Debug)]
struct Frame<'p> {
    procedure: &'p str,
    body: &'p [Statement],
    index: usize,
}

/// A parsed and validated Karel program.
#[derive(Clone, Debug, Default)]
pub struct Program {
    main: Option<String>,
    procedures: HashMap<String, Vec<Statement>>,
}

impl Program {
    /// Parses `source` against the names in `vocabulary`.
    ///
    /// Procedures may be used before they are defined; every name is
    /// checked once the whole text is read and all undefined names are
    /// reported together.
    pub fn parse<C, E>(
        source: &str,
        vocabulary: &Vocabulary<C, E>,
    ) -> Result<Self, ProgramFormatError> {
        let mut parser = ProgramParser {
            vocabulary,
            program: Program::default(),
            current: None,
            references: Vec::new(),
        };
        for (i, line) in source.lines().enumerate() {
            parser.parse_line(i + 1, line)?;
        }
        let program = parser.finish()?;
        info!(
            procedures = program.procedures.len(),
            main = program.main.as_deref().unwrap_or("-"),
            "parsed program"
        );
        Ok(program)
    }

    /// Name of the procedure started by [`run`](Self::run), if declared.
    pub fn main(&self) -> Option<&str> {
        self.main.as_deref()
    }

    pub fn procedure(&self, name: &str) -> Option<&[Statement]> {
        self.procedures.get(&name.to_lowercase()).map(Vec::as_slice)
    }

    pub fn procedure_names(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    /// Runs the program from its `RUN` procedure.
    pub fn run<C, E>(
        &self,
        vocabulary: &Vocabulary<C, E>,
        context: &mut C,
    ) -> Result<(), ProgramRuntimeError<E>> {
        self.run_traced(vocabulary, context, |_, _| Ok(()))
    }

    /// Runs the program, showing every statement to `observe` before it runs.
    ///
    /// Calls use an explicit stack, so recursion depth is bounded by memory
    /// only. A frame is popped as soon as its last statement starts, which
    /// makes a call in tail position reuse the caller's slot.
    pub fn run_traced<C, E, F>(
        &self,
        vocabulary: &Vocabulary<C, E>,
        context: &mut C,
        mut observe: F,
    ) -> Result<(), ProgramRuntimeError<E>>
    where
        F: FnMut(&mut C, &Step<'_>) -> Result<(), E>,
    {
        let main = self.main.as_deref().ok_or(ProgramRuntimeError::NoRun)?;
        let first = self
            .frame(main)
            .ok_or_else(|| ProgramRuntimeError::UndefinedProcedure(main.to_string()))?;
        let mut stack = vec![first];

        loop {
            let depth = stack.len();
            let Some(top) = stack.last_mut() else {
                break;
            };
            let Frame {
                procedure,
                body,
                index,
            } = *top;
            let Some(statement) = body.get(index) else {
                stack.pop();
                continue;
            };

            let step = Step {
                procedure,
                index,
                depth,
                statement,
            };
            trace!(%step, "step");
            observe(context, &step).map_err(ProgramRuntimeError::Command)?;

            top.index += 1;
            if top.index == body.len() {
                stack.pop();
            }
            self.execute(statement, vocabulary, context, &mut stack)?;
        }
        Ok(())
    }

    fn frame(&self, name: &str) -> Option<Frame<'_>> {
        let (procedure, body) = self.procedures.get_key_value(name)?;
        Some(Frame {
            procedure,
            body,
            index: 0,
        })
    }

    fn execute<'p, C, E>(
        &'p self,
        statement: &'p Statement,
        vocabulary: &Vocabulary<C, E>,
        context: &mut C,
        stack: &mut Vec<Frame<'p>>,
    ) -> Result<(), ProgramRuntimeError<E>> {
        let name = match statement {
            Statement::Invoke(name) => name,
            Statement::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let check = vocabulary
                    .conditions
                    .get(condition)
                    .ok_or_else(|| ProgramRuntimeError::UnknownCondition(condition.clone()))?;
                if check(context).map_err(ProgramRuntimeError::Command)? {
                    then
                } else {
                    otherwise
                }
            }
        };

        if let Some(action) = vocabulary.commands.get(name) {
            return action(context).map_err(ProgramRuntimeError::Command);
        }
        let frame = self
            .frame(name)
            .ok_or_else(|| ProgramRuntimeError::UndefinedProcedure(name.clone()))?;
        stack.push(frame);
        Ok(())
    }
}

/// Line by line state while reading a program.
struct ProgramParser<'v, C, E> {
    vocabulary: &'v Vocabulary<C, E>,
    program: Program,
    /// The procedure being defined, with its body so far.
    current: Option<(String, Vec<Statement>)>,
    /// Names to resolve after parsing, with the line they appear on.
    references: Vec<(String, usize)>,
}

impl<C, E> ProgramParser<'_, C, E> {
    fn expected_tokens(&self, keyword: &str) -> usize {
        match keyword {
            "define" | "run" => 2,
            k if self.vocabulary.is_condition(k) => 3,
            _ => 1,
        }
    }

    /// Remembers names that are not commands, to check later.
    fn reference(&mut self, line: usize, names: &[&str]) {
        for name in names {
            if !self.vocabulary.is_command(name) {
                self.references.push((name.to_string(), line));
            }
        }
    }

    fn parse_line(&mut self, line: usize, text: &str) -> Result<(), ProgramFormatError> {
        let code = text.split('#').next().unwrap_or_default().to_lowercase();
        let tokens: Vec<&str> = code.split_whitespace().collect();
        let Some(&keyword) = tokens.first() else {
            return Ok(());
        };

        let expected = self.expected_tokens(keyword);
        if tokens.len() != expected {
            return Err(ProgramFormatError::Arity {
                line,
                expected,
                found: tokens.len(),
            });
        }

        if self.current.is_none() {
            self.parse_declaration(line, &tokens)
        } else {
            self.parse_statement(line, &tokens)
        }
    }

    /// `DEFINE <name>` and `RUN <name>`.
    fn parse_declaration(&mut self, line: usize, tokens: &[&str]) -> Result<(), ProgramFormatError> {
        match tokens {
            ["define", name] => {
                if self.program.procedures.contains_key(*name) {
                    return Err(ProgramFormatError::DuplicateProcedure {
                        line,
                        name: name.to_string(),
                    });
                }
                self.current = Some((name.to_string(), Vec::new()));
            }
            ["run", name] => {
                if self.program.main.is_some() {
                    return Err(ProgramFormatError::DuplicateRun { line });
                }
                // Main must be a procedure, even when a command shares its name.
                self.references.push((name.to_string(), line));
                self.program.main = Some(name.to_string());
            }
            [word, ..] => {
                return Err(ProgramFormatError::UnknownDeclaration {
                    line,
                    word: word.to_string(),
                });
            }
            [] => {}
        }
        Ok(())
    }

    fn parse_statement(&mut self, line: usize, tokens: &[&str]) -> Result<(), ProgramFormatError> {
        let statement = match tokens {
            [keyword @ ("define" | "run"), ..] => {
                return Err(ProgramFormatError::Unterminated {
                    line,
                    keyword: keyword.to_uppercase(),
                });
            }
            ["end"] => {
                if let Some((name, body)) = self.current.take() {
                    if body.is_empty() {
                        return Err(ProgramFormatError::EmptyProcedure { line });
                    }
                    self.program.procedures.insert(name, body);
                }
                return Ok(());
            }
            [condition, then, otherwise] => {
                self.reference(line, &[*then, *otherwise]);
                Statement::Conditional {
                    condition: condition.to_string(),
                    then: then.to_string(),
                    otherwise: otherwise.to_string(),
                }
            }
            [name] => {
                self.reference(line, &[*name]);
                Statement::Invoke(name.to_string())
            }
            _ => return Ok(()),
        };
        if let Some((_, body)) = self.current.as_mut() {
            body.push(statement);
        }
        Ok(())
    }

    fn finish(self) -> Result<Program, ProgramFormatError> {
        if let Some((name, _)) = self.current {
            return Err(ProgramFormatError::UnterminatedAtEof { name });
        }

        let mut undefined: Vec<UndefinedName> = Vec::new();
        for (name, line) in self.references {
            if self.program.procedures.contains_key(&name) {
                continue;
            }
            match undefined.iter_mut().find(|u| u.name == name) {
                Some(entry) => entry.lines.push(line),
                None => undefined.push(UndefinedName {
                    name,
                    lines: vec![line],
                }),
            }
        }
        if !undefined.is_empty() {
            return Err(ProgramFormatError::Undefined(undefined));
        }
        Ok(self.program)
    }
}
