// tests/interpreter.rs
use glam::IVec2;
use karel_robot::{
    Board, Bounds, Direction, Grid, Program, ProgramFormatError, ProgramRuntimeError, Robot,
    RobotError, Statement, UndefinedName, Vocabulary,
};
use std::cell::Cell;
use std::convert::Infallible;
use std::rc::Rc;

const WAIT_FOR_WALL: &str = "\
DEFINE MAIN
    IFWALL SKIP MAIN
END
RUN MAIN
";

const WALK_TO_WALL: &str = "\
DEFINE MAIN
    IFWALL SKIP STEP
END
DEFINE STEP
    MOVE
    MAIN
END
RUN MAIN
";

/// Counts how often the wall was checked and reports one after `limit` checks.
#[derive(Debug, Default)]
struct Counter {
    checks: usize,
    skips: usize,
    limit: usize,
}

fn setup(limit: usize) -> (Vocabulary<Counter, Infallible>, Counter) {
    let vocabulary = Vocabulary::new()
        .with_command("skip", |c: &mut Counter| {
            c.skips += 1;
            Ok(())
        })
        .with_condition("ifwall", |c: &mut Counter| {
            c.checks += 1;
            Ok(c.checks >= c.limit)
        });
    let counter = Counter {
        limit,
        ..Counter::default()
    };
    (vocabulary, counter)
}

fn corridor(length: i32) -> Board {
    Board::new(Robot::default(), Grid::new(Bounds::finite(length, 1))).unwrap()
}

#[test]
fn test_blocked_robot_skips_once() {
    let (vocabulary, mut counter) = setup(1);
    let program = Program::parse(WAIT_FOR_WALL, &vocabulary).unwrap();

    let mut steps = Vec::new();
    program
        .run_traced(&vocabulary, &mut counter, |_, step| {
            steps.push(step.to_string());
            Ok(())
        })
        .unwrap();

    assert_eq!(counter.skips, 1);
    assert_eq!(steps, vec!["[MAIN:0,stack size:1] IFWALL SKIP MAIN".to_string()]);
}

#[test]
fn test_tail_recursion_does_not_grow_the_stack() {
    let (vocabulary, mut counter) = setup(100_000);
    let program = Program::parse(WAIT_FOR_WALL, &vocabulary).unwrap();

    let mut deepest = 0;
    program
        .run_traced(&vocabulary, &mut counter, |_, step| {
            deepest = deepest.max(step.depth);
            Ok(())
        })
        .unwrap();

    assert_eq!(counter.checks, 100_000);
    assert_eq!(counter.skips, 1);
    assert_eq!(deepest, 1, "MAIN calls itself in tail position");
}

#[test]
fn test_standard_vocabulary_walks_to_wall() {
    let vocabulary = Vocabulary::<Board, RobotError>::standard();
    let program = Program::parse(WALK_TO_WALL, &vocabulary).unwrap();
    let mut board = corridor(50);

    let mut deepest = 0;
    program
        .run_traced(&vocabulary, &mut board, |_, step| {
            deepest = deepest.max(step.depth);
            Ok(())
        })
        .unwrap();

    assert_eq!(board.robot().position, IVec2::new(49, 0));
    assert!(deepest <= 2, "stack reached {deepest}");
}

#[test]
fn test_blocked_board_runs_skip_once() {
    let skips = Rc::new(Cell::new(0));
    let counted = Rc::clone(&skips);
    let vocabulary = Vocabulary::<Board, RobotError>::standard().with_command("SKIP", move |_| {
        counted.set(counted.get() + 1);
        Ok(())
    });
    let program = Program::parse(WAIT_FOR_WALL, &vocabulary).unwrap();
    let mut board = corridor(1);

    program.run(&vocabulary, &mut board).unwrap();
    assert_eq!(skips.get(), 1);
}

#[test]
fn test_robot_error_stops_board_program() {
    let vocabulary = Vocabulary::<Board, RobotError>::standard();
    let program = Program::parse("DEFINE MAIN\nMOVE\nEND\nRUN MAIN", &vocabulary).unwrap();
    let mut board = corridor(1);

    let err = program.run(&vocabulary, &mut board).unwrap_err();
    assert!(matches!(err, ProgramRuntimeError::Command(RobotError::Blocked { .. })));
}

#[test]
fn test_conditions_steer_the_robot() {
    let source = "\
# turn until facing north, then drop a beeper
DEFINE FACE_NORTH
    IFNORTH PUT TURN
END
DEFINE TURN
    LEFT
    FACE_NORTH
END
RUN FACE_NORTH
";
    let vocabulary = Vocabulary::<Board, RobotError>::standard();
    let program = Program::parse(source, &vocabulary).unwrap();
    let mut board = Board::empty(Bounds::unbounded()).unwrap();

    program.run(&vocabulary, &mut board).unwrap();
    assert!(board.facing_is(Direction::North));
    assert!(board.beeper_is_present());
}

#[test]
fn test_parse_is_case_insensitive_and_skips_comments() {
    let (vocabulary, _) = setup(1);
    let source = "define Main   # comment\n\n   Skip\nEnd\n# RUN OTHER\nrun MAIN\n";
    let program = Program::parse(source, &vocabulary).unwrap();

    assert_eq!(program.main(), Some("main"));
    assert_eq!(
        program.procedure("MAIN"),
        Some(&[Statement::Invoke("skip".to_string())][..])
    );
    assert_eq!(program.procedure_names().count(), 1);
}

#[test]
fn test_undefined_names_reported_together() {
    let (vocabulary, _) = setup(1);
    let source = "\
DEFINE MAIN
    FOO
    IFWALL BAR FOO
END
RUN BAZ
";
    let err = Program::parse(source, &vocabulary).unwrap_err();
    assert_eq!(
        err,
        ProgramFormatError::Undefined(vec![
            UndefinedName {
                name: "foo".to_string(),
                lines: vec![2, 3]
            },
            UndefinedName {
                name: "bar".to_string(),
                lines: vec![3]
            },
            UndefinedName {
                name: "baz".to_string(),
                lines: vec![5]
            },
        ])
    );
    assert!(err.to_string().contains("'foo' not defined on lines 2, 3"));
}

#[test]
fn test_procedures_may_be_used_before_definition() {
    let (vocabulary, mut counter) = setup(1);
    let source = "RUN FIRST\nDEFINE FIRST\nSECOND\nEND\nDEFINE SECOND\nSKIP\nEND\n";
    let program = Program::parse(source, &vocabulary).unwrap();
    program.run(&vocabulary, &mut counter).unwrap();
    assert_eq!(counter.skips, 1);
}

#[test]
fn test_malformed_programs() {
    let (vocabulary, _) = setup(1);
    let parse = |source: &str| Program::parse(source, &vocabulary).unwrap_err();

    assert_eq!(
        parse("DEFINE MAIN\nIFWALL SKIP\nEND"),
        ProgramFormatError::Arity {
            line: 2,
            expected: 3,
            found: 2
        }
    );
    assert_eq!(
        parse("DEFINE A\nDEFINE B\n"),
        ProgramFormatError::Unterminated {
            line: 2,
            keyword: "DEFINE".to_string()
        }
    );
    assert_eq!(
        parse("DEFINE A\nSKIP\nEND\nRUN A\nRUN A"),
        ProgramFormatError::DuplicateRun { line: 5 }
    );
    assert_eq!(
        parse("DEFINE A\nSKIP\nEND\nDEFINE a\nSKIP\nEND"),
        ProgramFormatError::DuplicateProcedure {
            line: 4,
            name: "a".to_string()
        }
    );
    assert_eq!(
        parse("DEFINE A\nEND"),
        ProgramFormatError::EmptyProcedure { line: 2 }
    );
    assert_eq!(
        parse("DEFINE A\nSKIP"),
        ProgramFormatError::UnterminatedAtEof {
            name: "a".to_string()
        }
    );
    assert_eq!(
        parse("SKIP"),
        ProgramFormatError::UnknownDeclaration {
            line: 1,
            word: "skip".to_string()
        }
    );
    assert_eq!(
        parse("DEFINE A\nRUN A"),
        ProgramFormatError::Unterminated {
            line: 2,
            keyword: "RUN".to_string()
        }
    );
    assert_eq!(
        parse("END"),
        ProgramFormatError::UnknownDeclaration {
            line: 1,
            word: "end".to_string()
        }
    );
}

#[test]
fn test_condition_is_not_a_branch() {
    let vocabulary = Vocabulary::<Board, RobotError>::standard();
    let err = Program::parse("DEFINE MAIN\nIFWALL IFMARK SKIP\nEND\nRUN MAIN", &vocabulary)
        .unwrap_err();
    assert_eq!(
        err,
        ProgramFormatError::Undefined(vec![UndefinedName {
            name: "ifmark".to_string(),
            lines: vec![2]
        }])
    );
}

#[test]
fn test_run_needs_a_procedure() {
    let vocabulary = Vocabulary::<Board, RobotError>::standard();
    let err = Program::parse("RUN MOVE", &vocabulary).unwrap_err();
    assert_eq!(
        err,
        ProgramFormatError::Undefined(vec![UndefinedName {
            name: "move".to_string(),
            lines: vec![1]
        }])
    );
}

#[test]
fn test_program_without_run_fails_to_start() {
    let (vocabulary, mut counter) = setup(1);
    let program = Program::parse("DEFINE A\nSKIP\nEND", &vocabulary).unwrap();
    assert_eq!(program.main(), None);
    assert_eq!(
        program.run(&vocabulary, &mut counter),
        Err(ProgramRuntimeError::NoRun)
    );
    assert_eq!(counter.skips, 0);
}
