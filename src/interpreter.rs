//! Drives statements through classification, resolution and execution in
//! file order.

use crate::env::{Environment, ResolutionError};
use crate::lexer::{self, SourceLine};
use crate::parser::{self, ParseError};
use crate::pipeline::{self, Cmd, ExecutionError, ExitCode};
use log::debug;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fmt;
use std::io;

/// What to do with the rest of the script when a statement fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failing statement.
    #[default]
    Halt,
    /// Report the failure on stderr and keep executing.
    KeepGoing,
}

/// A statement failure, tagged with where in the script it happened.
#[derive(Debug)]
pub enum RunError {
    Parse(ParseError),
    Resolution { line: usize, source: ResolutionError },
    Execution { line: usize, source: ExecutionError },
}

impl RunError {
    /// The exit code this failure surfaces as.
    ///
    /// A failing final stage propagates the child's own code; a command that
    /// could not be launched maps to 127 (126 for permission problems); parse
    /// and resolution errors use the reserved code 2.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            RunError::Parse(_) | RunError::Resolution { .. } => 2,
            RunError::Execution { source, .. } => match source {
                ExecutionError::NonZeroExit(code) => *code,
                ExecutionError::SpawnFailed { source, .. }
                    if source.kind() == io::ErrorKind::PermissionDenied =>
                {
                    126
                }
                ExecutionError::SpawnFailed { .. } => 127,
                ExecutionError::WaitFailed { .. } => 2,
            },
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Parse(source) => source.fmt(f),
            RunError::Resolution { line, source } => write!(f, "line {line}: {source}"),
            RunError::Execution { line, source } => write!(f, "line {line}: {source}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Parse(source) => Some(source),
            RunError::Resolution { source, .. } => Some(source),
            RunError::Execution { source, .. } => Some(source),
        }
    }
}

/// Terminal state of a script run.
#[derive(Debug)]
pub enum Outcome {
    /// Every statement was processed.
    Completed(ExitCode),
    /// The run stopped early at a failing statement.
    Halted(RunError),
}

impl Outcome {
    /// The code the runner process should exit with.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Completed(code) => *code,
            Outcome::Halted(error) => error.exit_code(),
        }
    }
}

/// Executes script text against the values a run was invoked with.
///
/// Example
/// ```
/// use runfile::{Environment, Interpreter};
/// let interpreter = Interpreter::new(Environment::default()).dry_run(true);
/// let outcome = interpreter.run_script("echo hello // printed, not executed");
/// assert_eq!(outcome.exit_code(), 0);
/// ```
pub struct Interpreter {
    env: Environment,
    policy: FailurePolicy,
    dry_run: bool,
}

impl Interpreter {
    /// Create an interpreter that halts on the first failure.
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            policy: FailurePolicy::default(),
            dry_run: false,
        }
    }

    /// Choose what happens to the rest of the script when a statement fails.
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Print each resolved command instead of executing it.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Execute a whole script, statement by statement, in source order.
    pub fn run_script(&self, source: &str) -> Outcome {
        let mut failure = None;
        for line in lexer::split_into_lines(source) {
            if let Err(error) = self.run_line(&line) {
                match self.policy {
                    FailurePolicy::Halt => return Outcome::Halted(error),
                    FailurePolicy::KeepGoing => {
                        eprintln!("run: {error}");
                        failure = Some(error.exit_code());
                    }
                }
            }
        }
        Outcome::Completed(failure.unwrap_or(0))
    }

    /// Classify, resolve and execute one statement.
    ///
    /// Errors are detected before anything spawns: a statement either runs
    /// fully resolved or starts none of its stages. A non-zero exit of the
    /// final stage is reported as an error here; the caller decides whether
    /// that stops the run.
    fn run_line(&self, line: &SourceLine) -> Result<ExitCode, RunError> {
        let statement = parser::parse_statement(line).map_err(RunError::Parse)?;
        let cmds: Vec<Cmd> = statement
            .stages
            .iter()
            .map(|stage| self.env.resolve_stage(stage))
            .collect::<Result<_, _>>()
            .map_err(|source| RunError::Resolution {
                line: statement.number,
                source,
            })?;

        if self.dry_run {
            for cmd in &cmds {
                println!("{cmd}");
            }
            return Ok(0);
        }

        debug!(
            "line {}: {}",
            statement.number,
            cmds.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" | ")
        );
        let code = pipeline::run_pipeline(&cmds).map_err(|source| RunError::Execution {
            line: statement.number,
            source,
        })?;
        if code != 0 {
            return Err(RunError::Execution {
                line: statement.number,
                source: ExecutionError::NonZeroExit(code),
            });
        }
        Ok(code)
    }

    /// Interactive prompt: each submitted line runs like a one-line script.
    ///
    /// Failures are reported and the loop continues; Ctrl-C or Ctrl-D ends
    /// the session.
    pub fn repl(&self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;
        loop {
            match rl.readline("run> ") {
                Ok(text) => {
                    rl.add_history_entry(text.as_str())?;
                    let Some(line) = lexer::split_into_lines(&text).into_iter().next() else {
                        continue;
                    };
                    match self.run_line(&line) {
                        Ok(_) => {}
                        Err(RunError::Execution {
                            source: ExecutionError::NonZeroExit(code),
                            ..
                        }) => debug!("command exited with status {code}"),
                        Err(error) => eprintln!("run: {error}"),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }
}
