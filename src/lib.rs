//! A tiny runner for `.run` scripts.
//!
//! A run file is a list of command lines executed in source order. A line may
//! chain commands into an OS-level pipeline with `|`, reference values given
//! on the runner's own command line as `$name` or `$1`, and carry `//`
//! comments. This library holds the whole engine — lexing, token
//! classification, value resolution and process plumbing; the `run` binary is
//! a thin wrapper that reads the file, builds the [`Environment`] and reports
//! the outcome.
//!
//! The main entry point is [`Interpreter`], which executes script text
//! against an [`Environment`] and yields an [`Outcome`].

pub mod env;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod pipeline;

pub use env::Environment;
pub use interpreter::{FailurePolicy, Interpreter, Outcome, RunError};
