//! Word-level classification of a script line into pipeline stages.

use crate::lexer::SourceLine;
use std::fmt;

/// A classified word of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Plain text, used verbatim.
    Literal(String),
    /// `$name`: resolved from the named values of the invocation.
    Named(String),
    /// `$N`: resolved from the positional values of the invocation, 1-based.
    Positional(usize),
}

/// One command of a pipeline: the first token is the command name, the rest
/// are its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub tokens: Vec<Token>,
}

/// One executable line: a pipeline of one or more stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based source line this statement came from.
    pub number: usize,
    pub stages: Vec<Stage>,
}

/// Structural problems in a statement's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `$` with no usable name or index after it.
    MalformedVariable { line: usize, column: usize },
    /// Two adjacent pipes, or a pipe at the start or end of a line.
    EmptyPipelineStage { line: usize, column: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedVariable { line, column } => {
                write!(f, "line {line}, column {column}: malformed variable reference")
            }
            ParseError::EmptyPipelineStage { line, column } => {
                write!(f, "line {line}, column {column}: empty pipeline stage")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Classify a comment-stripped line into its pipeline stages.
pub fn parse_statement(line: &SourceLine) -> Result<Statement, ParseError> {
    let mut stages = Vec::new();
    let mut current = Vec::new();
    let mut pipe_column = 0;

    for (column, word) in words_with_columns(&line.text) {
        if word == "|" {
            if current.is_empty() {
                return Err(ParseError::EmptyPipelineStage {
                    line: line.number,
                    column,
                });
            }
            stages.push(Stage {
                tokens: std::mem::take(&mut current),
            });
            pipe_column = column;
        } else {
            current.push(classify(word, line.number, column)?);
        }
    }

    if current.is_empty() {
        // The lexer never hands over a blank line, so the only way to get
        // here is a trailing pipe (or a line of nothing but pipes).
        return Err(ParseError::EmptyPipelineStage {
            line: line.number,
            column: pipe_column,
        });
    }
    stages.push(Stage { tokens: current });

    Ok(Statement {
        number: line.number,
        stages,
    })
}

fn classify(word: &str, line: usize, column: usize) -> Result<Token, ParseError> {
    let Some(rest) = word.strip_prefix('$') else {
        return Ok(Token::Literal(word.to_owned()));
    };
    if rest.is_empty() {
        return Err(ParseError::MalformedVariable { line, column });
    }
    if rest.chars().all(|c| c.is_ascii_digit()) {
        // Positional indices start at 1, so `$0` is as malformed as `$`.
        return match rest.parse::<usize>() {
            Ok(index) if index >= 1 => Ok(Token::Positional(index)),
            _ => Err(ParseError::MalformedVariable { line, column }),
        };
    }
    Ok(Token::Named(rest.to_owned()))
}

/// Whitespace-delimited words paired with their 1-based character column.
fn words_with_columns(text: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut start: Option<(usize, usize)> = None;
    let mut column = 0;

    for (offset, ch) in text.char_indices() {
        column += 1;
        if ch.is_whitespace() {
            if let Some((col, from)) = start.take() {
                words.push((col, &text[from..offset]));
            }
        } else if start.is_none() {
            start = Some((column, offset));
        }
    }
    if let Some((col, from)) = start {
        words.push((col, &text[from..]));
    }
    words
}
