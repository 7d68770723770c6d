//! Named and positional values supplied on the runner's command line, and
//! their substitution into statements.

use crate::parser::{Stage, Token};
use crate::pipeline::Cmd;
use anyhow::bail;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// The values a run was invoked with.
///
/// Scripts reach these as `$name` and `$1`-style references. Built once per
/// run from the arguments following the script path and never mutated while
/// statements execute.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Environment {
    pub named: HashMap<String, String>,
    pub positional: Vec<String>,
}

/// A value the script requires but the invocation did not supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    UndefinedNamed(String),
    UndefinedPositional(usize),
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::UndefinedNamed(name) => {
                write!(f, "no value specified for named argument: {name}")
            }
            ResolutionError::UndefinedPositional(index) => {
                write!(f, "no positional argument given for ${index}")
            }
        }
    }
}

impl std::error::Error for ResolutionError {}

impl Environment {
    /// Build an environment from command-line arguments.
    ///
    /// An argument like `-name` (or `--name`) pairs with the following
    /// argument as a named value and must have one; everything else lands in
    /// the positional sequence in order.
    pub fn from_args<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut env = Environment::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            if let Some(name) = arg.strip_prefix('-') {
                let name = name.trim_start_matches('-');
                match args.next() {
                    Some(value) if !value.as_ref().starts_with('-') => {
                        env.named.insert(name.to_owned(), value.as_ref().to_owned());
                    }
                    _ => bail!("{arg} is missing a value"),
                }
            } else {
                env.positional.push(arg.to_owned());
            }
        }

        debug!(
            "invocation context: {} named, {} positional",
            env.named.len(),
            env.positional.len()
        );
        Ok(env)
    }

    /// Substitute a single token with its string value.
    pub fn resolve(&self, token: &Token) -> Result<String, ResolutionError> {
        match token {
            Token::Literal(text) => Ok(text.clone()),
            Token::Named(name) => self
                .named
                .get(name)
                .cloned()
                .ok_or_else(|| ResolutionError::UndefinedNamed(name.clone())),
            Token::Positional(index) => self
                .positional
                .get(index - 1)
                .cloned()
                .ok_or(ResolutionError::UndefinedPositional(*index)),
        }
    }

    /// Substitute every token of a stage, left to right, into a command
    /// ready for spawning. The first unresolved variable is the one reported.
    pub fn resolve_stage(&self, stage: &Stage) -> Result<Cmd, ResolutionError> {
        let mut words = stage
            .tokens
            .iter()
            .map(|token| self.resolve(token))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter();
        Ok(Cmd {
            name: words.next().unwrap_or_default(),
            args: words.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(named: &[(&str, &str)], positional: &[&str]) -> Environment {
        Environment {
            named: named
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            positional: positional.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_from_args_pairs_flags_and_collects_positionals() {
        let got = Environment::from_args([
            "-Message",
            "feat: Run files without specifying the extension",
            "-Version",
            "0.3.0",
            "foo",
            "bar",
            "baz",
        ])
        .unwrap();
        let want = env(
            &[
                ("Message", "feat: Run files without specifying the extension"),
                ("Version", "0.3.0"),
            ],
            &["foo", "bar", "baz"],
        );
        assert_eq!(got, want);
    }

    #[test]
    fn flag_without_value_is_rejected() {
        let err = Environment::from_args(["-Version"]).unwrap_err();
        assert!(err.to_string().contains("missing a value"));
    }

    #[test]
    fn flag_followed_by_flag_is_rejected() {
        let err = Environment::from_args(["-Version", "-Message", "hi"]).unwrap_err();
        assert!(err.to_string().contains("-Version"));
    }

    #[test]
    fn literals_resolve_to_themselves() {
        let e = env(&[], &[]);
        assert_eq!(e.resolve(&Token::Literal("echo".into())).unwrap(), "echo");
    }

    #[test]
    fn named_lookup_and_miss() {
        let e = env(&[("Version", "0.3.0")], &[]);
        assert_eq!(e.resolve(&Token::Named("Version".into())).unwrap(), "0.3.0");
        assert_eq!(
            e.resolve(&Token::Named("Message".into())).unwrap_err(),
            ResolutionError::UndefinedNamed("Message".into())
        );
    }

    #[test]
    fn positional_lookup_is_one_based() {
        let e = env(&[], &["first", "second"]);
        assert_eq!(e.resolve(&Token::Positional(1)).unwrap(), "first");
        assert_eq!(e.resolve(&Token::Positional(2)).unwrap(), "second");
        assert_eq!(
            e.resolve(&Token::Positional(3)).unwrap_err(),
            ResolutionError::UndefinedPositional(3)
        );
    }

    #[test]
    fn resolve_stage_builds_a_command() {
        let e = env(&[("Version", "0.3.0")], &["hello"]);
        let stage = Stage {
            tokens: vec![
                Token::Literal("echo".into()),
                Token::Named("Version".into()),
                Token::Positional(1),
            ],
        };
        let cmd = e.resolve_stage(&stage).unwrap();
        assert_eq!(cmd.name, "echo");
        assert_eq!(cmd.args, vec!["0.3.0".to_string(), "hello".to_string()]);
    }

    #[test]
    fn resolve_stage_reports_the_first_failure() {
        let e = env(&[], &[]);
        let stage = Stage {
            tokens: vec![
                Token::Literal("echo".into()),
                Token::Named("first".into()),
                Token::Named("second".into()),
            ],
        };
        assert_eq!(
            e.resolve_stage(&stage).unwrap_err(),
            ResolutionError::UndefinedNamed("first".into())
        );
    }
}
