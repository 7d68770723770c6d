//! Spawning a statement's commands as a connected OS process pipeline.

use log::debug;
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Conventional process exit code: 0 for success, non-zero for failure.
pub type ExitCode = i32;

/// A fully resolved command, ready for spawning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    pub name: String,
    pub args: Vec<String>,
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runtime problems launching or completing a pipeline.
#[derive(Debug)]
pub enum ExecutionError {
    /// A stage could not be launched at all.
    SpawnFailed {
        stage: usize,
        command: String,
        source: io::Error,
    },
    /// A spawned stage could not be waited on.
    WaitFailed {
        stage: usize,
        command: String,
        source: io::Error,
    },
    /// The final stage of a statement exited with a non-zero status.
    NonZeroExit(ExitCode),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::SpawnFailed {
                command, source, ..
            } => write!(f, "{command}: {source}"),
            ExecutionError::WaitFailed {
                command, source, ..
            } => write!(f, "waiting for {command}: {source}"),
            ExecutionError::NonZeroExit(code) => {
                write!(f, "command exited with status {code}")
            }
        }
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutionError::SpawnFailed { source, .. }
            | ExecutionError::WaitFailed { source, .. } => Some(source),
            ExecutionError::NonZeroExit(_) => None,
        }
    }
}

/// Execute the commands of one statement as a single pipeline.
///
/// The first stage inherits the runner's stdin, consecutive stages are
/// connected stdout-to-stdin by OS pipes, the final stage inherits the
/// runner's stdout; stderr is inherited everywhere. Every stage is waited on
/// before returning, and the statement's status is the final stage's.
pub fn run_pipeline(cmds: &[Cmd]) -> Result<ExitCode, ExecutionError> {
    let search_paths = std::env::var_os("PATH").unwrap_or_default();

    // Look up every command before spawning anything, so a misspelled stage
    // anywhere in the pipeline never leaves part of it running.
    let mut executables = Vec::with_capacity(cmds.len());
    for (stage, cmd) in cmds.iter().enumerate() {
        match find_command_path(&search_paths, Path::new(&cmd.name)) {
            Some(path) => executables.push(path),
            None => {
                return Err(ExecutionError::SpawnFailed {
                    stage,
                    command: cmd.name.clone(),
                    source: io::Error::new(io::ErrorKind::NotFound, "command not found"),
                });
            }
        }
    }

    let mut children: Vec<Child> = Vec::with_capacity(cmds.len());
    for (stage, (cmd, path)) in cmds.iter().zip(&executables).enumerate() {
        let stdin = match children.last_mut().and_then(|prev| prev.stdout.take()) {
            Some(upstream) => Stdio::from(upstream),
            None => Stdio::inherit(),
        };
        let stdout = if stage + 1 < cmds.len() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        };

        match Command::new(path).args(&cmd.args).stdin(stdin).stdout(stdout).spawn() {
            Ok(child) => {
                debug!("spawned stage {stage} `{cmd}` (pid {})", child.id());
                children.push(child);
            }
            Err(source) => {
                reap(&mut children);
                return Err(ExecutionError::SpawnFailed {
                    stage,
                    command: cmd.name.clone(),
                    source,
                });
            }
        }
    }

    let mut last = 0;
    for (stage, mut child) in children.into_iter().enumerate() {
        let status = child.wait().map_err(|source| ExecutionError::WaitFailed {
            stage,
            command: cmds[stage].name.clone(),
            source,
        })?;
        last = status_code(status);
        debug!("stage {stage} exited with {last}");
    }
    Ok(last)
}

/// Terminate and reap children spawned so far.
fn reap(children: &mut Vec<Child>) {
    for child in children {
        child.kill().ok();
        child.wait().ok();
    }
}

/// Resolve a command name the way a shell would: absolute and
/// multi-component paths are used as-is when they exist, a bare name is
/// searched for in each directory of `search_paths` in order.
pub fn find_command_path(search_paths: &OsStr, path: &Path) -> Option<PathBuf> {
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_absolute() || path.components().count() > 1 {
        return path.exists().then(|| path.to_path_buf());
    }
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.exists())
}

#[cfg(unix)]
fn status_code(status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        // Killed by a signal: report 128 + signal, the shell convention.
        None => match status.signal() {
            Some(signal) => 128 + signal,
            None => -1,
        },
    }
}

#[cfg(not(unix))]
fn status_code(status: ExitStatus) -> ExitCode {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(name: &str, args: &[&str]) -> Cmd {
        Cmd {
            name: name.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn display_joins_name_and_args() {
        assert_eq!(cmd("rg", &["match", "src"]).to_string(), "rg match src");
        assert_eq!(cmd("ls", &[]).to_string(), "ls");
    }

    #[test]
    #[cfg(unix)]
    fn finds_absolute_path() {
        let found = find_command_path(OsStr::new("/bin"), Path::new("/bin/sh"));
        assert_eq!(found, Some(PathBuf::from("/bin/sh")));
    }

    #[test]
    #[cfg(unix)]
    fn searches_bare_name_in_path_order() {
        let found = find_command_path(OsStr::new("/nonexistent:/bin:/usr/bin"), Path::new("sh"))
            .expect("sh should be found via PATH");
        assert!(found.ends_with("sh"));
    }

    #[test]
    fn missing_command_is_none() {
        let found = find_command_path(OsStr::new("/bin"), Path::new("no-such-cmd-xyz"));
        assert_eq!(found, None);
    }

    #[test]
    fn empty_name_is_none() {
        assert_eq!(find_command_path(OsStr::new("/bin"), Path::new("")), None);
    }

    #[test]
    #[cfg(unix)]
    fn single_stage_reports_its_exit_code() {
        assert_eq!(run_pipeline(&[cmd("sh", &["-c", "exit 0"])]).unwrap(), 0);
        assert_eq!(run_pipeline(&[cmd("sh", &["-c", "exit 3"])]).unwrap(), 3);
    }

    #[test]
    #[cfg(unix)]
    fn pipeline_status_is_the_final_stage() {
        let ok_then_fail = [cmd("true", &[]), cmd("sh", &["-c", "cat >/dev/null; exit 7"])];
        assert_eq!(run_pipeline(&ok_then_fail).unwrap(), 7);

        let fail_then_ok = [cmd("false", &[]), cmd("sh", &["-c", "cat >/dev/null"])];
        assert_eq!(run_pipeline(&fail_then_ok).unwrap(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn bytes_flow_between_stages() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let stages = [
            cmd("echo", &["hello"]),
            cmd("sh", &["-c", &format!("cat > {}", out.display())]),
        ];
        assert_eq!(run_pipeline(&stages).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello\n");
    }

    #[test]
    #[cfg(unix)]
    fn missing_command_fails_with_stage_index() {
        let stages = [cmd("echo", &["a"]), cmd("no-such-cmd-xyz", &[])];
        match run_pipeline(&stages).unwrap_err() {
            ExecutionError::SpawnFailed { stage, command, source } => {
                assert_eq!(stage, 1);
                assert_eq!(command, "no-such-cmd-xyz");
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected SpawnFailed, got {other:?}"),
        }
    }
}
