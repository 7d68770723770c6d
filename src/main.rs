//! Command-line entry point: parses the runner's own flags, reads the
//! script file, builds the invocation values and hands both to the
//! interpreter.

use anyhow::Context;
use argh::FromArgs;
use log::LevelFilter;
use runfile::{Environment, FailurePolicy, Interpreter, Outcome};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use std::fs;
use std::path::Path;
use std::process;

#[derive(FromArgs, Debug)]
/// Run commands from a script file in sequence, with pipe support.
struct RunArgs {
    /// print each resolved command instead of executing it
    #[argh(switch)]
    dry_run: bool,

    /// keep executing after a failing statement instead of stopping
    #[argh(switch, short = 'k')]
    keep_going: bool,

    /// enable debug logging on standard error
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// script to execute followed by the values handed to it; ".run" is
    /// tried when the name alone does not exist and an interactive prompt
    /// opens when the script is omitted. Trailing "-name value" pairs
    /// become named values, everything else is positional.
    #[argh(positional, greedy)]
    script_and_args: Vec<String>,
}

fn main() {
    let args: RunArgs = argh::from_env();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto).ok();

    match run(args) {
        Ok(code) => process::exit(code),
        Err(error) => {
            eprintln!("run: {error:#}");
            process::exit(2);
        }
    }
}

fn run(args: RunArgs) -> anyhow::Result<i32> {
    let (script, script_args) = match args.script_and_args.split_first() {
        Some((first, rest)) => (Some(first.clone()), rest),
        None => (None, &[][..]),
    };

    let env = Environment::from_args(script_args)?;
    let interpreter = Interpreter::new(env)
        .policy(if args.keep_going {
            FailurePolicy::KeepGoing
        } else {
            FailurePolicy::Halt
        })
        .dry_run(args.dry_run);

    let Some(script) = script else {
        interpreter.repl()?;
        return Ok(0);
    };

    let text = load_script(&script)?;
    let outcome = interpreter.run_script(&text);
    if let Outcome::Halted(error) = &outcome {
        eprintln!("run: {error}");
    }
    Ok(outcome.exit_code())
}

/// Read a script file, trying the ".run" extension when the name alone
/// names no file.
fn load_script(name: &str) -> anyhow::Result<String> {
    let path = Path::new(name);
    if path.exists() || name.ends_with(".run") {
        return fs::read_to_string(path).with_context(|| format!("opening {name}"));
    }
    let with_ext = format!("{name}.run");
    fs::read_to_string(&with_ext).with_context(|| format!("opening {with_ext}"))
}
