//! Command-line front-end for command-pipeline
//!
//! Builds a command line from its arguments, wraps it in an optional YAML
//! context and either prints or runs it.
//!
//! ```text
//! cmdpipe --context deploy.yaml -- cat /var/log/syslog '|' grep sshd
//! ```

use anyhow::{Context as _, Result};
use clap::Parser;
use command_pipeline::{Context, ContextSettings, RunOptions, Session};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "cmdpipe")]
#[command(about = "Compose a shell command line and run it locally, under sudo or over SSH")]
#[command(version)]
struct Cli {
    /// YAML file describing the execution context
    #[arg(long, value_name = "FILE")]
    context: Option<PathBuf>,

    /// Print the rendered command line instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Do not log the command line before running it
    #[arg(short, long)]
    quiet: bool,

    /// Return the diagnostic instead of failing when the shell cannot start
    #[arg(long)]
    no_halt: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Commands, separated by literal `|`, `&&` or `||` words
    #[arg(trailing_var_arg = true, required = true)]
    words: Vec<String>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let context = match &cli.context {
        Some(path) => ContextSettings::from_file(path)
            .and_then(ContextSettings::into_context)
            .with_context(|| format!("Failed to load context from {}", path.display()))?,
        None => Context::new(),
    };

    let mut session = Session::load(context).context("Failed to start session")?;
    append_words(&mut session, &cli.words);

    if cli.dry_run {
        println!("{}", session.render());
        return Ok(ExitCode::SUCCESS);
    }

    let mut options = RunOptions::default();
    if cli.quiet {
        options = options.quiet();
    }
    if cli.no_halt {
        options = options.no_halt();
    }

    let output = session.run(options).context("Failed to run command line")?;
    if let Some(stdout) = &output.stdout {
        print!("{}", stdout);
    }
    if let Some(stderr) = &output.stderr {
        eprint!("{}", stderr);
    }

    let code = output
        .status
        .and_then(|status| status.code)
        .unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

/// Split `words` on operator words and append the pieces to the session
fn append_words(session: &mut Session, words: &[String]) {
    let mut current: Vec<&str> = Vec::new();

    for word in words {
        match word.as_str() {
            "|" => {
                flush(session, &mut current);
                session.pipe();
            }
            "&&" => {
                flush(session, &mut current);
                session.and();
            }
            "||" => {
                flush(session, &mut current);
                session.or();
            }
            other => current.push(other),
        }
    }
    flush(session, &mut current);
}

fn flush(session: &mut Session, current: &mut Vec<&str>) {
    if let Some((name, args)) = current.split_first() {
        session.command(name, args.iter());
    }
    current.clear();
}
