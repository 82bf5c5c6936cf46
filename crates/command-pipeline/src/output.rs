//! Captured outcome of running a command line

use tracing::{error, info, warn};

use crate::shell::{ExitStatus, ShellOutput};

const FRAME_WIDTH: usize = 100;

/// What a run produced
///
/// `stdout` and `stderr` are `None` when the stream was empty. `traceback` is
/// only set when the shell itself could not be invoked; a command that ran
/// and failed leaves it `None` and reports through `stderr` and `status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured standard output
    pub stdout: Option<String>,
    /// Captured standard error
    pub stderr: Option<String>,
    /// Diagnostic lines for an invocation failure
    pub traceback: Option<Vec<String>>,
    /// Exit status, when the shell ran to completion
    pub status: Option<ExitStatus>,
}

impl CommandOutput {
    /// Build from captured streams, dropping empty ones
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: non_empty(stdout.into()),
            stderr: non_empty(stderr.into()),
            traceback: None,
            status: None,
        }
    }

    /// Attach a traceback
    pub fn with_traceback(mut self, traceback: Vec<String>) -> Self {
        self.traceback = Some(traceback);
        self
    }

    /// Lines of standard output, without trailing newlines
    pub fn stdout_lines(&self) -> Vec<&str> {
        lines(self.stdout.as_deref())
    }

    /// Lines of standard error, without trailing newlines
    pub fn stderr_lines(&self) -> Vec<&str> {
        lines(self.stderr.as_deref())
    }

    /// True when the shell completed with exit code 0
    pub fn is_success(&self) -> bool {
        self.traceback.is_none() && self.status.is_some_and(|s| s.success())
    }

    /// Log standard output as a framed block
    pub fn print_stdout(&self) {
        if let Some(stdout) = &self.stdout {
            print_section("STDOUT", stdout.lines(), |line| info!("{}", line));
        }
    }

    /// Log standard error as a framed block
    pub fn print_stderr(&self) {
        if let Some(stderr) = &self.stderr {
            print_section("STDERR", stderr.lines(), |line| warn!("{}", line));
        }
    }

    /// Log the traceback as a framed block
    pub fn print_traceback(&self) {
        if let Some(traceback) = &self.traceback {
            print_section(
                "TRACEBACK",
                traceback.iter().map(String::as_str),
                |line| error!("{}", line),
            );
        }
    }
}

impl From<ShellOutput> for CommandOutput {
    fn from(output: ShellOutput) -> Self {
        let mut result = CommandOutput::new(output.stdout, output.stderr);
        result.status = Some(output.status);
        result
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

fn lines(s: Option<&str>) -> Vec<&str> {
    s.map(|s| s.lines().collect()).unwrap_or_default()
}

fn print_section<'a>(
    title: &str,
    lines: impl Iterator<Item = &'a str>,
    emit: impl Fn(&str),
) {
    let header = format!("--{{ {} }}", title);
    emit(&format!("{:-<width$}", header, width = FRAME_WIDTH));
    for line in lines {
        emit(&format!("| {}", line));
    }
    emit(&"-".repeat(FRAME_WIDTH));
}
