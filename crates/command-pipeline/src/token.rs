//! Renderable fragments of a shell command line
//!
//! A command line is an ordered list of [`Token`]s. Every token renders
//! itself through [`Display`](std::fmt::Display) using only its own fields;
//! context wrapping (cd, source, sudo, ssh) happens later in the session.

use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, PathKind, Result};

/// One fragment of a command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A plain command with its options and arguments
    Command(PlainCommand),
    /// `|`
    Pipe,
    /// `&&`
    And,
    /// `||`
    Or,
    /// An output redirection such as `1> out.log`
    Redirect(Redirect),
}

impl Token {
    /// Returns true for tokens that join commands rather than being one
    pub fn is_operator(&self) -> bool {
        !matches!(self, Token::Command(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Command(cmd) => cmd.fmt(f),
            Token::Pipe => f.write_str("|"),
            Token::And => f.write_str("&&"),
            Token::Or => f.write_str("||"),
            Token::Redirect(redirect) => redirect.fmt(f),
        }
    }
}

impl From<PlainCommand> for Token {
    fn from(cmd: PlainCommand) -> Self {
        Token::Command(cmd)
    }
}

impl From<Redirect> for Token {
    fn from(redirect: Redirect) -> Self {
        Token::Redirect(redirect)
    }
}

/// A command name followed by `--key=value` options and positional arguments
///
/// Arguments are rendered verbatim. Quote them with [`shell_quote`] when they
/// may contain whitespace or shell metacharacters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainCommand {
    name: String,
    args: Vec<String>,
    options: IndexMap<String, String>,
}

impl PlainCommand {
    /// Create a command, turning every `__` in the name into `-`
    ///
    /// `PlainCommand::new("apt__get")` names `apt-get`.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: normalize_name(name.as_ref()),
            args: Vec::new(),
            options: IndexMap::new(),
        }
    }

    /// Add a positional argument
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Add multiple positional arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    /// Add an option; single character keys render as `-k=v`, longer ones as `--key=v`
    pub fn option(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.options.insert(key.into(), value.to_string());
        self
    }

    /// Run this one command under `sudo`
    pub fn sudo(mut self) -> Self {
        self.name = format!("sudo {}", self.name);
        self
    }

    /// Resolve the executable inside `dir` instead of through `PATH`
    pub fn located_in(mut self, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(Error::path_not_found(PathKind::Directory, dir));
        }
        let executable = dir.join(&self.name);
        if !executable.exists() {
            return Err(Error::path_not_found(PathKind::Executable, executable));
        }
        self.name = executable.to_string_lossy().into_owned();
        Ok(self)
    }

    /// The (normalized) command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The positional arguments
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// The options in insertion order
    pub fn get_options(&self) -> &IndexMap<String, String> {
        &self.options
    }
}

impl fmt::Display for PlainCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let options = self
            .options
            .iter()
            .map(|(key, value)| {
                let dashes = if key.chars().count() == 1 { "-" } else { "--" };
                format!("{dashes}{key}={value}")
            })
            .collect::<Vec<_>>()
            .join(" ");
        let args = self.args.join(" ");

        f.write_str(&self.name)?;
        for segment in [options.trim(), args.trim()] {
            if !segment.is_empty() {
                write!(f, " {segment}")?;
            }
        }
        Ok(())
    }
}

/// Which stream(s) a redirect captures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStream {
    /// File descriptor 1
    Stdout,
    /// File descriptor 2
    Stderr,
    /// Both, rendered as `&`
    Both,
}

impl RedirectStream {
    /// Pick the stream from a pair of flags; neither is a configuration error
    pub fn from_flags(stdout: bool, stderr: bool) -> Result<Self> {
        match (stdout, stderr) {
            (true, true) => Ok(RedirectStream::Both),
            (true, false) => Ok(RedirectStream::Stdout),
            (false, true) => Ok(RedirectStream::Stderr),
            (false, false) => Err(Error::config(
                "redirect needs stdout, stderr or both; neither was selected",
            )),
        }
    }

    fn descriptor(self) -> &'static str {
        match self {
            RedirectStream::Stdout => "1",
            RedirectStream::Stderr => "2",
            RedirectStream::Both => "&",
        }
    }
}

/// Redirection of stdout and/or stderr into a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    target: PathBuf,
    append: bool,
    stream: RedirectStream,
}

impl Redirect {
    /// Create a redirect to `target`
    pub fn new(target: impl Into<PathBuf>, append: bool, stream: RedirectStream) -> Self {
        Self {
            target: target.into(),
            append,
            stream,
        }
    }

    /// Create a redirect from stream flags, rejecting `stdout = stderr = false`
    pub fn from_flags(
        target: impl Into<PathBuf>,
        append: bool,
        stdout: bool,
        stderr: bool,
    ) -> Result<Self> {
        Ok(Self::new(target, append, RedirectStream::from_flags(stdout, stderr)?))
    }

    /// The file written to
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Whether the file is appended to instead of truncated
    pub fn append(&self) -> bool {
        self.append
    }

    /// The redirected stream(s)
    pub fn stream(&self) -> RedirectStream {
        self.stream
    }
}

impl fmt::Display for Redirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrows = if self.append { ">>" } else { ">" };
        write!(
            f,
            "{}{} {}",
            self.stream.descriptor(),
            arrows,
            self.target.display()
        )
    }
}

/// Turn `__` into `-` so names like `apt-get` can be spelled as identifiers
pub fn normalize_name(name: &str) -> String {
    name.replace("__", "-")
}

/// Escape a string for safe inclusion in a shell command
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s.contains(|c: char| c.is_whitespace() || "\"'\\$`!*?<>|&;()[]{}#~".contains(c)) {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command_rendering() {
        let cmd = PlainCommand::new("ls");
        assert_eq!(cmd.to_string(), "ls");

        let cmd = PlainCommand::new("ls").arg("-lah").arg("/tmp");
        assert_eq!(cmd.to_string(), "ls -lah /tmp");
    }

    #[test]
    fn test_options_render_before_args_in_insertion_order() {
        let cmd = PlainCommand::new("tar")
            .arg("backup.tar")
            .option("file", "out.tar")
            .option("v", 1)
            .option("directory", "/srv");
        assert_eq!(
            cmd.to_string(),
            "tar --file=out.tar -v=1 --directory=/srv backup.tar"
        );
    }

    #[test]
    fn test_name_normalization() {
        assert_eq!(PlainCommand::new("apt__get").name(), "apt-get");
        assert_eq!(PlainCommand::new("a__b__c").name(), "a-b-c");
        assert_eq!(PlainCommand::new("yum").name(), "yum");
    }

    #[test]
    fn test_sudo_prefix() {
        let cmd = PlainCommand::new("yum").args(["install", "-y", "tree"]).sudo();
        assert_eq!(cmd.to_string(), "sudo yum install -y tree");
    }

    #[test]
    fn test_located_in() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tool"), "#!/bin/sh\n").unwrap();

        let cmd = PlainCommand::new("tool").located_in(dir.path()).unwrap();
        assert_eq!(cmd.name(), dir.path().join("tool").to_string_lossy());

        let err = PlainCommand::new("missing").located_in(dir.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::PathNotFound { kind: PathKind::Executable, .. }
        ));

        let err = PlainCommand::new("tool")
            .located_in(dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::PathNotFound { kind: PathKind::Directory, .. }
        ));
    }

    #[test]
    fn test_operator_tokens() {
        assert_eq!(Token::Pipe.to_string(), "|");
        assert_eq!(Token::And.to_string(), "&&");
        assert_eq!(Token::Or.to_string(), "||");
        assert!(Token::Pipe.is_operator());
        assert!(!Token::from(PlainCommand::new("ls")).is_operator());
    }

    #[test]
    fn test_redirect_descriptors() {
        let r = Redirect::from_flags("/tmp/out.log", false, true, false).unwrap();
        assert_eq!(r.to_string(), "1> /tmp/out.log");

        let r = Redirect::from_flags("/tmp/out.log", true, true, false).unwrap();
        assert_eq!(r.to_string(), "1>> /tmp/out.log");

        let r = Redirect::from_flags("/tmp/err.log", false, false, true).unwrap();
        assert_eq!(r.to_string(), "2> /tmp/err.log");

        let r = Redirect::from_flags("/tmp/all.log", true, true, true).unwrap();
        assert_eq!(r.to_string(), "&>> /tmp/all.log");
        assert!(Token::from(r).is_operator());
    }

    #[test]
    fn test_redirect_without_stream_is_rejected() {
        let err = Redirect::from_flags("/tmp/out.log", false, false, false).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("simple"), "simple");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("with'quote"), "'with'\"'\"'quote'");
        assert_eq!(shell_quote("$variable"), "'$variable'");
        assert_eq!(shell_quote("path/to/file"), "path/to/file");
        assert_eq!(shell_quote(""), "''");
    }
}
