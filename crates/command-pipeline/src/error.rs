//! Error types for building and running command lines

use std::path::PathBuf;
use thiserror::Error;

/// What a missing path was supposed to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// A file to `source` before the command runs
    SourceFile,
    /// A directory a command is looked up in
    Directory,
    /// An executable looked up inside a directory
    Executable,
}

impl std::fmt::Display for PathKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathKind::SourceFile => f.write_str("source file"),
            PathKind::Directory => f.write_str("directory"),
            PathKind::Executable => f.write_str("executable"),
        }
    }
}

/// Unified error type for command composition and execution
#[derive(Error, Debug)]
pub enum Error {
    /// A structured parameter set was missing a required key, carried an
    /// unknown key, or asked for an impossible combination
    #[error("invalid configuration: {reason}")]
    Config {
        /// Why the configuration was rejected
        reason: String,
    },

    /// A path referenced while building does not exist locally
    #[error("{kind} does not exist: {}", .path.display())]
    PathNotFound {
        /// The role the path was meant to play
        kind: PathKind,
        /// The path that was checked
        path: PathBuf,
    },

    /// The shell itself could not be started or talked to
    #[error("unable to run '{command}': {reason}")]
    InvocationFailed {
        /// The rendered command line
        command: String,
        /// The underlying failure
        reason: String,
    },

    /// A scoped session was entered with no context on the stack
    #[error("entered a scoped session without a context; build one with Session::load or push_context first")]
    InvalidContext,

    /// The invoking OS user could not be determined
    #[error("could not determine the invoking user")]
    UnknownUser,

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML settings could not be parsed
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Nix error (user lookup)
    #[error(transparent)]
    Nix(#[from] nix::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a missing path error
    pub fn path_not_found(kind: PathKind, path: impl Into<PathBuf>) -> Self {
        Self::PathNotFound {
            kind,
            path: path.into(),
        }
    }

    /// Create an invocation failure for the given command line
    pub fn invocation_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvocationFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors raised while building, before anything runs
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config { .. } | Error::PathNotFound { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
