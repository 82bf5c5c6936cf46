//! Fluent construction and execution of shell command lines
//!
//! This crate chains commands, pipes, boolean operators and redirects into a
//! single shell command line, wraps it in the active [`Context`] (working
//! directory, sourced file, sudo or user switch, SSH to a remote host) and
//! runs it through a [`Shell`], capturing stdout and stderr.
//!
//! ```no_run
//! use command_pipeline::{Context, Session};
//!
//! # fn example() -> command_pipeline::Result<()> {
//! let mut s = Session::new()?;
//! s.with_context(Context::new().with_sudo(true).with_hostname("myserver.com"), |s| {
//!     // ssh <user>@myserver.com 'sudo yum install -y tree;'
//!     s.command("yum", ["install", "-y", "tree"]).execute()?;
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod session;
pub mod settings;
pub mod shell;
pub mod token;

pub use config::{ConfigSchema, ParamSpec, SshConfig, SshSchema, ValidatedConfig};
pub use context::{Context, ContextStack, invoking_user};
pub use error::{Error, PathKind, Result};
pub use output::CommandOutput;
pub use session::{RunOptions, ScopedSession, Session};
pub use settings::ContextSettings;
pub use shell::{ExitStatus, LocalShell, Shell, ShellOutput};
pub use token::{PlainCommand, Redirect, RedirectStream, Token, shell_quote};
