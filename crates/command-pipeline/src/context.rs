//! Execution context wrapped around a rendered command line

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

use crate::config::SshConfig;
use crate::error::{Error, PathKind, Result};

/// Where, as whom and with what environment a command line runs
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Directory to `cd` into first
    pub cwd: Option<PathBuf>,
    /// Whether to elevate privileges
    pub sudo: bool,
    /// Effective user; the invoking user when unset
    pub user: Option<String>,
    /// Remote host; when set the line runs over `ssh`
    pub hostname: Option<String>,
    /// Options for the `ssh` client
    pub ssh_config: Option<SshConfig>,
    /// Replacement for the inherited process environment
    pub env: Option<IndexMap<String, String>>,
    /// File to `source` before the command runs
    pub src: Option<PathBuf>,
    /// Whether rendered command lines are logged before running
    pub logging: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            sudo: false,
            user: None,
            hostname: None,
            ssh_config: None,
            env: None,
            src: None,
            logging: true,
        }
    }
}

impl Context {
    /// Create an empty context (local, unprivileged, logging on)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Enable or disable privilege elevation
    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Set the effective user
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Run on a remote host over `ssh`
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Set the `ssh` client options
    pub fn with_ssh_config(mut self, config: SshConfig) -> Self {
        self.ssh_config = Some(config);
        self
    }

    /// Add one variable to the replacement environment
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace the whole environment
    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Set a file to `source` before the command runs
    pub fn with_src(mut self, src: impl Into<PathBuf>) -> Self {
        self.src = Some(src.into());
        self
    }

    /// Enable or disable command logging
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    /// The effective user, falling back to `invoking_user`
    pub fn effective_user<'a>(&'a self, invoking_user: &'a str) -> &'a str {
        self.user.as_deref().unwrap_or(invoking_user)
    }

    /// Check that paths the context refers to exist locally
    ///
    /// The working directory is only checked for local contexts; on a remote
    /// host it lives on the other side of `ssh`.
    pub fn validate(&self) -> Result<()> {
        if let Some(src) = &self.src {
            ensure_exists(src, PathKind::SourceFile)?;
        }
        if let (Some(cwd), None) = (&self.cwd, &self.hostname) {
            ensure_exists(cwd, PathKind::Directory)?;
        }
        Ok(())
    }
}

fn ensure_exists(path: &Path, kind: PathKind) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::path_not_found(kind, path))
    }
}

/// Stack of contexts; the top one is active
#[derive(Debug, Clone)]
pub struct ContextStack {
    stack: Vec<Context>,
    empty: Context,
}

impl Default for ContextStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            // a session without any context runs silently
            empty: Context::new().with_logging(false),
        }
    }

    /// Push a context, making it active
    pub fn push(&mut self, context: Context) {
        self.stack.push(context);
    }

    /// Pop the active context, restoring the previous one
    pub fn pop(&mut self) -> Option<Context> {
        self.stack.pop()
    }

    /// The active context, or an empty, non-logging one if nothing was pushed
    pub fn current(&self) -> &Context {
        self.stack.last().unwrap_or(&self.empty)
    }

    /// Number of pushed contexts
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Whether nothing was pushed
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Name of the user running this process
///
/// Looks the real uid up in the passwd database and falls back to `$USER`.
/// A failed lookup is returned when `$USER` is not set either.
pub fn invoking_user() -> Result<String> {
    use nix::unistd::{getuid, User};

    let lookup = User::from_uid(getuid());
    if let Ok(Some(user)) = &lookup {
        return Ok(user.name.clone());
    }
    if let Err(e) = &lookup {
        tracing::debug!("passwd lookup failed: {}", e);
    }

    fallback_user(lookup.map(|_| ()), std::env::var("USER").ok())
}

fn fallback_user(lookup: nix::Result<()>, env_user: Option<String>) -> Result<String> {
    if let Some(name) = env_user.filter(|name| !name.is_empty()) {
        return Ok(name);
    }
    lookup?;
    Err(Error::UnknownUser)
}
