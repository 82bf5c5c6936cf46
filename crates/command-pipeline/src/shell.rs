//! The shell execution boundary
//!
//! A [`Shell`] runs one rendered command line and hands back everything it
//! printed once the process has exited. Output is fully buffered; nothing is
//! streamed.

use async_process::{Command, Stdio};
use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Process exit status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    #[cfg(unix)]
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Status of a process that exited with `code`
    pub fn from_code(code: i32) -> Self {
        Self {
            code: Some(code),
            #[cfg(unix)]
            signal: None,
        }
    }

    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Returns true if the process was terminated by a signal
    pub fn terminated_by_signal(&self) -> bool {
        #[cfg(unix)]
        {
            self.signal.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
            #[cfg(unix)]
            signal: {
                use std::os::unix::process::ExitStatusExt;
                status.signal()
            },
        }
    }
}

/// Everything a finished shell invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// How the shell exited
    pub status: ExitStatus,
}

/// Something that can run a command line through a shell
#[async_trait]
pub trait Shell: Send + Sync {
    /// Run `line`, replacing the environment with `env` when given
    ///
    /// An `Err` means the shell could not be started or talked to. A command
    /// that ran and failed is an `Ok` with a non-zero status.
    async fn invoke(&self, line: &str, env: Option<&IndexMap<String, String>>)
    -> Result<ShellOutput>;
}

/// Runs command lines with a local `sh -c`
#[derive(Debug, Clone)]
pub struct LocalShell {
    program: String,
}

impl LocalShell {
    /// Use `/bin/sh`
    pub fn new() -> Self {
        Self::with_program("/bin/sh")
    }

    /// Use another POSIX shell, e.g. `bash`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The shell program
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Shell for LocalShell {
    async fn invoke(
        &self,
        line: &str,
        env: Option<&IndexMap<String, String>>,
    ) -> Result<ShellOutput> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-c").arg(line);

        if let Some(vars) = env {
            cmd.env_clear();
            for (key, val) in vars {
                cmd.env(key, val);
            }
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("invoking {} -c {:?}", self.program, line);

        let output = cmd.output().await.map_err(|e| {
            Error::invocation_failed(line, format!("failed to run {}: {}", self.program, e))
        })?;

        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert!(ExitStatus::from_code(0).success());
        assert!(!ExitStatus::from_code(42).success());
        assert!(!ExitStatus::from_code(1).terminated_by_signal());
    }

    #[cfg(unix)]
    #[smol_potat::test]
    async fn test_local_shell_captures_output() {
        let shell = LocalShell::new();
        let output = shell
            .invoke("echo hello; echo oops >&2; exit 3", None)
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert_eq!(output.stderr, "oops\n");
        assert_eq!(output.status.code, Some(3));
    }

    #[cfg(unix)]
    #[smol_potat::test]
    async fn test_local_shell_replaces_environment() {
        let shell = LocalShell::new();
        let mut env = IndexMap::new();
        env.insert("GREETING".to_string(), "hi".to_string());
        let output = shell
            .invoke("echo \"$GREETING:${HOME:-unset}\"", Some(&env))
            .await
            .unwrap();
        assert_eq!(output.stdout, "hi:unset\n");
    }

    #[smol_potat::test]
    async fn test_missing_shell_is_invocation_failure() {
        let shell = LocalShell::with_program("/no/such/shell-12345");
        let err = shell.invoke("true", None).await.unwrap_err();
        assert!(matches!(err, Error::InvocationFailed { .. }));
    }
}
