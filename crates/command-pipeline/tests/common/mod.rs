//! Shared test helpers

use async_trait::async_trait;
use command_pipeline::{Error, ExitStatus, Result, Shell, ShellOutput};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

/// One recorded shell invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub line: String,
    pub env: Option<IndexMap<String, String>>,
}

/// What the fake shell answers with
#[derive(Debug, Clone)]
pub enum Reply {
    Output {
        stdout: &'static str,
        stderr: &'static str,
        code: i32,
    },
    CannotStart,
}

/// Shell that records every line it is asked to run
#[derive(Clone)]
pub struct RecordingShell {
    reply: Reply,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl RecordingShell {
    pub fn replying(reply: Reply) -> Self {
        Self {
            reply,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn ok(stdout: &'static str) -> Self {
        Self::replying(Reply::Output {
            stdout,
            stderr: "",
            code: 0,
        })
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Shell for RecordingShell {
    async fn invoke(
        &self,
        line: &str,
        env: Option<&IndexMap<String, String>>,
    ) -> Result<ShellOutput> {
        self.calls.lock().unwrap().push(Invocation {
            line: line.to_string(),
            env: env.cloned(),
        });

        match &self.reply {
            Reply::Output {
                stdout,
                stderr,
                code,
            } => Ok(ShellOutput {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                status: ExitStatus::from_code(*code),
            }),
            Reply::CannotStart => Err(Error::invocation_failed(line, "sh: permission denied")),
        }
    }
}
