//! External command execution
//!
//! `git`, `gh` and `docker` are driven through the [`CommandRunner`] trait so
//! that orchestration code can be tested against [`MockCommandRunner`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{CommandError, Result, TagwardenError};

/// Render a command line for logs and error messages
pub fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs external programs one at a time
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a program and return its trimmed stdout; non-zero exit is an error
    async fn run(&self, program: &str, args: &[&str]) -> Result<String>;

    /// Run a program with inherited stdio (for long-running builds)
    async fn run_interactive(&self, program: &str, args: &[&str]) -> Result<()>;

    /// Like [`CommandRunner::run`], but failures are logged and yield an empty string
    async fn run_safe(&self, program: &str, args: &[&str]) -> String {
        match self.run(program, args).await {
            Ok(stdout) => stdout,
            Err(e) => {
                warn!(
                    "Command failed (non-fatal): {}",
                    command_line(program, args)
                );
                warn!("{}", e);
                String::new()
            }
        }
    }
}

/// [`CommandRunner`] backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioCommandRunner {
    working_dir: Option<PathBuf>,
}

impl TokioCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every command inside `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(dir.into()),
        }
    }

    fn command(&self, program: &str, args: &[&str]) -> Command {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait::async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        let line = command_line(program, args);
        info!("$ {}", line);

        let output = self
            .command(program, args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CommandError::Spawn {
                command: line.clone(),
                message: e.to_string(),
            })?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            debug!("{} produced {} bytes of output", program, stdout.len());
            Ok(stdout)
        } else {
            Err(CommandError::Failed {
                command: line,
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into())
        }
    }

    async fn run_interactive(&self, program: &str, args: &[&str]) -> Result<()> {
        let line = command_line(program, args);
        info!("$ {}", line);

        let status = self
            .command(program, args)
            .status()
            .await
            .map_err(|e| CommandError::Spawn {
                command: line.clone(),
                message: e.to_string(),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(CommandError::Failed {
                command: line,
                code: status.code().unwrap_or(-1),
                stderr: String::new(),
            }
            .into())
        }
    }
}

/// Scripted [`CommandRunner`] for tests
///
/// Commands are matched by their full command line. Unscripted commands
/// succeed with empty output.
#[derive(Debug, Clone, Default)]
pub struct MockCommandRunner {
    outputs: Arc<Mutex<HashMap<String, std::result::Result<String, String>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the stdout of a command line
    pub async fn respond(&self, command: &str, stdout: &str) {
        self.outputs
            .lock()
            .await
            .insert(command.to_string(), Ok(stdout.to_string()));
    }

    /// Script a command line to exit non-zero
    pub async fn fail(&self, command: &str, stderr: &str) {
        self.outputs
            .lock()
            .await
            .insert(command.to_string(), Err(stderr.to_string()));
    }

    /// Command lines executed so far, in order
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, program: &str, args: &[&str]) -> Result<String> {
        let line = command_line(program, args);
        self.calls.lock().await.push(line.clone());
        match self.outputs.lock().await.get(&line) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(stderr)) => Err(TagwardenError::Command(CommandError::Failed {
                command: line,
                code: 1,
                stderr: stderr.clone(),
            })),
            None => Ok(String::new()),
        }
    }
}

#[async_trait::async_trait]
impl CommandRunner for MockCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<String> {
        self.record(program, args).await
    }

    async fn run_interactive(&self, program: &str, args: &[&str]) -> Result<()> {
        self.record(program, args).await.map(|_| ())
    }
}
