//! Shell command execution used for version probes and installers

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("Empty command line")]
    EmptyCommand,
}

/// A program invocation: executable, arguments and execution context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory (None = inherit)
    pub cwd: Option<PathBuf>,
    /// Kill the process after this long (None = wait indefinitely)
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            timeout: None,
        }
    }

    /// Build a spec from a whitespace-separated command line.
    ///
    /// The first token is the executable and the remaining tokens are passed
    /// verbatim as arguments; no quoting rules apply.
    pub fn from_command_line(line: &str) -> Result<Self, ShellError> {
        let mut tokens = line.split_whitespace().map(str::to_string);
        let program = tokens.next().ok_or(ShellError::EmptyCommand)?;
        Ok(Self::new(program, tokens.collect()))
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (None if killed by signal)
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub combined: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for running external programs
///
/// A process that starts and exits with a non-zero status is still `Ok`;
/// callers decide what a failing exit status means for them.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ShellError>;
}

/// Runs commands as child processes of this one
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait::async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput, ShellError> {
        debug!("Running {} {:?}", command.program, command.args);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(cwd) = &command.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|source| ShellError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let wait = child.wait_with_output();
        let output = match command.timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait).await.map_err(|_| {
                ShellError::Timeout {
                    program: command.program.clone(),
                    timeout,
                }
            })?,
            None => wait.await,
        }
        .map_err(|source| ShellError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        debug!(
            "{} exited with {:?} ({} bytes of output)",
            command.program,
            output.status.code(),
            combined.len()
        );

        Ok(CommandOutput {
            exit_code: output.status.code(),
            combined,
        })
    }
}
