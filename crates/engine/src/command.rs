//! Shell command execution
//!
//! Lifecycle commands and manifest plugin hooks run through a
//! [`CommandRunner`]. The default [`ShellCommandRunner`] spawns the platform
//! shell, streams the command's output to stdout while capturing it, and
//! fails with the captured output on a non-zero exit.

use indexmap::IndexMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single shell command
#[derive(Error, Debug)]
pub enum CommandError {
    /// The shell could not be started
    #[error("Failed to start command '{command}': {source}")]
    Spawn {
        /// Command text
        command: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully
    #[error("Command '{command}' failed (exit code {status:?})")]
    Failed {
        /// Command text
        command: String,
        /// Exit code, if the process exited normally
        status: Option<i32>,
        /// Combined stdout and stderr
        output: String,
    },
}

impl CommandError {
    /// Output captured before the failure (the IO error for spawn failures)
    #[must_use]
    pub fn output(&self) -> String {
        match self {
            Self::Spawn { source, .. } => source.to_string(),
            Self::Failed { output, .. } => output.clone(),
        }
    }
}

/// Executes shell command strings
pub trait CommandRunner: Send + Sync {
    /// Run `command`, with `env` added to the runner's environment
    ///
    /// Returns the captured output on success.
    fn run(&self, command: &str, env: &[(&str, &str)]) -> Result<String, CommandError>;
}

/// Implement CommandRunner for closures
impl<F> CommandRunner for F
where
    F: Fn(&str, &[(&str, &str)]) -> Result<String, CommandError> + Send + Sync,
{
    fn run(&self, command: &str, env: &[(&str, &str)]) -> Result<String, CommandError> {
        self(command, env)
    }
}

/// Runs commands through `sh -c` (`cmd /C` on Windows)
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    working_dir: PathBuf,
    /// Variables exported to every command
    env: IndexMap<String, String>,
    echo: bool,
}

impl ShellCommandRunner {
    /// Create a runner executing commands in `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            env: IndexMap::new(),
            echo: true,
        }
    }

    /// Export a variable to every command
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Capture output without echoing it to stdout
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Directory commands run in
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn shell() -> (&'static str, &'static str) {
        if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        }
    }
}

impl CommandRunner for ShellCommandRunner {
    #[tracing::instrument(skip(self, env), fields(working_dir = %self.working_dir.display()))]
    fn run(&self, command: &str, env: &[(&str, &str)]) -> Result<String, CommandError> {
        let (shell, flag) = Self::shell();

        // Output is checked by hand below so the captured text can be reported
        let mut expression = duct::cmd(shell, [flag, command])
            .dir(&self.working_dir)
            .stderr_to_stdout()
            .unchecked();

        for (key, value) in &self.env {
            expression = expression.env(key, value);
        }
        for (key, value) in env {
            expression = expression.env(key, value);
        }

        let reader = expression.reader().map_err(|source| CommandError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let mut captured = String::new();
        let mut buffered = BufReader::new(&reader);
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = buffered
                .read_until(b'\n', &mut line)
                .map_err(|source| CommandError::Spawn {
                    command: command.to_string(),
                    source,
                })?;
            if read == 0 {
                break;
            }

            let text = String::from_utf8_lossy(&line);
            if self.echo {
                print!("{text}");
            }
            captured.push_str(&text);
        }

        // The reader reaps the child at EOF
        let status = reader
            .try_wait()
            .map_err(|source| CommandError::Spawn {
                command: command.to_string(),
                source,
            })?
            .map(|output| output.status);

        match status {
            Some(status) if status.success() => {
                tracing::debug!(command = %command, "Command completed");
                Ok(captured)
            }
            other => Err(CommandError::Failed {
                command: command.to_string(),
                status: other.and_then(|s| s.code()),
                output: captured,
            }),
        }
    }
}
