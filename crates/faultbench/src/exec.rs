//! External command execution
//!
//! Injections drive a database client, a container runtime and a cluster
//! client. They all go through [`CommandExecutor`] so tests can record
//! commands instead of running them.

use crate::error::CommandError;
use std::fmt;

/// A program and its argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create command with no arguments
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[inline]
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external commands
///
/// Implementations return the combined stdout/stderr on success and
/// `CommandError::Failed` carrying that output on a non-zero exit.
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command to completion
    async fn run(&self, command: &CommandSpec) -> Result<String, CommandError>;
}

/// Executor backed by `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

#[async_trait::async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, command: &CommandSpec) -> Result<String, CommandError> {
        tracing::debug!(command = %command, "running command");

        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(combined)
        } else {
            Err(CommandError::Failed {
                command: command.to_string(),
                code: output.status.code().unwrap_or(-1),
                output: combined.trim().to_string(),
            })
        }
    }
}
