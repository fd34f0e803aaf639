//! Blocking subprocess execution.

use std::io;
use std::process::Command;

use thiserror::Error;

/// Errors from running an external tool.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The executable could not be started.
    #[error("Failed to run {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool ran and reported failure.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    Failed {
        tool: String,
        exit_code: i32,
        message: String,
    },
}

impl ToolError {
    /// Create a launch error.
    pub fn launch(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Launch {
            tool: tool.into(),
            source,
        }
    }

    /// Create a failed-exit error.
    pub fn failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }
}

/// Result type for tool invocations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Captured result of one finished subprocess.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Exit code; -1 when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// A successful run with the given stdout.
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    /// A failed run with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }

    /// Only exit code 0 counts as success.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stderr as lossy UTF-8, falling back to stdout when stderr is empty
    /// (mkvtoolnix prints its errors to stdout).
    pub fn diagnostic(&self) -> String {
        let text = if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        String::from_utf8_lossy(text).trim().to_string()
    }
}

/// Runs external programs and waits for them to exit.
///
/// The processing code never touches `std::process` directly so tests can
/// substitute a scripted runner.
pub trait CommandRunner {
    /// Run `program` with `args`, blocking until it exits.
    ///
    /// Returns `Err` only when the program could not be started; a nonzero
    /// exit is reported through [`ToolOutput::exit_code`].
    fn run(&self, program: &str, args: &[String]) -> ToolResult<ToolOutput>;

    /// Run and turn a nonzero exit into [`ToolError::Failed`].
    fn run_checked(&self, program: &str, args: &[String]) -> ToolResult<ToolOutput> {
        let output = self.run(program, args)?;
        if !output.success() {
            return Err(ToolError::failed(
                program,
                output.exit_code,
                output.diagnostic(),
            ));
        }
        Ok(output)
    }
}

/// Runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> ToolResult<ToolOutput> {
        tracing::debug!("Running: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| ToolError::launch(program, e))?;

        let exit_code = output.status.code().unwrap_or(-1);
        if exit_code != 0 {
            tracing::debug!("{} exited with code {}", program, exit_code);
        }

        Ok(ToolOutput {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
