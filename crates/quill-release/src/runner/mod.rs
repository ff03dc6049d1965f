//! External tool invocation.
//!
//! The whole pipeline shells out for the heavy lifting (board builds,
//! frontend bundling, image merging). Everything goes through [`ToolRunner`]
//! so the pipeline can be exercised in tests without spawning processes.

use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use log::debug;

use crate::error::RunnerError;

pub mod fake;

pub use fake::FakeRunner;

/// A single external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherited from the parent process when `None`.
    pub cwd: Option<PathBuf>,
    /// Capture output (build steps) or hand the terminal to the child
    /// (serial monitor).
    pub capture: bool,
}

impl Invocation {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            capture: true,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Run with inherited stdio instead of captured output.
    pub fn interactive(mut self) -> Self {
        self.capture = false;
        self
    }

    /// `program arg1 arg2 …` for log lines and matching in tests.
    pub fn display_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Captured output of a completed invocation. Empty for interactive runs.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools to completion.
///
/// A non-zero exit is an `Err` carrying the captured output, so call sites
/// treat "ran and failed" and "could not run" through one path.
pub trait ToolRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput, RunnerError>;
}

/// The real runner over `std::process`.
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput, RunnerError> {
        debug!("running: {}", invocation.display_line());

        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            command.current_dir(dir);
        }

        if invocation.capture {
            let output = command
                .output()
                .map_err(|err| spawn_error(&invocation.program, err))?;
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if !output.status.success() {
                return Err(RunnerError::Failed {
                    tool: invocation.program.clone(),
                    status: output.status.code(),
                    stdout,
                    stderr,
                });
            }
            Ok(ToolOutput { stdout, stderr })
        } else {
            let status = command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|err| spawn_error(&invocation.program, err))?;
            if !status.success() {
                return Err(RunnerError::Failed {
                    tool: invocation.program.clone(),
                    status: status.code(),
                    stdout: String::new(),
                    stderr: String::new(),
                });
            }
            Ok(ToolOutput::default())
        }
    }
}

fn spawn_error(tool: &str, err: io::Error) -> RunnerError {
    if err.kind() == io::ErrorKind::NotFound {
        RunnerError::ToolMissing(tool.to_string())
    } else {
        RunnerError::Io {
            tool: tool.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_line_joins_program_and_args() {
        let invocation = Invocation::new("pio", ["run", "-e", "esp32c3-prod"]);
        assert_eq!(invocation.display_line(), "pio run -e esp32c3-prod");
    }

    #[test]
    fn test_missing_tool_maps_to_tool_missing() {
        let mut runner = SystemRunner;
        let err = runner
            .run(&Invocation::new("definitely-not-a-real-tool-7f3a", ["--version"]))
            .unwrap_err();

        assert!(matches!(err, RunnerError::ToolMissing(_)), "got {err:?}");
    }

    #[test]
    fn test_failed_command_carries_status() {
        // `false` is POSIX and exits 1 without output.
        let mut runner = SystemRunner;
        let err = runner
            .run(&Invocation::new("false", Vec::<String>::new()))
            .unwrap_err();

        match err {
            RunnerError::Failed { status, .. } => assert_eq!(status, Some(1)),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_successful_command_captures_stdout() {
        let mut runner = SystemRunner;
        let output = runner
            .run(&Invocation::new("echo", ["release-check"]))
            .unwrap();

        assert_eq!(output.stdout.trim(), "release-check");
    }
}
