//! Scripted tool runner for tests.
//!
//! Records every invocation and returns scripted outcomes instead of
//! spawning processes. Useful for exercising the release pipeline's
//! control flow: which steps ran, in what order, and how failures
//! propagate.

use crate::error::RunnerError;
use crate::runner::{Invocation, ToolOutput, ToolRunner};

struct ScriptedFailure {
    /// Substring matched against the full command line
    needle: String,
    status: i32,
    stderr: String,
}

/// Fake runner that records invocations and fails on demand.
///
/// By default every invocation succeeds with empty output. Failures are
/// keyed on command-line substrings, so a test can say "the filesystem
/// build for this target breaks" without spelling out the whole argv.
pub struct FakeRunner {
    calls: Vec<Invocation>,
    failures: Vec<ScriptedFailure>,
    missing_tools: Vec<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            failures: Vec::new(),
            missing_tools: Vec::new(),
        }
    }

    /// Fail any invocation whose command line contains `needle`.
    pub fn fail_matching(&mut self, needle: impl Into<String>, status: i32, stderr: impl Into<String>) {
        self.failures.push(ScriptedFailure {
            needle: needle.into(),
            status,
            stderr: stderr.into(),
        });
    }

    /// Report `tool` as not installed.
    pub fn missing_tool(&mut self, tool: impl Into<String>) {
        self.missing_tools.push(tool.into());
    }

    pub fn calls(&self) -> &[Invocation] {
        &self.calls
    }

    /// Display lines of every recorded invocation, for simple assertions.
    pub fn call_lines(&self) -> Vec<String> {
        self.calls.iter().map(Invocation::display_line).collect()
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for FakeRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<ToolOutput, RunnerError> {
        self.calls.push(invocation.clone());

        if self.missing_tools.iter().any(|t| *t == invocation.program) {
            return Err(RunnerError::ToolMissing(invocation.program.clone()));
        }

        let line = invocation.display_line();
        if let Some(failure) = self.failures.iter().find(|f| line.contains(&f.needle)) {
            return Err(RunnerError::Failed {
                tool: invocation.program.clone(),
                status: Some(failure.status),
                stdout: String::new(),
                stderr: failure.stderr.clone(),
            });
        }

        Ok(ToolOutput::default())
    }
}
