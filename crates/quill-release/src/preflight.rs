//! Host environment checks.
//!
//! Quick validation that the external tools the pipeline shells out to are
//! actually installed, plus an optional serial port probe. Saves the round
//! trip of discovering a missing tool twenty minutes into a build.

use std::path::Path;

use crate::error::RunnerError;
use crate::runner::{Invocation, ToolRunner};

/// The tools a full release run invokes, with install hints.
pub const REQUIRED_TOOLS: [(&str, &str); 3] = [
    ("pio", "pip install platformio"),
    ("npm", "install Node.js and npm"),
    ("esptool", "pip install esptool"),
];

/// Outcome of probing one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// Present; carries the first line of `--version` output when the tool
    /// printed one.
    Found(String),
    /// Not on PATH
    Missing,
    /// Present but `--version` failed; carries the error text
    Broken(String),
}

/// One tool's probe result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReport {
    pub tool: &'static str,
    pub hint: &'static str,
    pub status: ToolStatus,
}

impl ToolReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, ToolStatus::Found(_))
    }
}

/// Install hint for a known tool name, for error messages elsewhere in the
/// pipeline.
pub fn install_hint(tool: &str) -> Option<&'static str> {
    REQUIRED_TOOLS
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, hint)| *hint)
}

/// Probe every required tool with `--version`.
pub fn check_host_tools(runner: &mut dyn ToolRunner) -> Vec<ToolReport> {
    REQUIRED_TOOLS
        .iter()
        .map(|&(tool, hint)| {
            let status = match runner.run(&Invocation::new(tool, ["--version"])) {
                Ok(output) => {
                    let line = output
                        .stdout
                        .lines()
                        .chain(output.stderr.lines())
                        .next()
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    ToolStatus::Found(line)
                }
                Err(RunnerError::ToolMissing(_)) => ToolStatus::Missing,
                Err(err) => ToolStatus::Broken(err.to_string()),
            };
            ToolReport { tool, hint, status }
        })
        .collect()
}

/// True when the device node exists. A cheap first check before any upload
/// attempt; it says nothing about what is on the other end.
pub fn serial_port_present(port: &Path) -> bool {
    port.exists()
}
