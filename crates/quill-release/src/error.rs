//! Error types for the release toolchain

use std::fmt;
use std::io;
use std::path::PathBuf;

/// A suspicious value that survived scrubbing, reported by the residual scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidualFinding {
    /// Which shape check matched (e.g. "OpenAI-style API key")
    pub description: &'static str,
    /// The matched text, including the surrounding quotes
    pub value: String,
}

impl fmt::Display for ResidualFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.description, self.value)
    }
}

/// Error type for secret scrubbing
#[derive(Debug, Clone)]
pub enum ScrubError {
    /// Values matching secret shapes remain after all field rules ran.
    /// The scrubbed text must not be used.
    ResidualSecrets(Vec<ResidualFinding>),
}

impl fmt::Display for ScrubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrubError::ResidualSecrets(findings) => {
                writeln!(f, "potential secrets remain after scrubbing:")?;
                for finding in findings {
                    writeln!(f, "  - {finding}")?;
                }
                write!(
                    f,
                    "add a field rule for any legitimate secret listed above"
                )
            }
        }
    }
}

impl std::error::Error for ScrubError {}

/// Error type for configuration backup and restore
#[derive(Debug)]
pub enum BackupError {
    /// The live configuration file does not exist
    MissingConfig(PathBuf),
    /// The live configuration looks already scrubbed and no backup exists;
    /// proceeding would overwrite the only copy with placeholder values
    DataLossRisk(PathBuf),
    /// No backup file to restore from
    NoBackup(PathBuf),
    /// The backup itself looks scrubbed; automatic recovery refused.
    /// Any timestamped side copies found next to it are listed for
    /// manual inspection.
    BackupLooksClean {
        backup: PathBuf,
        timestamped: Vec<PathBuf>,
    },
    /// Filesystem error
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::MissingConfig(path) => {
                write!(f, "configuration file not found: {}", path.display())
            }
            BackupError::DataLossRisk(path) => {
                write!(
                    f,
                    "{} already contains placeholders and no backup exists; \
                     refusing to continue, restore your real configuration first",
                    path.display()
                )
            }
            BackupError::NoBackup(path) => {
                write!(f, "no backup found at {}", path.display())
            }
            BackupError::BackupLooksClean { backup, timestamped } => {
                write!(
                    f,
                    "backup {} also contains placeholders; not restoring from it",
                    backup.display()
                )?;
                if !timestamped.is_empty() {
                    write!(f, " (timestamped copies:")?;
                    for copy in timestamped {
                        write!(f, " {}", copy.display())?;
                    }
                    write!(f, ")")?;
                }
                Ok(())
            }
            BackupError::Io { path, source } => {
                write!(f, "filesystem error at {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error type for partition table handling
#[derive(Debug)]
pub enum PartitionError {
    /// The table has no row named `littlefs`
    PartitionNotFound,
    /// The filesystem row's offset column did not parse as a number
    InvalidOffset { row: String, text: String },
    /// Could not read the table file
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionError::PartitionNotFound => {
                write!(
                    f,
                    "no 'littlefs' partition found; the filesystem row must be \
                     named exactly 'littlefs'"
                )
            }
            PartitionError::InvalidOffset { row, text } => {
                write!(f, "partition '{row}' has an invalid offset: {text:?}")
            }
            PartitionError::Io { path, source } => {
                write!(
                    f,
                    "failed to read partition table {}: {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for PartitionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PartitionError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error type for spawning external tools
#[derive(Debug)]
pub enum RunnerError {
    /// The executable is not installed or not on PATH
    ToolMissing(String),
    /// The process ran and exited with a failure status
    Failed {
        tool: String,
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The process could not be spawned or waited on
    Io { tool: String, source: io::Error },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::ToolMissing(tool) => {
                write!(f, "'{tool}' not found on PATH")
            }
            RunnerError::Failed { tool, status, stderr, .. } => {
                match status {
                    Some(code) => write!(f, "'{tool}' exited with code {code}")?,
                    None => write!(f, "'{tool}' was terminated by a signal")?,
                }
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            RunnerError::Io { tool, source } => {
                write!(f, "failed to run '{tool}': {source}")
            }
        }
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunnerError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error type for the release pipeline.
///
/// These are the conditions that abort the whole run. Failures scoped to a
/// single build target are recorded in the run report instead.
#[derive(Debug)]
pub enum ReleaseError {
    /// The project directory has no platformio.ini
    NotAProject(PathBuf),
    /// Backing up the configuration failed or was refused
    Backup(BackupError),
    /// Scrubbing failed validation
    Scrub(ScrubError),
    /// The frontend bundle failed to build; firmware filesystems depend on it
    Frontend(RunnerError),
    /// The partition table cannot supply a filesystem offset. This poisons
    /// every image built from that table, so the run stops.
    Partition {
        table: PathBuf,
        source: PartitionError,
    },
    /// Writing the scrubbed configuration or template failed
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ReleaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseError::NotAProject(path) => {
                write!(
                    f,
                    "{} is not a board project directory (no platformio.ini)",
                    path.display()
                )
            }
            ReleaseError::Backup(err) => write!(f, "configuration backup: {err}"),
            ReleaseError::Scrub(err) => write!(f, "secret scrubbing: {err}"),
            ReleaseError::Frontend(err) => write!(f, "frontend build: {err}"),
            ReleaseError::Partition { table, source } => {
                write!(f, "partition table {}: {source}", table.display())
            }
            ReleaseError::Io { path, source } => {
                write!(f, "filesystem error at {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ReleaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReleaseError::Backup(err) => Some(err),
            ReleaseError::Scrub(err) => Some(err),
            ReleaseError::Frontend(err) => Some(err),
            ReleaseError::Partition { source, .. } => Some(source),
            ReleaseError::Io { source, .. } => Some(source),
            ReleaseError::NotAProject(_) => None,
        }
    }
}

impl From<BackupError> for ReleaseError {
    fn from(err: BackupError) -> Self {
        ReleaseError::Backup(err)
    }
}

impl From<ScrubError> for ReleaseError {
    fn from(err: ScrubError) -> Self {
        ReleaseError::Scrub(err)
    }
}
