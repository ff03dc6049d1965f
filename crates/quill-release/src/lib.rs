//! Quill firmware release library.
//!
//! Everything the release and deploy tooling needs to ship printer firmware
//! without shipping the developer's credentials:
//! - Secret scrubbing and template generation for the configuration header
//! - Backup and restore of the live configuration around a build
//! - Partition table parsing and merged flash image planning
//! - The release pipeline that drives the platformio, npm, and esptool
//!   processes

pub mod backup;
pub mod error;
pub mod merge;
pub mod notes;
pub mod partition;
pub mod patterns;
pub mod preflight;
pub mod release;
pub mod runner;
pub mod scrub;
pub mod template;

// Re-export the types most callers start from
pub use backup::{BackupCoordinator, BackupOutcome, RestoreGuard};
pub use error::{BackupError, PartitionError, ReleaseError, RunnerError, ScrubError};
pub use patterns::SecretPatterns;
pub use release::{ReleaseConfig, ReleaseReport, ReleaseRunner};
pub use runner::{Invocation, SystemRunner, ToolRunner};
pub use scrub::Scrubber;
