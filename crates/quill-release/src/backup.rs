//! Backup and restore of the live configuration around a release build.
//!
//! The live header is the only copy of the user's real credentials, so every
//! transition here is guarded: the toolchain must never end up with neither a
//! secret-bearing live file nor a trustworthy backup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{info, warn};

use crate::error::BackupError;
use crate::patterns::{CLEAN_PROBE_THRESHOLD, SecretPatterns};

/// Suffix appended to the live configuration path for the backup copy.
pub const BACKUP_SUFFIX: &str = ".orig";

/// `device_config.h` -> `device_config.h.orig` style sibling paths.
pub fn path_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Decides whether a document is already scrubbed by counting how many of
/// the known placeholder probes it contains.
///
/// This is a heuristic for backup safety decisions only; scrubbing itself
/// always runs regardless of what it says.
pub struct CleanStateDetector<'a> {
    patterns: &'a SecretPatterns,
}

impl<'a> CleanStateDetector<'a> {
    pub fn new(patterns: &'a SecretPatterns) -> Self {
        Self { patterns }
    }

    pub fn looks_already_clean(&self, document: &str) -> bool {
        let hits = self
            .patterns
            .clean_probes()
            .filter(|probe| document.contains(probe))
            .count();
        hits >= CLEAN_PROBE_THRESHOLD
    }
}

/// Outcome of a successful backup decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Fresh backup written from the live file
    Created,
    /// A secret-bearing backup already exists and was left untouched
    KeptExisting,
    /// The live file is already scrubbed; the existing backup is the source
    /// of truth for the final restore
    ReusedExisting,
    /// The existing backup looked scrubbed too, so the live file was copied
    /// to this timestamped path before the backup was replaced
    SideCopied(PathBuf),
}

/// Owns the live-file / backup-file pair and the transitions between them.
pub struct BackupCoordinator<'a> {
    live_path: PathBuf,
    backup_path: PathBuf,
    detector: CleanStateDetector<'a>,
}

impl<'a> BackupCoordinator<'a> {
    pub fn new(live_path: impl Into<PathBuf>, patterns: &'a SecretPatterns) -> Self {
        let live_path = live_path.into();
        let backup_path = path_with_suffix(&live_path, BACKUP_SUFFIX);
        Self {
            live_path,
            backup_path,
            detector: CleanStateDetector::new(patterns),
        }
    }

    pub fn live_path(&self) -> &Path {
        &self.live_path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Ensure a secret-bearing copy of the configuration survives the build.
    ///
    /// Refuses outright when the live file already holds placeholders and no
    /// backup exists: overwriting it would destroy the only configuration
    /// the user has.
    pub fn backup(&self) -> Result<BackupOutcome, BackupError> {
        if !self.live_path.exists() {
            return Err(BackupError::MissingConfig(self.live_path.clone()));
        }

        if self.file_looks_clean(&self.live_path) {
            warn!(
                "{} already contains placeholders",
                self.live_path.display()
            );
            if self.backup_path.exists() {
                info!(
                    "using existing backup {} as the source of truth",
                    self.backup_path.display()
                );
                return Ok(BackupOutcome::ReusedExisting);
            }
            return Err(BackupError::DataLossRisk(self.live_path.clone()));
        }

        if self.backup_path.exists() {
            if self.file_looks_clean(&self.backup_path) {
                // The backup holds placeholders and the live file holds the
                // real values; keep a stamped copy of the live file, then
                // let the proper backup replace the scrubbed one.
                warn!(
                    "existing backup {} also looks scrubbed",
                    self.backup_path.display()
                );
                let stamped = path_with_suffix(
                    &self.backup_path,
                    &format!(".{}", timestamp_suffix()),
                );
                match fs::copy(&self.live_path, &stamped) {
                    Ok(_) => {
                        info!("created timestamped copy {}", stamped.display());
                        self.copy_live_to_backup()?;
                        return Ok(BackupOutcome::SideCopied(stamped));
                    }
                    Err(err) => {
                        warn!(
                            "could not create timestamped copy {}: {err}",
                            stamped.display()
                        );
                        self.copy_live_to_backup()?;
                        return Ok(BackupOutcome::Created);
                    }
                }
            }
            info!(
                "existing backup {} contains the original values; keeping it",
                self.backup_path.display()
            );
            return Ok(BackupOutcome::KeptExisting);
        }

        self.copy_live_to_backup()?;
        Ok(BackupOutcome::Created)
    }

    /// Copy the backup over the live file.
    pub fn restore(&self) -> Result<(), BackupError> {
        if !self.backup_path.exists() {
            return Err(BackupError::NoBackup(self.backup_path.clone()));
        }
        fs::copy(&self.backup_path, &self.live_path).map_err(|source| {
            BackupError::Io {
                path: self.live_path.clone(),
                source,
            }
        })?;
        info!(
            "restored {} from {}",
            self.live_path.display(),
            self.backup_path.display()
        );
        Ok(())
    }

    /// Recovery entry point for when a build was interrupted and the live
    /// file was left scrubbed.
    ///
    /// Unlike [`restore`](Self::restore) this refuses to copy a backup that
    /// itself looks scrubbed, and reports any timestamped copies worth
    /// restoring by hand instead.
    pub fn recover(&self) -> Result<(), BackupError> {
        if !self.backup_path.exists() {
            return Err(BackupError::NoBackup(self.backup_path.clone()));
        }
        if self.file_looks_clean(&self.backup_path) {
            return Err(BackupError::BackupLooksClean {
                backup: self.backup_path.clone(),
                timestamped: self.timestamped_copies(),
            });
        }
        self.restore()
    }

    fn copy_live_to_backup(&self) -> Result<(), BackupError> {
        fs::copy(&self.live_path, &self.backup_path).map_err(|source| {
            BackupError::Io {
                path: self.backup_path.clone(),
                source,
            }
        })?;
        info!(
            "backed up {} to {}",
            self.live_path.display(),
            self.backup_path.display()
        );
        Ok(())
    }

    fn file_looks_clean(&self, path: &Path) -> bool {
        match fs::read_to_string(path) {
            Ok(content) => self.detector.looks_already_clean(&content),
            Err(_) => false,
        }
    }

    fn timestamped_copies(&self) -> Vec<PathBuf> {
        let Some(parent) = self.backup_path.parent() else {
            return Vec::new();
        };
        let Some(name) = self.backup_path.file_name().and_then(|n| n.to_str())
        else {
            return Vec::new();
        };
        let prefix = format!("{name}.");

        let mut found = Vec::new();
        if let Ok(entries) = fs::read_dir(parent) {
            for entry in entries.flatten() {
                if entry.file_name().to_string_lossy().starts_with(&prefix) {
                    found.push(entry.path());
                }
            }
        }
        found.sort();
        found
    }
}

/// Restores the live configuration when dropped, whatever happened in
/// between. Failures are logged, not propagated, so the surrounding error
/// (if any) stays visible.
pub struct RestoreGuard<'a, 'b> {
    coordinator: &'a BackupCoordinator<'b>,
}

impl<'a, 'b> RestoreGuard<'a, 'b> {
    pub fn new(coordinator: &'a BackupCoordinator<'b>) -> Self {
        Self { coordinator }
    }
}

impl Drop for RestoreGuard<'_, '_> {
    fn drop(&mut self) {
        if let Err(err) = self.coordinator.restore() {
            warn!("could not restore configuration: {err}");
        }
    }
}

/// Filesystem-safe `YYYYMMDD_HHMMSS` stamp in UTC.
fn timestamp_suffix() -> String {
    let now = humantime::format_rfc3339_seconds(SystemTime::now()).to_string();
    now.chars()
        .filter(|c| c.is_ascii_digit() || *c == 'T')
        .collect::<String>()
        .replace('T', "_")
}
