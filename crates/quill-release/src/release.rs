//! The release pipeline.
//!
//! Orchestrates one full firmware release: secure the live configuration,
//! scrub it, build the web assets and every firmware target, package merged
//! images, and put the user's configuration back no matter what happened in
//! between.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::backup::{BackupCoordinator, RestoreGuard, path_with_suffix};
use crate::error::{ReleaseError, RunnerError};
use crate::merge::{ChipFamily, MergePlan};
use crate::notes;
use crate::partition::{FlashOffset, PartitionTable, partitions_file_for_target};
use crate::patterns::SecretPatterns;
use crate::preflight;
use crate::runner::{Invocation, ToolRunner};
use crate::scrub::Scrubber;
use crate::template::{self, EXAMPLE_SUFFIX};

/// Live configuration header, relative to the project directory.
pub const CONFIG_RELATIVE_PATH: &str = "src/config/device_config.h";

/// Build environments a full release covers.
pub const DEFAULT_TARGETS: [&str; 3] =
    ["esp32c3-prod", "esp32c3-prod-no-leds", "lolin32lite-no-leds"];

/// Artifacts copied out of the build tree for every target.
const BUILD_ARTIFACTS: [&str; 3] =
    ["firmware.bin", "bootloader.bin", "partitions.bin"];

/// Path of the live configuration header under `project_dir`.
pub fn config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_RELATIVE_PATH)
}

/// Settings for one release run.
#[derive(Debug, Clone)]
pub struct ReleaseConfig {
    pub project_dir: PathBuf,
    pub targets: Vec<String>,
}

impl ReleaseConfig {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Replace the default target list. An empty list keeps the defaults.
    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        if !targets.is_empty() {
            self.targets = targets;
        }
        self
    }
}

/// The per-target pipeline steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStep {
    Firmware,
    Artifacts,
    Filesystem,
    Merge,
}

impl fmt::Display for TargetStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TargetStep::Firmware => "firmware build",
            TargetStep::Artifacts => "artifact copy",
            TargetStep::Filesystem => "filesystem image",
            TargetStep::Merge => "merged image",
        };
        f.write_str(label)
    }
}

/// What happened to one build target.
#[derive(Debug)]
pub struct TargetReport {
    pub target: String,
    /// First step that failed, with the reason. `None` means every step ran.
    pub failure: Option<(TargetStep, String)>,
}

impl TargetReport {
    fn ok(target: &str) -> Self {
        Self {
            target: target.to_string(),
            failure: None,
        }
    }

    fn failed(target: &str, step: TargetStep, reason: String) -> Self {
        Self {
            target: target.to_string(),
            failure: Some((step, reason)),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Outcome of a whole release run.
///
/// A report is returned whenever the pipeline itself completed; individual
/// targets may still have failed. Conditions that abort the pipeline show up
/// as [`ReleaseError`] instead.
#[derive(Debug)]
pub struct ReleaseReport {
    pub targets: Vec<TargetReport>,
}

impl ReleaseReport {
    pub fn succeeded(&self) -> bool {
        self.targets.iter().all(TargetReport::succeeded)
    }

    pub fn failed_targets(&self) -> Vec<&str> {
        self.targets
            .iter()
            .filter(|t| !t.succeeded())
            .map(|t| t.target.as_str())
            .collect()
    }
}

/// Drives the release pipeline against a project directory, with all tool
/// processes going through the provided [`ToolRunner`].
pub struct ReleaseRunner<'p, 'r> {
    config: ReleaseConfig,
    patterns: &'p SecretPatterns,
    runner: &'r mut dyn ToolRunner,
}

impl<'p, 'r> ReleaseRunner<'p, 'r> {
    pub fn new(
        config: ReleaseConfig,
        patterns: &'p SecretPatterns,
        runner: &'r mut dyn ToolRunner,
    ) -> Self {
        Self {
            config,
            patterns,
            runner,
        }
    }

    /// Run the full pipeline.
    ///
    /// The live configuration is restored before this returns, on success
    /// and on error alike.
    pub fn run(&mut self) -> Result<ReleaseReport, ReleaseError> {
        let project_dir = self.config.project_dir.clone();
        if !project_dir.join("platformio.ini").exists() {
            return Err(ReleaseError::NotAProject(project_dir));
        }

        info!("starting firmware release in {}", project_dir.display());

        let live_path = config_path(&project_dir);
        let coordinator = BackupCoordinator::new(&live_path, self.patterns);
        coordinator.backup()?;
        let _restore = RestoreGuard::new(&coordinator);

        self.write_clean_config(&live_path)?;
        self.build_frontend()?;

        let mut targets = Vec::new();
        for target in self.config.targets.clone() {
            info!("building target {target}");
            targets.push(self.build_target(&target)?);
        }

        notes::write_release_notes(
            &project_dir.join("firmware"),
            &self.config.targets,
        );

        let report = ReleaseReport { targets };
        if report.succeeded() {
            info!("firmware release complete");
        } else {
            error!(
                "firmware release failed for: {}",
                report.failed_targets().join(", ")
            );
        }
        Ok(report)
    }

    /// Scrub the live header, write the committed template next to it, and
    /// put the scrubbed text in place for the build.
    fn write_clean_config(&self, live_path: &Path) -> Result<(), ReleaseError> {
        let original =
            fs::read_to_string(live_path).map_err(|source| ReleaseError::Io {
                path: live_path.to_path_buf(),
                source,
            })?;

        info!("scrubbing secrets from {}", live_path.display());
        let outcome = Scrubber::new(self.patterns).scrub(&original)?;
        if outcome.redactions == 0 {
            warn!("no secret values found in {}", live_path.display());
        } else {
            info!("redacted {} values", outcome.redactions);
        }

        let example_path = path_with_suffix(live_path, EXAMPLE_SUFFIX);
        fs::write(&example_path, template::render_template(&outcome.text))
            .map_err(|source| ReleaseError::Io {
                path: example_path.clone(),
                source,
            })?;
        info!("generated {}", example_path.display());

        fs::write(live_path, &outcome.text).map_err(|source| {
            ReleaseError::Io {
                path: live_path.to_path_buf(),
                source,
            }
        })?;
        info!("replaced live configuration with the scrubbed copy");
        Ok(())
    }

    /// Build the web assets that get baked into every filesystem image.
    fn build_frontend(&mut self) -> Result<(), ReleaseError> {
        info!("building frontend assets");
        match self.run_tool(Invocation::new("npm", ["run", "build"])) {
            Ok(()) => {
                info!("frontend assets built");
                Ok(())
            }
            Err(err) => {
                if let RunnerError::ToolMissing(tool) = &err {
                    if let Some(hint) = preflight::install_hint(tool) {
                        error!("'{tool}' is required: {hint}");
                    }
                }
                Err(ReleaseError::Frontend(err))
            }
        }
    }

    /// Run every step for one target, recording the first failure.
    ///
    /// Tool and artifact failures stay scoped to the target so the remaining
    /// targets still build; partition table problems abort the run.
    fn build_target(&mut self, target: &str) -> Result<TargetReport, ReleaseError> {
        if let Err(err) = self.run_tool(Invocation::new("pio", ["run", "-e", target])) {
            error!("firmware build failed for {target}: {err}");
            return Ok(TargetReport::failed(
                target,
                TargetStep::Firmware,
                err.to_string(),
            ));
        }
        if let Err(reason) = self.copy_artifacts(target) {
            warn!("{reason}");
            return Ok(TargetReport::failed(target, TargetStep::Artifacts, reason));
        }

        if let Err(err) = self.run_tool(Invocation::new(
            "pio",
            ["run", "--target", "buildfs", "-e", target],
        )) {
            error!("filesystem build failed for {target}: {err}");
            return Ok(TargetReport::failed(
                target,
                TargetStep::Filesystem,
                err.to_string(),
            ));
        }
        if let Err(reason) = self.copy_filesystem(target) {
            warn!("{reason}");
            return Ok(TargetReport::failed(target, TargetStep::Filesystem, reason));
        }

        let offset = self.filesystem_offset_for(target)?;
        if let Err(reason) = self.merge_target(target, offset) {
            warn!("merged image failed for {target}: {reason}");
            return Ok(TargetReport::failed(target, TargetStep::Merge, reason));
        }

        Ok(TargetReport::ok(target))
    }

    fn copy_artifacts(&self, target: &str) -> Result<(), String> {
        let build_dir = self.build_dir(target);
        let dest_dir = self.output_dir(target);
        fs::create_dir_all(&dest_dir).map_err(|err| {
            format!("could not create {}: {err}", dest_dir.display())
        })?;

        for name in BUILD_ARTIFACTS {
            let source = build_dir.join(name);
            if !source.exists() {
                return Err(format!("{name} not found at {}", source.display()));
            }
            let dest = dest_dir.join(name);
            fs::copy(&source, &dest)
                .map_err(|err| format!("could not copy {name}: {err}"))?;
            log_file_size("copied", &dest);
        }
        Ok(())
    }

    fn copy_filesystem(&self, target: &str) -> Result<(), String> {
        let source = self.build_dir(target).join("littlefs.bin");
        if !source.exists() {
            return Err(format!(
                "filesystem image not found at {}",
                source.display()
            ));
        }
        let dest = self.output_dir(target).join("littlefs.bin");
        fs::copy(&source, &dest)
            .map_err(|err| format!("could not copy littlefs.bin: {err}"))?;
        log_file_size("copied", &dest);
        Ok(())
    }

    /// Resolve the littlefs offset from the target's partition table.
    fn filesystem_offset_for(&self, target: &str) -> Result<FlashOffset, ReleaseError> {
        let table_path =
            partitions_file_for_target(&self.config.project_dir, target);
        let table = PartitionTable::load(&table_path).map_err(|source| {
            ReleaseError::Partition {
                table: table_path.clone(),
                source,
            }
        })?;
        table
            .filesystem_offset()
            .map_err(|source| ReleaseError::Partition {
                table: table_path,
                source,
            })
    }

    fn merge_target(
        &mut self,
        target: &str,
        filesystem_offset: FlashOffset,
    ) -> Result<(), String> {
        let build_dir = self.build_dir(target);
        let plan = MergePlan {
            chip: ChipFamily::for_target(target),
            output: self
                .output_dir(target)
                .join(format!("quill-{target}-complete.bin")),
            bootloader: build_dir.join("bootloader.bin"),
            partition_table: build_dir.join("partitions.bin"),
            application: build_dir.join("firmware.bin"),
            filesystem_offset,
            filesystem: build_dir.join("littlefs.bin"),
        };

        let missing = plan.missing_components();
        if let Some(path) = missing.first() {
            return Err(format!("required file not found: {}", path.display()));
        }

        info!("creating merged image for {target}");
        self.run_tool(plan.to_invocation())
            .map_err(|err| err.to_string())?;
        log_file_size("created merged image", &plan.output);
        Ok(())
    }

    /// Run one tool invocation in the project directory.
    fn run_tool(&mut self, invocation: Invocation) -> Result<(), RunnerError> {
        let invocation = invocation.in_dir(&self.config.project_dir);
        debug!("running: {}", invocation.display_line());
        match self.runner.run(&invocation) {
            Ok(_) => Ok(()),
            Err(err) => {
                if let RunnerError::Failed { stdout, .. } = &err {
                    if !stdout.trim().is_empty() {
                        debug!("failed step stdout:\n{stdout}");
                    }
                }
                Err(err)
            }
        }
    }

    fn build_dir(&self, target: &str) -> PathBuf {
        self.config.project_dir.join(".pio/build").join(target)
    }

    fn output_dir(&self, target: &str) -> PathBuf {
        self.config.project_dir.join("firmware").join(target)
    }
}

fn log_file_size(label: &str, path: &Path) {
    match fs::metadata(path) {
        Ok(meta) => info!(
            "{label} {} ({:.1} KB)",
            path.display(),
            meta.len() as f64 / 1024.0
        ),
        Err(_) => info!("{label} {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_to_all_targets() {
        let config = ReleaseConfig::new("/tmp/printer");
        assert_eq!(config.targets, DEFAULT_TARGETS);
    }

    #[test]
    fn test_with_targets_empty_keeps_defaults() {
        let config = ReleaseConfig::new("/tmp/printer").with_targets(Vec::new());
        assert_eq!(config.targets, DEFAULT_TARGETS);

        let config = ReleaseConfig::new("/tmp/printer")
            .with_targets(vec!["esp32c3-dev".to_string()]);
        assert_eq!(config.targets, ["esp32c3-dev"]);
    }

    #[test]
    fn test_config_path_is_the_nested_header() {
        let path = config_path(Path::new("/work/printer"));
        assert_eq!(
            path,
            Path::new("/work/printer/src/config/device_config.h")
        );
    }

    #[test]
    fn test_report_aggregation() {
        let report = ReleaseReport {
            targets: vec![
                TargetReport::ok("esp32c3-prod"),
                TargetReport::failed(
                    "lolin32lite-no-leds",
                    TargetStep::Firmware,
                    "exited with status 1".to_string(),
                ),
            ],
        };

        assert!(!report.succeeded());
        assert_eq!(report.failed_targets(), ["lolin32lite-no-leds"]);
    }

    #[test]
    fn test_step_labels_read_well_in_summaries() {
        assert_eq!(TargetStep::Firmware.to_string(), "firmware build");
        assert_eq!(TargetStep::Merge.to_string(), "merged image");
    }
}
