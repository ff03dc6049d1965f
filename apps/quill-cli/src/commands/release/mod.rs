use std::path::Path;

use anyhow::{bail, Context, Result};

use quill_release::release::{self, ReleaseConfig, ReleaseRunner};
use quill_release::runner::SystemRunner;
use quill_release::{BackupCoordinator, BackupError, SecretPatterns};

pub mod args;

pub use args::ReleaseArgs;

pub fn handle_release(args: ReleaseArgs) -> Result<()> {
    if args.recover {
        return recover_configuration(&args.project_dir);
    }

    let patterns = SecretPatterns::standard();
    let config =
        ReleaseConfig::new(&args.project_dir).with_targets(args.target);
    let mut runner = SystemRunner;
    let report = ReleaseRunner::new(config, &patterns, &mut runner).run()?;

    println!();
    println!("Release summary:");
    for target in &report.targets {
        match &target.failure {
            None => println!("  {:<24} ok", target.target),
            Some((step, reason)) => {
                println!("  {:<24} failed at {step}: {reason}", target.target);
            }
        }
    }

    if !report.succeeded() {
        bail!(
            "{} of {} targets failed",
            report.failed_targets().len(),
            report.targets.len()
        );
    }
    Ok(())
}

/// Put the backed-up configuration back after an interrupted run.
///
/// Refuses a backup that itself looks scrubbed, pointing at any timestamped
/// copies instead, so a bad state never overwrites the only remaining copy
/// of the real values.
fn recover_configuration(project_dir: &Path) -> Result<()> {
    let live_path = release::config_path(project_dir);
    let patterns = SecretPatterns::standard();
    let coordinator = BackupCoordinator::new(&live_path, &patterns);

    match coordinator.recover() {
        Ok(()) => {
            println!(
                "Restored {} from {}",
                live_path.display(),
                coordinator.backup_path().display()
            );
            Ok(())
        }
        Err(BackupError::BackupLooksClean { backup, timestamped }) => {
            println!(
                "{} already looks scrubbed; not restoring it over the live file.",
                backup.display()
            );
            if timestamped.is_empty() {
                println!("No timestamped copies were found either.");
            } else {
                println!("Timestamped copies that may hold the real values:");
                for copy in &timestamped {
                    println!("  {}", copy.display());
                }
            }
            bail!("recovery refused");
        }
        Err(err) => Err(err).context("configuration recovery failed"),
    }
}
