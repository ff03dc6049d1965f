//! Integration tests for the release pipeline.
//!
//! These run the whole pipeline over a scratch project directory with a
//! scripted tool runner, checking which external commands run, in what
//! order, and what the pipeline leaves on disk afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use quill_release::release::TargetStep;
use quill_release::runner::FakeRunner;
use quill_release::{
    BackupError, ReleaseConfig, ReleaseError, ReleaseReport, ReleaseRunner,
    SecretPatterns,
};
use tempfile::TempDir;

const SECRET_CONFIG: &str = r#"/**
 * @file device_config.h
 * @brief Configuration settings for the memo printer
 *
 */
#pragma once

static const char *defaultWifiSSID = "TestNetwork";
static const char *defaultWifiPassword = "wifi-pass-123";
static const char *defaultMqttServer = "abc123.s1.eu.hivemq.cloud";
static const char *defaultMqttUsername = "printer-admin";
static const char *defaultMqttPassword = "mqtt-pass-456";
static const char *defaultDeviceOwner = "Workshop";
static const char *defaultChatgptApiToken = "sk-proj-abcdef1234567890abcdef";
"#;

const CLEAN_CONFIG: &str = r#"static const char *defaultWifiSSID = "YOUR_WIFI_SSID";
static const char *defaultWifiPassword = "YOUR_WIFI_PASSWORD";
static const char *defaultMqttUsername = "YOUR_MQTT_USERNAME";
"#;

const PLATFORMIO_INI: &str = "\
[platformio]
default_envs = esp32c3-prod

[env:esp32c3-prod]
platform = espressif32
board = esp32-c3-devkitm-1
board_build.partitions = partitions_custom.csv

[env:lolin32lite-no-leds]
platform = espressif32
board = lolin32_lite
";

fn partition_csv(littlefs_offset: Option<&str>) -> String {
    let mut csv = String::from(
        "# Name,   Type, SubType, Offset,   Size,     Flags\n\
         nvs,      data, nvs,     0x9000,   0x5000,\n\
         app0,     app,  ota_0,   0x10000,  0x200000,\n",
    );
    if let Some(offset) = littlefs_offset {
        csv.push_str(&format!("littlefs, data, spiffs,  {offset}, 0x1F0000,\n"));
    }
    csv
}

/// Build a throwaway project directory: platformio.ini, partition tables,
/// a secret-bearing configuration, and the build artifacts the (scripted)
/// pio runs would have produced.
fn setup_project(targets: &[&str]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("printer");
    fs::create_dir_all(project.join("src/config")).unwrap();

    fs::write(project.join("platformio.ini"), PLATFORMIO_INI).unwrap();
    fs::write(
        project.join("partitions_custom.csv"),
        partition_csv(Some("0x210000")),
    )
    .unwrap();
    fs::write(
        project.join("partitions_no_ota.csv"),
        partition_csv(Some("0x290000")),
    )
    .unwrap();
    fs::write(project.join("src/config/device_config.h"), SECRET_CONFIG).unwrap();

    for target in targets {
        seed_build_artifacts(&project, target);
    }
    (dir, project)
}

fn seed_build_artifacts(project: &Path, target: &str) {
    let build_dir = project.join(".pio/build").join(target);
    fs::create_dir_all(&build_dir).unwrap();
    for name in [
        "firmware.bin",
        "bootloader.bin",
        "partitions.bin",
        "littlefs.bin",
    ] {
        fs::write(build_dir.join(name), format!("{target}:{name}")).unwrap();
    }
}

fn run_release(
    project: &Path,
    targets: &[&str],
    runner: &mut FakeRunner,
) -> Result<ReleaseReport, ReleaseError> {
    let patterns = SecretPatterns::standard();
    let config = ReleaseConfig::new(project)
        .with_targets(targets.iter().map(|t| t.to_string()).collect());
    ReleaseRunner::new(config, &patterns, runner).run()
}

#[test_log::test]
fn test_release_runs_tools_in_pipeline_order() {
    let targets = ["esp32c3-prod", "lolin32lite-no-leds"];
    let (_dir, project) = setup_project(&targets);
    let mut runner = FakeRunner::new();

    let report = run_release(&project, &targets, &mut runner).unwrap();
    assert!(report.succeeded(), "all targets should build: {report:?}");

    // Frontend once, then firmware / filesystem / merge per target.
    let lines = runner.call_lines();
    assert_eq!(lines[0], "npm run build");
    assert_eq!(lines[1], "pio run -e esp32c3-prod");
    assert_eq!(lines[2], "pio run --target buildfs -e esp32c3-prod");
    assert!(
        lines[3].starts_with("esptool --chip ESP32C3 merge-bin"),
        "got {}",
        lines[3]
    );
    assert_eq!(lines[4], "pio run -e lolin32lite-no-leds");
    assert_eq!(lines[5], "pio run --target buildfs -e lolin32lite-no-leds");
    assert!(
        lines[6].starts_with("esptool --chip ESP32 merge-bin"),
        "got {}",
        lines[6]
    );
    assert_eq!(lines.len(), 7, "no extra tool runs: {lines:?}");
}

#[test_log::test]
fn test_release_copies_artifacts_and_writes_notes() {
    let (_dir, project) = setup_project(&["esp32c3-prod"]);
    let mut runner = FakeRunner::new();

    run_release(&project, &["esp32c3-prod"], &mut runner).unwrap();

    let out = project.join("firmware/esp32c3-prod");
    for name in [
        "firmware.bin",
        "bootloader.bin",
        "partitions.bin",
        "littlefs.bin",
    ] {
        assert!(out.join(name).exists(), "{name} should be copied to {out:?}");
    }

    let notes = fs::read_to_string(out.join("README.md")).unwrap();
    assert!(notes.contains("Environment: esp32c3-prod"));
    assert!(notes.contains("quill-esp32c3-prod-complete.bin"));
}

#[test_log::test]
fn test_release_scrubs_and_restores_the_live_config() {
    let (_dir, project) = setup_project(&["esp32c3-prod"]);
    let live = project.join("src/config/device_config.h");
    let mut runner = FakeRunner::new();

    run_release(&project, &["esp32c3-prod"], &mut runner).unwrap();

    // The original values are back, and the backup that protected them
    // is still on disk.
    assert_eq!(fs::read_to_string(&live).unwrap(), SECRET_CONFIG);
    let backup = project.join("src/config/device_config.h.orig");
    assert_eq!(fs::read_to_string(&backup).unwrap(), SECRET_CONFIG);

    // The committed template carries placeholders, never the real values.
    let example =
        fs::read_to_string(project.join("src/config/device_config.h.example"))
            .unwrap();
    assert!(example.contains("YOUR_WIFI_SSID"));
    assert!(example.contains("INSTRUCTIONS:"));
    assert!(!example.contains("TestNetwork"), "ssid leaked into template");
    assert!(!example.contains("wifi-pass-123"), "password leaked into template");
    assert!(!example.contains("sk-proj-"), "api key leaked into template");
}

#[test_log::test]
fn test_partition_tables_resolve_per_target() {
    let targets = ["esp32c3-prod", "lolin32lite-no-leds"];
    let (_dir, project) = setup_project(&targets);
    let mut runner = FakeRunner::new();

    run_release(&project, &targets, &mut runner).unwrap();

    let lines = runner.call_lines();
    let c3_merge = lines
        .iter()
        .find(|l| l.contains("quill-esp32c3-prod-complete.bin"))
        .expect("c3 merge ran");
    let classic_merge = lines
        .iter()
        .find(|l| l.contains("quill-lolin32lite-no-leds-complete.bin"))
        .expect("classic merge ran");

    // esp32c3-prod names its own table in platformio.ini; the other target
    // falls back to partitions_no_ota.csv. The two tables place littlefs at
    // different offsets, so the argv shows which one was read.
    assert!(c3_merge.contains(" 0x210000 "), "named table offset: {c3_merge}");
    assert!(
        classic_merge.contains(" 0x290000 "),
        "fallback table offset: {classic_merge}"
    );

    // Bootloader addresses differ per chip family.
    assert!(c3_merge.contains(" 0x0 "), "c3 boots from 0x0: {c3_merge}");
    assert!(
        classic_merge.contains(" 0x1000 "),
        "classic esp32 boots from 0x1000: {classic_merge}"
    );
}

#[test_log::test]
fn test_frontend_failure_aborts_and_restores() {
    let (_dir, project) = setup_project(&["esp32c3-prod"]);
    let live = project.join("src/config/device_config.h");
    let mut runner = FakeRunner::new();
    runner.fail_matching("npm run build", 1, "vite: out of memory");

    let err = run_release(&project, &["esp32c3-prod"], &mut runner).unwrap_err();
    assert!(matches!(err, ReleaseError::Frontend(_)), "got {err:?}");

    // No firmware step ran, and the user's configuration is back.
    assert!(
        runner.call_lines().iter().all(|l| !l.starts_with("pio")),
        "no pio run after a frontend failure: {:?}",
        runner.call_lines()
    );
    assert_eq!(fs::read_to_string(&live).unwrap(), SECRET_CONFIG);
}

#[test_log::test]
fn test_target_failure_does_not_stop_other_targets() {
    let targets = ["esp32c3-prod", "lolin32lite-no-leds"];
    let (_dir, project) = setup_project(&targets);
    let mut runner = FakeRunner::new();
    runner.fail_matching("pio run -e esp32c3-prod", 1, "region `iram0' overflowed");

    let report = run_release(&project, &targets, &mut runner).unwrap();

    assert!(!report.succeeded());
    assert_eq!(report.failed_targets(), ["esp32c3-prod"]);
    let (step, _) = report.targets[0].failure.as_ref().unwrap();
    assert_eq!(*step, TargetStep::Firmware);

    let lines = runner.call_lines();
    assert!(
        !lines.iter().any(|l| l.contains("buildfs -e esp32c3-prod")),
        "failed target stops at its first broken step"
    );
    assert!(lines.contains(&"pio run -e lolin32lite-no-leds".to_string()));
    assert!(
        lines
            .iter()
            .any(|l| l.contains("quill-lolin32lite-no-leds-complete.bin")),
        "the other target still packages"
    );
}

#[test_log::test]
fn test_missing_filesystem_image_fails_only_that_target() {
    let targets = ["esp32c3-prod", "lolin32lite-no-leds"];
    let (_dir, project) = setup_project(&targets);
    fs::remove_file(project.join(".pio/build/esp32c3-prod/littlefs.bin")).unwrap();
    let mut runner = FakeRunner::new();

    let report = run_release(&project, &targets, &mut runner).unwrap();

    assert_eq!(report.failed_targets(), ["esp32c3-prod"]);
    let (step, reason) = report.targets[0].failure.as_ref().unwrap();
    assert_eq!(*step, TargetStep::Filesystem);
    assert!(reason.contains("littlefs.bin"), "reason names the artifact: {reason}");
    assert!(
        !runner
            .call_lines()
            .iter()
            .any(|l| l.contains("esp32c3-prod-complete.bin")),
        "no merge without a filesystem image"
    );
}

#[test_log::test]
fn test_missing_build_tool_is_reported_per_target() {
    let (_dir, project) = setup_project(&["esp32c3-prod"]);
    let mut runner = FakeRunner::new();
    runner.missing_tool("pio");

    let report = run_release(&project, &["esp32c3-prod"], &mut runner).unwrap();

    assert_eq!(report.failed_targets(), ["esp32c3-prod"]);
    let (step, reason) = report.targets[0].failure.as_ref().unwrap();
    assert_eq!(*step, TargetStep::Firmware);
    assert!(reason.contains("pio"), "reason names the tool: {reason}");
}

#[test_log::test]
fn test_clean_live_config_without_backup_refuses_to_run() {
    let (_dir, project) = setup_project(&["esp32c3-prod"]);
    let live = project.join("src/config/device_config.h");
    fs::write(&live, CLEAN_CONFIG).unwrap();
    let mut runner = FakeRunner::new();

    let err = run_release(&project, &["esp32c3-prod"], &mut runner).unwrap_err();

    assert!(
        matches!(err, ReleaseError::Backup(BackupError::DataLossRisk(_))),
        "got {err:?}"
    );
    assert!(runner.calls().is_empty(), "nothing may run after a refusal");
    assert_eq!(
        fs::read_to_string(&live).unwrap(),
        CLEAN_CONFIG,
        "the only copy is left untouched"
    );
}

#[test_log::test]
fn test_partition_table_without_littlefs_aborts_the_run() {
    let (_dir, project) = setup_project(&["lolin32lite-no-leds"]);
    // The fallback table this target resolves to has no filesystem row.
    fs::write(project.join("partitions_no_ota.csv"), partition_csv(None)).unwrap();
    let live = project.join("src/config/device_config.h");
    let mut runner = FakeRunner::new();

    let err =
        run_release(&project, &["lolin32lite-no-leds"], &mut runner).unwrap_err();

    assert!(matches!(err, ReleaseError::Partition { .. }), "got {err:?}");
    assert_eq!(
        fs::read_to_string(&live).unwrap(),
        SECRET_CONFIG,
        "an aborted run still restores the configuration"
    );
}

#[test_log::test]
fn test_release_requires_a_project_directory() {
    let dir = TempDir::new().unwrap();
    let mut runner = FakeRunner::new();

    let err = run_release(dir.path(), &["esp32c3-prod"], &mut runner).unwrap_err();

    assert!(matches!(err, ReleaseError::NotAProject(_)), "got {err:?}");
    assert!(runner.calls().is_empty());
}
