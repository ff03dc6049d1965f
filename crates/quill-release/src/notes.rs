//! Per-target release notes.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use log::{info, warn};

const NOTES_TEMPLATE: &str = "\
# Quill Firmware Release

Built on: {build_date}
Environment: {environment}

## Files

- `quill-{environment}-complete.bin` - everything in one image: bootloader,
  partition table, application, and littlefs filesystem
- `firmware.bin` - application image only
- `bootloader.bin`, `partitions.bin`, `littlefs.bin` - individual components
  for advanced setups

## Flashing

Flash the complete image with esptool, replacing the port with your
printer's serial port:

    esptool --port <serial port> write_flash 0x0 quill-{environment}-complete.bin

See docs/quick-start.md for full flashing instructions.
";

/// Human-readable build stamp, e.g. `2026-08-24 12:30:05 UTC`.
fn build_date() -> String {
    humantime::format_rfc3339_seconds(SystemTime::now())
        .to_string()
        .replace('T', " ")
        .replace('Z', " UTC")
}

/// Write a `README.md` into each target's firmware directory.
///
/// Notes are best-effort: a target whose build failed has no directory, and
/// that must not take the rest of the release down.
pub fn write_release_notes(firmware_dir: &Path, targets: &[String]) {
    let date = build_date();
    for target in targets {
        let rendered = NOTES_TEMPLATE
            .replace("{build_date}", &date)
            .replace("{environment}", target);
        let path = firmware_dir.join(target).join("README.md");
        match fs::write(&path, rendered) {
            Ok(()) => info!("created release info: {}", path.display()),
            Err(err) => warn!("could not write {}: {err}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_notes_substitute_target_and_date() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("esp32c3-prod")).unwrap();

        write_release_notes(dir.path(), &["esp32c3-prod".to_string()]);

        let notes =
            fs::read_to_string(dir.path().join("esp32c3-prod/README.md")).unwrap();
        assert!(notes.contains("Environment: esp32c3-prod"));
        assert!(notes.contains("quill-esp32c3-prod-complete.bin"));
        assert!(notes.contains(" UTC"));
        assert!(!notes.contains("{environment}"), "all markers substituted");
        assert!(!notes.contains("{build_date}"));
    }

    #[test]
    fn test_notes_skip_missing_target_directories() {
        let dir = TempDir::new().unwrap();

        // Must not panic or create directories for targets that never built.
        write_release_notes(dir.path(), &["never-built".to_string()]);
        assert!(!dir.path().join("never-built").exists());
    }

    #[test]
    fn test_build_date_shape() {
        let date = build_date();
        assert!(date.ends_with(" UTC"), "got {date}");
        assert_eq!(date.as_bytes()[4], b'-');
        assert_eq!(date.as_bytes()[10], b' ');
    }
}
