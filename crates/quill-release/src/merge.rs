//! Merged flashable image planning.
//!
//! A release ships one `…-complete.bin` per target holding bootloader,
//! partition table, application, and littlefs image at their flash offsets,
//! so users flash a single file instead of four.

use std::path::{Path, PathBuf};

use crate::partition::FlashOffset;
use crate::runner::Invocation;

/// Where the partition table lives on every supported chip.
pub const PARTITION_TABLE_OFFSET: FlashOffset = FlashOffset(0x8000);

/// Where the application image lives on every supported chip.
pub const APPLICATION_OFFSET: FlashOffset = FlashOffset(0x10000);

/// Chip families the printer firmware ships on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipFamily {
    Esp32,
    Esp32C3,
}

impl ChipFamily {
    /// RISC-V C3 targets are named `esp32c3…`; everything else builds for a
    /// classic ESP32 board.
    pub fn for_target(target: &str) -> ChipFamily {
        if target.starts_with("esp32c3") {
            ChipFamily::Esp32C3
        } else {
            ChipFamily::Esp32
        }
    }

    /// `--chip` argument for the merge tool.
    pub fn chip_arg(self) -> &'static str {
        match self {
            ChipFamily::Esp32 => "ESP32",
            ChipFamily::Esp32C3 => "ESP32C3",
        }
    }

    /// Second-stage bootloader offset. The C3 boots from the start of
    /// flash; the classic ESP32 reserves the first sector.
    pub fn bootloader_offset(self) -> FlashOffset {
        match self {
            ChipFamily::Esp32 => FlashOffset(0x1000),
            ChipFamily::Esp32C3 => FlashOffset(0x0),
        }
    }
}

/// Everything needed to produce one merged image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub chip: ChipFamily,
    pub output: PathBuf,
    pub bootloader: PathBuf,
    pub partition_table: PathBuf,
    pub application: PathBuf,
    pub filesystem_offset: FlashOffset,
    pub filesystem: PathBuf,
}

impl MergePlan {
    /// The four components in flash order, with their offsets.
    pub fn components(&self) -> [(FlashOffset, &Path); 4] {
        [
            (self.chip.bootloader_offset(), self.bootloader.as_path()),
            (PARTITION_TABLE_OFFSET, self.partition_table.as_path()),
            (APPLICATION_OFFSET, self.application.as_path()),
            (self.filesystem_offset, self.filesystem.as_path()),
        ]
    }

    /// Component files not present on disk. A merge with missing inputs
    /// would produce a corrupt image, so callers check this first.
    pub fn missing_components(&self) -> Vec<PathBuf> {
        self.components()
            .iter()
            .filter(|(_, path)| !path.exists())
            .map(|(_, path)| path.to_path_buf())
            .collect()
    }

    /// The full merge tool command line.
    pub fn to_invocation(&self) -> Invocation {
        let mut args = vec![
            "--chip".to_string(),
            self.chip.chip_arg().to_string(),
            "merge-bin".to_string(),
            "-o".to_string(),
            self.output.display().to_string(),
            "--flash-mode".to_string(),
            "dio".to_string(),
            "--flash-size".to_string(),
            "4MB".to_string(),
        ];
        for (offset, path) in self.components() {
            args.push(offset.to_string());
            args.push(path.display().to_string());
        }
        Invocation::new("esptool", args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_chip_family_from_target_name() {
        assert_eq!(ChipFamily::for_target("esp32c3-prod"), ChipFamily::Esp32C3);
        assert_eq!(
            ChipFamily::for_target("esp32c3-prod-no-leds"),
            ChipFamily::Esp32C3
        );
        assert_eq!(
            ChipFamily::for_target("lolin32lite-no-leds"),
            ChipFamily::Esp32
        );
    }

    #[test]
    fn test_bootloader_offsets() {
        assert_eq!(ChipFamily::Esp32C3.bootloader_offset(), FlashOffset(0x0));
        assert_eq!(ChipFamily::Esp32.bootloader_offset(), FlashOffset(0x1000));
    }

    fn sample_plan(chip: ChipFamily, base: &Path) -> MergePlan {
        MergePlan {
            chip,
            output: base.join("quill-esp32c3-prod-complete.bin"),
            bootloader: base.join("bootloader.bin"),
            partition_table: base.join("partitions.bin"),
            application: base.join("firmware.bin"),
            filesystem_offset: FlashOffset(0x210000),
            filesystem: base.join("littlefs.bin"),
        }
    }

    #[test]
    fn test_invocation_argument_order() {
        let plan = sample_plan(ChipFamily::Esp32C3, Path::new("out"));
        let invocation = plan.to_invocation();

        assert_eq!(invocation.program, "esptool");
        assert_eq!(
            invocation.args,
            vec![
                "--chip",
                "ESP32C3",
                "merge-bin",
                "-o",
                "out/quill-esp32c3-prod-complete.bin",
                "--flash-mode",
                "dio",
                "--flash-size",
                "4MB",
                "0x0",
                "out/bootloader.bin",
                "0x8000",
                "out/partitions.bin",
                "0x10000",
                "out/firmware.bin",
                "0x210000",
                "out/littlefs.bin",
            ]
        );
    }

    #[test]
    fn test_classic_esp32_bootloader_address_in_args() {
        let plan = sample_plan(ChipFamily::Esp32, Path::new("out"));
        let args = plan.to_invocation().args;

        let chip_at = args.iter().position(|a| a == "ESP32").unwrap();
        assert_eq!(chip_at, 1);
        assert!(args.contains(&"0x1000".to_string()));
    }

    #[test]
    fn test_missing_components_lists_absent_files() {
        let dir = TempDir::new().unwrap();
        let plan = sample_plan(ChipFamily::Esp32C3, dir.path());

        fs::write(&plan.bootloader, b"boot").unwrap();
        fs::write(&plan.partition_table, b"part").unwrap();
        fs::write(&plan.application, b"app").unwrap();

        let missing = plan.missing_components();
        assert_eq!(missing, vec![plan.filesystem.clone()]);

        fs::write(&plan.filesystem, b"fs").unwrap();
        assert!(plan.missing_components().is_empty());
    }
}
