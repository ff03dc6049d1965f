//! Partition table parsing and filesystem offset resolution.
//!
//! The merge step needs to know where the littlefs image goes. That offset
//! lives in the board project's partition CSV, which in turn is named per
//! build environment in `platformio.ini`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::PartitionError;

/// Partition CSV the build falls back to when an environment does not name
/// its own table.
pub const FALLBACK_PARTITIONS: &str = "partitions_no_ota.csv";

/// A flash offset. Displays in canonical lower-case `0x…` hex no matter
/// which notation the table used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlashOffset(pub u64);

impl FlashOffset {
    /// Parse `0x…`/`0X…` hex or plain decimal text.
    pub fn parse(text: &str) -> Option<FlashOffset> {
        let text = text.trim();
        if let Some(hex) = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
        {
            u64::from_str_radix(hex, 16).ok().map(FlashOffset)
        } else {
            text.parse::<u64>().ok().map(FlashOffset)
        }
    }
}

impl fmt::Display for FlashOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// One data row of the partition CSV. Offset and size are kept as written;
/// only the row the caller asks about needs to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRow {
    pub name: String,
    pub kind: String,
    pub subtype: String,
    pub offset: String,
    pub size: String,
}

/// An ESP-IDF style partition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionTable {
    rows: Vec<PartitionRow>,
}

impl PartitionTable {
    /// Parse CSV text. Comment lines (`#`), blank lines, and rows with too
    /// few columns are skipped; extra columns (flags) are ignored.
    pub fn parse(text: &str) -> PartitionTable {
        let mut rows = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 5 {
                continue;
            }
            rows.push(PartitionRow {
                name: fields[0].to_string(),
                kind: fields[1].to_string(),
                subtype: fields[2].to_string(),
                offset: fields[3].to_string(),
                size: fields[4].to_string(),
            });
        }
        PartitionTable { rows }
    }

    pub fn load(path: &Path) -> Result<PartitionTable, PartitionError> {
        let text = fs::read_to_string(path).map_err(|source| PartitionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(PartitionTable::parse(&text))
    }

    pub fn rows(&self) -> &[PartitionRow] {
        &self.rows
    }

    /// Offset of the littlefs partition, matched case-insensitively on the
    /// row name. There is no guessed default: a table without that row
    /// cannot produce a flashable merged image.
    pub fn filesystem_offset(&self) -> Result<FlashOffset, PartitionError> {
        let row = self
            .rows
            .iter()
            .find(|row| row.name.eq_ignore_ascii_case("littlefs"))
            .ok_or(PartitionError::PartitionNotFound)?;

        FlashOffset::parse(&row.offset).ok_or_else(|| PartitionError::InvalidOffset {
            row: row.name.clone(),
            text: row.offset.clone(),
        })
    }
}

/// Resolve the partition CSV for a build target from `platformio.ini`.
///
/// Lazy scan: the first `board_build.partitions` key after the target's
/// section header wins. Falls back to [`FALLBACK_PARTITIONS`] when the key
/// is absent or names a file that does not exist.
pub fn partitions_file_for_target(project_dir: &Path, target: &str) -> PathBuf {
    let fallback = project_dir.join(FALLBACK_PARTITIONS);

    let ini_path = project_dir.join("platformio.ini");
    let Ok(content) = fs::read_to_string(&ini_path) else {
        return fallback;
    };

    let pattern = format!(
        r"\[env:{}\][\s\S]*?board_build\.partitions\s*=\s*(.+)",
        regex::escape(target)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return fallback;
    };

    if let Some(caps) = re.captures(&content) {
        let candidate = project_dir.join(caps[1].trim());
        if candidate.exists() {
            return candidate;
        }
    }
    fallback
}
