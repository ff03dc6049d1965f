//! Printer status documents.
//!
//! Field names and formats match what the firmware publishes, so anything
//! listening for real printers accepts the simulated ones as-is.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Topic prefix all printer status messages are published under.
pub const TOPIC_PREFIX: &str = "quill/printer-status";

/// `quill-kitchen` for a printer named `Kitchen`.
pub fn printer_id(name: &str) -> String {
    format!("quill-{}", name.to_lowercase())
}

/// Retained status topic for one printer.
pub fn status_topic(name: &str) -> String {
    format!("{TOPIC_PREFIX}/{}", name.to_lowercase())
}

/// The full status document a powered-on printer publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub name: String,
    pub firmware_version: String,
    pub mdns: String,
    pub ip_address: String,
    pub status: String,
    pub last_power_on: String,
    pub timezone: String,
}

impl PrinterStatus {
    /// Status document for a printer that just powered on. The simulated
    /// device lives at `192.168.1.<ip_suffix>`.
    pub fn online(name: &str, firmware_version: &str, ip_suffix: u8) -> Self {
        Self {
            name: name.to_string(),
            firmware_version: firmware_version.to_string(),
            mdns: format!("{}.local", printer_id(name)),
            ip_address: format!("192.168.1.{ip_suffix}"),
            status: "online".to_string(),
            last_power_on: power_on_stamp(),
            timezone: "Europe/London".to_string(),
        }
    }

    pub fn topic(&self) -> String {
        status_topic(&self.name)
    }
}

/// The minimal document published when a printer goes away. The last will
/// and a graceful shutdown both use this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineStatus {
    pub name: String,
    pub status: String,
}

impl OfflineStatus {
    pub fn for_printer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: "offline".to_string(),
        }
    }
}

/// RFC 3339 UTC seconds, e.g. `2025-08-12T19:01:09Z`, matching the boot
/// timestamp the firmware reports.
fn power_on_stamp() -> String {
    humantime::format_rfc3339_seconds(SystemTime::now()).to_string()
}
