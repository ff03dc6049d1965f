//! Quill printer discovery simulator.
//!
//! Simulates a fleet of printers announcing themselves over MQTT so the
//! discovery UI can be exercised without real hardware. It provides:
//! - Retained status documents in the firmware's wire format
//! - Last-will registration so abrupt drops look like power losses
//! - Canned multi-printer scenarios and per-printer start/stop control

pub mod broker;
pub mod error;
pub mod fleet;
pub mod payload;
pub mod scenario;

pub use broker::BrokerSettings;
pub use error::SimError;
pub use fleet::{PrinterFleet, StopMode};
pub use payload::{OfflineStatus, PrinterStatus};
pub use scenario::ScenarioKind;
