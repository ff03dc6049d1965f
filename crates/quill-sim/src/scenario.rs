//! Predefined fleet scenarios.
//!
//! Each scenario scripts a small network: who powers on, in what order,
//! and who drops out. Printers a scenario starts stay connected when it
//! returns, so the discovery UI can be inspected afterwards.

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use log::info;

use crate::error::SimError;
use crate::fleet::{PrinterFleet, StopMode};

/// The canned test scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Office,
    Home,
    Mixed,
    Chaos,
}

pub const ALL_SCENARIOS: [ScenarioKind; 4] = [
    ScenarioKind::Office,
    ScenarioKind::Home,
    ScenarioKind::Mixed,
    ScenarioKind::Chaos,
];

impl ScenarioKind {
    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Office => "office",
            ScenarioKind::Home => "home",
            ScenarioKind::Mixed => "mixed",
            ScenarioKind::Chaos => "chaos",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ScenarioKind::Office => {
                "four office printers with different firmware versions"
            }
            ScenarioKind::Home => "small home setup with two printers",
            ScenarioKind::Mixed => "stable and unstable printers with a dropout",
            ScenarioKind::Chaos => "five printers in a rapid start/stop cycle",
        }
    }

    /// (name, firmware) roster for the fixed-fleet scenarios. The staged
    /// scenarios script their own timing in [`run`].
    pub fn roster(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ScenarioKind::Office => &[
                ("Reception", "1.0.0"),
                ("Alice", "1.1.0"),
                ("Bob", "1.0.0"),
                ("DevTeam", "1.2.0-beta"),
            ],
            ScenarioKind::Home => &[("Kitchen", "1.0.0"), ("Study", "1.1.0")],
            ScenarioKind::Mixed | ScenarioKind::Chaos => &[],
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "office" => Ok(ScenarioKind::Office),
            "home" => Ok(ScenarioKind::Home),
            "mixed" => Ok(ScenarioKind::Mixed),
            "chaos" => Ok(ScenarioKind::Chaos),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}

/// Run one scenario against the fleet.
pub fn run(kind: ScenarioKind, fleet: &mut PrinterFleet) -> Result<(), SimError> {
    info!("running scenario {kind}: {}", kind.description());
    match kind {
        ScenarioKind::Office | ScenarioKind::Home => {
            for (i, (name, firmware)) in kind.roster().iter().enumerate() {
                fleet.start(name, firmware, 101 + i as u8)?;
                thread::sleep(Duration::from_millis(500));
            }
        }
        ScenarioKind::Mixed => {
            fleet.start("Stable", "1.0.0", 101)?;
            thread::sleep(Duration::from_secs(1));
            fleet.start("Unstable", "1.1.0", 102)?;
            thread::sleep(Duration::from_secs(2));
            info!("simulating a network dropout");
            fleet.stop("Unstable", StopMode::Graceful)?;
            thread::sleep(Duration::from_secs(1));
            fleet.start("AnotherStable", "1.2.0", 103)?;
        }
        ScenarioKind::Chaos => {
            for i in 0..5u8 {
                fleet.start(&format!("Chaos{i}"), &format!("1.{i}.0"), 120 + i)?;
                thread::sleep(Duration::from_millis(200));
            }
            thread::sleep(Duration::from_secs(2));
            info!("starting chaos disconnections");
            for i in 0..5u8 {
                fleet.stop(&format!("Chaos{i}"), StopMode::Graceful)?;
                thread::sleep(Duration::from_millis(300));
            }
        }
    }
    Ok(())
}
