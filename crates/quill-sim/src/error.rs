//! Error type for the simulator.

use std::fmt;

/// Simulator failures.
#[derive(Debug)]
pub enum SimError {
    /// A session with this name is already running
    PrinterAlreadyRunning(String),
    /// No running session with this name
    UnknownPrinter(String),
    /// Not one of the predefined scenario names
    UnknownScenario(String),
    /// The configured broker port is not a number in range
    InvalidPort(String),
    /// A status document failed to serialize
    Payload(String),
    /// The MQTT client rejected a request
    Mqtt(rumqttc::ClientError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::PrinterAlreadyRunning(name) => {
                write!(f, "printer {name:?} is already running")
            }
            SimError::UnknownPrinter(name) => {
                write!(f, "no running printer named {name:?}")
            }
            SimError::UnknownScenario(name) => write!(
                f,
                "unknown scenario {name:?} (expected office, home, mixed, or chaos)"
            ),
            SimError::InvalidPort(text) => write!(f, "invalid MQTT port {text:?}"),
            SimError::Payload(msg) => write!(f, "payload encoding: {msg}"),
            SimError::Mqtt(err) => write!(f, "mqtt client: {err}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Mqtt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rumqttc::ClientError> for SimError {
    fn from(err: rumqttc::ClientError) -> Self {
        SimError::Mqtt(err)
    }
}
