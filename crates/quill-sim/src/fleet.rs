//! Concurrent simulated printer sessions.
//!
//! Each printer is its own MQTT client with its own last-will registration,
//! driven by a dedicated event-drain thread, so sessions come and go
//! independently just like real devices on a network.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use rumqttc::{Client, Connection, Event, LastWill, Packet, QoS};
use serde::Serialize;

use crate::broker::BrokerSettings;
use crate::error::SimError;
use crate::payload::{OfflineStatus, PrinterStatus};

/// How a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopMode {
    /// Publish a retained offline status, then disconnect cleanly. The
    /// broker discards the will.
    Graceful,
    /// Drop the connection without a DISCONNECT packet. The broker fires
    /// the will, the way it would for a power loss.
    Abrupt,
}

struct PrinterSession {
    status: PrinterStatus,
    client: Client,
    drain: Option<JoinHandle<()>>,
}

/// All currently simulated printers, keyed by name.
pub struct PrinterFleet {
    settings: BrokerSettings,
    sessions: HashMap<String, PrinterSession>,
}

impl PrinterFleet {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            sessions: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Names of the running printers, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sessions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Status documents of the running printers, sorted by name.
    pub fn statuses(&self) -> Vec<&PrinterStatus> {
        let mut all: Vec<&PrinterStatus> =
            self.sessions.values().map(|s| &s.status).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Start a printer session and publish its retained online status.
    pub fn start(
        &mut self,
        name: &str,
        firmware_version: &str,
        ip_suffix: u8,
    ) -> Result<(), SimError> {
        if self.sessions.contains_key(name) {
            return Err(SimError::PrinterAlreadyRunning(name.to_string()));
        }

        let status = PrinterStatus::online(name, firmware_version, ip_suffix);
        let topic = status.topic();
        let will_payload = encode(&OfflineStatus::for_printer(name))?;
        let will = LastWill::new(topic.as_str(), will_payload, QoS::AtLeastOnce, true);

        let client_id =
            format!("QuillPrinter-{}", rand::rng().random_range(1000..10000));
        info!(
            "{name}: connecting to {}:{} as {client_id}",
            self.settings.host, self.settings.port
        );
        let options = self.settings.mqtt_options(&client_id, will);
        let (client, connection) = Client::new(options, 10);

        let drain = Some(spawn_drain(name.to_string(), connection));

        client.publish(topic.as_str(), QoS::AtLeastOnce, true, encode(&status)?)?;
        info!(
            "{name}: status published to {topic} (ip {}, firmware {firmware_version})",
            status.ip_address
        );

        self.sessions.insert(
            name.to_string(),
            PrinterSession {
                status,
                client,
                drain,
            },
        );
        Ok(())
    }

    /// Stop one printer.
    pub fn stop(&mut self, name: &str, mode: StopMode) -> Result<(), SimError> {
        let mut session = self
            .sessions
            .remove(name)
            .ok_or_else(|| SimError::UnknownPrinter(name.to_string()))?;

        match mode {
            StopMode::Graceful => {
                let offline = encode(&OfflineStatus::for_printer(name))?;
                session.client.publish(
                    session.status.topic().as_str(),
                    QoS::AtLeastOnce,
                    true,
                    offline,
                )?;
                info!("{name}: retained offline status published");
                // Let the event loop flush the publish before the
                // disconnect request lands behind it.
                thread::sleep(Duration::from_millis(500));
                session.client.disconnect()?;
                info!("{name}: disconnected cleanly");
            }
            StopMode::Abrupt => {
                info!("{name}: dropping the connection, the broker fires the will");
                drop(session.client);
            }
        }

        if let Some(handle) = session.drain.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    /// Republish a printer's full status document with a new status value.
    pub fn update_status(&mut self, name: &str, status: &str) -> Result<(), SimError> {
        let session = self
            .sessions
            .get_mut(name)
            .ok_or_else(|| SimError::UnknownPrinter(name.to_string()))?;

        session.status.status = status.to_string();
        let payload = encode(&session.status)?;
        session.client.publish(
            session.status.topic().as_str(),
            QoS::AtLeastOnce,
            true,
            payload,
        )?;
        info!("{name}: status updated to {status:?}");
        Ok(())
    }

    /// Stop every printer. Failures are logged so one dead session cannot
    /// strand the rest.
    pub fn stop_all(&mut self, mode: StopMode) {
        for name in self.names() {
            if let Err(err) = self.stop(&name, mode) {
                warn!("{name}: stop failed: {err}");
            }
        }
    }
}

/// Drive the MQTT event loop for one session until the connection ends.
fn spawn_drain(name: String, mut connection: Connection) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("{name}: connected");
                }
                Ok(event) => debug!("{name}: {event:?}"),
                Err(err) => {
                    debug!("{name}: connection ended: {err}");
                    break;
                }
            }
        }
    })
}

fn encode<T: Serialize>(document: &T) -> Result<String, SimError> {
    serde_json::to_string(document).map_err(|err| SimError::Payload(err.to_string()))
}
