//! Broker connection settings.
//!
//! Settings come from `QUILL_MQTT_*` environment variables with CLI flags
//! layered on top, so credentials never live in the source tree.

use std::env;
use std::time::Duration;

use rumqttc::{LastWill, MqttOptions, TlsConfiguration, Transport};

use crate::error::SimError;

pub const ENV_HOST: &str = "QUILL_MQTT_HOST";
pub const ENV_PORT: &str = "QUILL_MQTT_PORT";
pub const ENV_USERNAME: &str = "QUILL_MQTT_USERNAME";
pub const ENV_PASSWORD: &str = "QUILL_MQTT_PASSWORD";
pub const ENV_TLS: &str = "QUILL_MQTT_TLS";

fn default_port(tls: bool) -> u16 {
    if tls { 8883 } else { 1883 }
}

/// Where and how the simulated printers connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: default_port(false),
            username: None,
            password: None,
            tls: false,
        }
    }
}

impl BrokerSettings {
    /// Settings from the `QUILL_MQTT_*` environment, falling back to a
    /// local unauthenticated broker.
    pub fn from_env() -> Result<Self, SimError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SimError> {
        let tls = lookup(ENV_TLS)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");
        let port = match lookup(ENV_PORT) {
            Some(text) => text.parse().map_err(|_| SimError::InvalidPort(text))?,
            None => default_port(tls),
        };
        Ok(Self {
            host: lookup(ENV_HOST).unwrap_or_else(|| "localhost".to_string()),
            port,
            username: lookup(ENV_USERNAME).filter(|v| !v.is_empty()),
            password: lookup(ENV_PASSWORD).filter(|v| !v.is_empty()),
            tls,
        })
    }

    /// Layer command-line flags over these settings. An explicit port always
    /// wins; flipping only the TLS flag swaps a default port for the other
    /// default, so `--no-tls` against an 8883 default lands on 1883.
    pub fn merge_cli(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        tls: Option<bool>,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(username) = username {
            self.username = Some(username);
        }
        if let Some(password) = password {
            self.password = Some(password);
        }
        if let Some(tls) = tls {
            if self.port == default_port(self.tls) {
                self.port = default_port(tls);
            }
            self.tls = tls;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// rumqttc options for one printer session.
    pub fn mqtt_options(&self, client_id: &str, will: LastWill) -> MqttOptions {
        let mut options =
            MqttOptions::new(client_id, self.host.as_str(), self.port);
        options.set_keep_alive(Duration::from_secs(60));
        options.set_last_will(will);
        if let Some(user) = &self.username {
            let password = self.password.clone().unwrap_or_default();
            options.set_credentials(user.as_str(), password);
        }
        if self.tls {
            options.set_transport(Transport::Tls(TlsConfiguration::Native));
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_a_local_plain_broker() {
        let settings = BrokerSettings::default();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 1883);
        assert!(!settings.tls);
        assert!(settings.username.is_none());
    }

    #[test]
    fn test_environment_supplies_all_fields() {
        let settings = BrokerSettings::from_lookup(lookup_from(&[
            (ENV_HOST, "broker.lan"),
            (ENV_PORT, "1884"),
            (ENV_USERNAME, "printer"),
            (ENV_PASSWORD, "hunter2"),
            (ENV_TLS, "true"),
        ]))
        .unwrap();

        assert_eq!(settings.host, "broker.lan");
        assert_eq!(settings.port, 1884);
        assert_eq!(settings.username.as_deref(), Some("printer"));
        assert_eq!(settings.password.as_deref(), Some("hunter2"));
        assert!(settings.tls);
    }

    #[test]
    fn test_tls_changes_the_default_port() {
        let settings =
            BrokerSettings::from_lookup(lookup_from(&[(ENV_TLS, "1")])).unwrap();
        assert_eq!(settings.port, 8883);
        assert!(settings.tls);
    }

    #[test]
    fn test_empty_credentials_count_as_unset() {
        let settings = BrokerSettings::from_lookup(lookup_from(&[
            (ENV_USERNAME, ""),
            (ENV_PASSWORD, ""),
        ]))
        .unwrap();
        assert!(settings.username.is_none());
        assert!(settings.password.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = BrokerSettings::from_lookup(lookup_from(&[(ENV_PORT, "http")]))
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidPort(text) if text == "http"));
    }

    #[test]
    fn test_cli_flags_override_environment() {
        let settings = BrokerSettings::default().merge_cli(
            Some("mqtt.example.com".to_string()),
            Some(2883),
            Some("user".to_string()),
            None,
            None,
        );

        assert_eq!(settings.host, "mqtt.example.com");
        assert_eq!(settings.port, 2883);
        assert_eq!(settings.username.as_deref(), Some("user"));
    }

    #[test]
    fn test_tls_flip_swaps_default_ports() {
        // Enabling TLS over plain defaults moves 1883 to 8883.
        let settings =
            BrokerSettings::default().merge_cli(None, None, None, None, Some(true));
        assert_eq!(settings.port, 8883);

        // Disabling TLS over a TLS default moves 8883 back to 1883.
        let tls_default = BrokerSettings {
            port: 8883,
            tls: true,
            ..BrokerSettings::default()
        };
        let settings = tls_default.merge_cli(None, None, None, None, Some(false));
        assert_eq!(settings.port, 1883);

        // An explicit port is never second-guessed.
        let settings = BrokerSettings::default().merge_cli(
            None,
            Some(1883),
            None,
            None,
            Some(true),
        );
        assert_eq!(settings.port, 1883);
    }
}
