//! Credential patterns for the device configuration header.
//!
//! Single source of truth for what counts as a secret. Everything that needs
//! to recognize one consults this table: the scrubber's field rules, the
//! clean-state probes used before backups are touched, and the shape checks
//! that catch values the field rules missed.

use regex::Regex;

/// Values starting with one of these are placeholders, not secrets.
pub const PLACEHOLDER_MARKERS: [&str; 5] =
    ["YOUR_", "EXAMPLE_", "PLACEHOLDER_", "TEST_", "DEMO_"];

/// How many distinct placeholder probes a document must contain before it is
/// treated as already scrubbed.
pub const CLEAN_PROBE_THRESHOLD: usize = 3;

/// Credential fields in the device configuration header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    WifiSsid,
    WifiPassword,
    MqttServer,
    MqttUsername,
    MqttPassword,
    DeviceOwner,
    OpenAiToken,
    LogToken,
    LogEndpoint,
}

/// One field rule: anchors on the field name, matches the full run of
/// adjacent string literals, and carries the placeholder that replaces them.
pub struct FieldRule {
    kind: FieldKind,
    pattern: Regex,
    placeholder: &'static str,
    /// Quoted fragment whose presence marks a document as already scrubbed
    /// for this field. `None` for fields that are not probed.
    clean_probe: Option<&'static str>,
}

impl FieldRule {
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn clean_probe(&self) -> Option<&'static str> {
        self.clean_probe
    }
}

/// A shape a secret tends to have, used to validate scrubbed output.
pub struct ShapeCheck {
    pattern: Regex,
    description: &'static str,
}

impl ShapeCheck {
    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn description(&self) -> &'static str {
        self.description
    }
}

/// The full pattern table. Built once and shared by reference.
pub struct SecretPatterns {
    field_rules: Vec<FieldRule>,
    shape_checks: Vec<ShapeCheck>,
}

/// Matches a run of adjacent C string literals after the first one, so
/// values split across lines (`"part1"\n    "part2"`) are covered whole.
const LITERAL_RUN: &str = r#"(?:\s*"[^"]*")*"#;

fn rx(pattern: &str) -> Regex {
    Regex::new(pattern).expect("hard-coded pattern must compile")
}

fn rule(
    kind: FieldKind,
    anchor: &str,
    first_literal: &str,
    placeholder: &'static str,
    clean_probe: Option<&'static str>,
) -> FieldRule {
    // Capture 1: the anchor up to and including `= `.
    // Capture 2: the whole literal run that forms the value.
    let pattern = rx(&format!(r"({anchor}\s*=\s*)({first_literal}{LITERAL_RUN})"));
    FieldRule { kind, pattern, placeholder, clean_probe }
}

impl SecretPatterns {
    /// The standard table for the device configuration header.
    pub fn standard() -> Self {
        let any_literal = r#""[^"]*""#;
        let field_rules = vec![
            rule(
                FieldKind::WifiSsid,
                "defaultWifiSSID",
                any_literal,
                "YOUR_WIFI_SSID",
                Some("\"YOUR_WIFI_SSID\""),
            ),
            rule(
                FieldKind::WifiPassword,
                "defaultWifiPassword",
                any_literal,
                "YOUR_WIFI_PASSWORD",
                Some("\"YOUR_WIFI_PASSWORD\""),
            ),
            // Only fires on managed cloud broker hostnames; a LAN broker
            // address is configuration, not a credential.
            rule(
                FieldKind::MqttServer,
                "defaultMqttServer",
                r#""[^"]*\.(?:hivemq\.cloud|amazonaws\.com|azure\.com)""#,
                "YOUR_MQTT_SERVER.hivemq.cloud",
                Some("\"YOUR_MQTT_SERVER"),
            ),
            rule(
                FieldKind::MqttUsername,
                "defaultMqttUsername",
                any_literal,
                "YOUR_MQTT_USERNAME",
                Some("\"YOUR_MQTT_USERNAME\""),
            ),
            rule(
                FieldKind::MqttPassword,
                "defaultMqttPassword",
                any_literal,
                "YOUR_MQTT_PASSWORD",
                Some("\"YOUR_MQTT_PASSWORD\""),
            ),
            rule(
                FieldKind::DeviceOwner,
                "defaultDeviceOwner",
                any_literal,
                "YOUR_DEVICE_NAME",
                Some("\"YOUR_DEVICE_NAME\""),
            ),
            rule(
                FieldKind::OpenAiToken,
                "defaultChatgptApiToken",
                r#""(?:sk-[^"]*|[A-Za-z0-9+/]{20,})""#,
                "YOUR_OPENAI_API_KEY",
                Some("\"YOUR_OPENAI_API_KEY\""),
            ),
            rule(
                FieldKind::LogToken,
                "betterStackToken",
                r#""[A-Za-z0-9]{15,}""#,
                "YOUR_BETTERSTACK_TOKEN",
                Some("\"YOUR_BETTERSTACK_TOKEN\""),
            ),
            rule(
                FieldKind::LogEndpoint,
                "betterStackEndpoint",
                r#""https://[^"]*betterstackdata\.com[^"]*""#,
                "YOUR_BETTERSTACK_ENDPOINT",
                None,
            ),
        ];

        let shape_checks = vec![
            ShapeCheck {
                pattern: rx(r#""[A-Za-z0-9+/]{32,}""#),
                description: "Long alphanumeric string (possible token/key)",
            },
            ShapeCheck {
                pattern: rx(r#""sk-[A-Za-z0-9\-_]{20,}""#),
                description: "OpenAI-style API key",
            },
            ShapeCheck {
                pattern: rx(r#""[A-Za-z0-9]{40,}""#),
                description: "Long alphanumeric string (possible API key)",
            },
            ShapeCheck {
                pattern: rx(r#""https://[^@"]*:[^@"]*@[^"]*""#),
                description: "URL with embedded credentials",
            },
            ShapeCheck {
                pattern: rx(
                    r#""[A-Za-z0-9\-_]{20,}\.[A-Za-z0-9\-_]{20,}\.[A-Za-z0-9\-_]{20,}""#,
                ),
                description: "JWT-like token",
            },
            ShapeCheck {
                pattern: rx(r#""[A-Za-z0-9+/]{64,}={0,2}""#),
                description: "Base64-encoded data",
            },
        ];

        Self { field_rules, shape_checks }
    }

    pub fn field_rules(&self) -> &[FieldRule] {
        &self.field_rules
    }

    pub fn shape_checks(&self) -> &[ShapeCheck] {
        &self.shape_checks
    }

    /// Quoted fragments that mark a document as already scrubbed.
    pub fn clean_probes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.field_rules.iter().filter_map(|r| r.clean_probe)
    }

    /// True if the value carries a placeholder marker anywhere in it.
    pub fn is_placeholder(value: &str) -> bool {
        PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m))
    }

    /// True if the value begins with a placeholder marker. Field rules use
    /// this to leave already-scrubbed values alone.
    pub fn starts_with_marker(value: &str) -> bool {
        PLACEHOLDER_MARKERS.iter().any(|m| value.starts_with(m))
    }
}
