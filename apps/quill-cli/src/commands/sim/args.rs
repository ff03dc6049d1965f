use clap::Args;

#[derive(Debug, Args)]
pub struct SimArgs {
    /// Run one canned scenario (office, home, mixed, chaos) and hold the
    /// fleet up for inspection; omit for the interactive prompt
    #[arg(long)]
    pub scenario: Option<String>,

    /// MQTT broker host (default: QUILL_MQTT_HOST or localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// MQTT broker port (default: QUILL_MQTT_PORT, else 1883/8883 by TLS)
    #[arg(long)]
    pub port: Option<u16>,

    /// MQTT username (default: QUILL_MQTT_USERNAME)
    #[arg(long)]
    pub username: Option<String>,

    /// MQTT password (default: QUILL_MQTT_PASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// Connect over TLS
    #[arg(long, conflicts_with = "no_tls")]
    pub tls: bool,

    /// Connect without TLS even if QUILL_MQTT_TLS is set
    #[arg(long)]
    pub no_tls: bool,
}

impl SimArgs {
    /// Three-state TLS choice: forced on, forced off, or deferred to the
    /// environment.
    pub fn tls_choice(&self) -> Option<bool> {
        if self.tls {
            Some(true)
        } else if self.no_tls {
            Some(false)
        } else {
            None
        }
    }
}
