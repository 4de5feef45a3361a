//! Configuration module

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ble: BleConfig,
    #[serde(default)]
    pub desk: DeskConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BleConfig {
    /// Index into the host's adapter list
    #[serde(default)]
    pub adapter_index: usize,
    /// Duration of a `/discover` scan
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,
    /// How long to scan for a specific address before giving up
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter_index: 0,
            scan_timeout_secs: default_scan_timeout(),
            lookup_timeout_secs: default_lookup_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl BleConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeskConfig {
    #[serde(default = "default_move_timeout")]
    pub move_timeout_secs: u64,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            move_timeout_secs: default_move_timeout(),
        }
    }
}

impl DeskConfig {
    pub fn move_timeout(&self) -> Duration {
        Duration::from_secs(self.move_timeout_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_scan_timeout() -> u64 {
    5
}

fn default_lookup_timeout() -> u64 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_move_timeout() -> u64 {
    30
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("BLEDESK").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize().unwrap_or_else(|e| {
            tracing::warn!("Invalid configuration, using defaults: {}", e);
            Config::default()
        });

        Ok(config)
    }
}
