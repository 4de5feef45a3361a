//! Data models for the BLE desk gateway

use serde::{Deserialize, Serialize};

/// A BLE peripheral as seen by the API.
///
/// Used both as the request body for device operations and as the
/// element type of `/discover` responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BleDevice {
    pub address: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl BleDevice {
    /// Name as rendered in error details (`None` when the client sent none)
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("None")
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HeightQuery {
    /// Target height in metres
    pub height: f64,
}

/// A GATT service reported by a connected peripheral
#[derive(Debug, Clone, PartialEq)]
pub struct GattService {
    pub uuid: String,
    pub primary: bool,
    pub characteristics: Vec<String>,
}

impl std::fmt::Display for GattService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (primary: {}, characteristics: [{}])",
            self.uuid,
            self.primary,
            self.characteristics.join(", ")
        )
    }
}
