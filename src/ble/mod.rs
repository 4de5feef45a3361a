//! BLE central - discovery and connection management

mod platform;

pub use self::platform::PlatformCentral;
pub(crate) use self::platform::{adapter, connect_with_timeout, find_peripheral};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{BleDevice, GattService};

#[derive(Error, Debug)]
pub enum BleError {
    #[error("No Bluetooth adapter at index {0}")]
    NoAdapter(usize),

    #[error("Device {0} not found")]
    DeviceNotFound(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Bluetooth error: {0}")]
    Btleplug(#[from] btleplug::Error),
}

/// Operations the HTTP layer needs from a BLE central.
///
/// Implementations must not keep per-device state between calls; every
/// call resolves the peripheral by address on its own.
#[async_trait]
pub trait BleCentral: Send + Sync {
    /// Scan for advertising peripherals for `timeout`
    async fn discover(&self, timeout: Duration) -> Result<Vec<BleDevice>, BleError>;

    async fn connect(&self, address: &str) -> Result<(), BleError>;

    async fn disconnect(&self, address: &str) -> Result<(), BleError>;

    /// Enumerate GATT services, connecting for the duration of the call
    /// if the peripheral is not already connected.
    async fn services(&self, address: &str) -> Result<Vec<GattService>, BleError>;
}
