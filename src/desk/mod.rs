//! Standing desk control

mod idasen;
pub mod protocol;

pub use self::idasen::IdasenDesk;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::ble::BleError;

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Target height {0} m is outside the desk range")]
    HeightOutOfRange(f64),

    #[error("Desk does not expose characteristic {0}")]
    MissingCharacteristic(Uuid),

    #[error("Malformed height/speed value ({0} bytes)")]
    MalformedPosition(usize),

    #[error("Desk did not reach target within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Ble(#[from] BleError),

    #[error("Bluetooth error: {0}")]
    Btleplug(#[from] btleplug::Error),
}

#[async_trait]
pub trait DeskControl: Send + Sync {
    /// Move the desk at `address` to `height_m` metres and wait until it stops
    async fn move_to_target(&self, address: &str, height_m: f64) -> Result<(), DeskError>;
}
