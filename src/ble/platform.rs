//! btleplug-backed central

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter, Service};
use btleplug::platform::{Adapter, Manager, Peripheral};
use tokio::time::Instant;

use super::{BleCentral, BleError};
use crate::config::BleConfig;
use crate::models::{BleDevice, GattService};

const LOOKUP_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Central backed by the host Bluetooth stack.
///
/// Holds only settings. The adapter handle is created per call and dropped
/// when the call returns.
pub struct PlatformCentral {
    adapter_index: usize,
    lookup_timeout: Duration,
    connect_timeout: Duration,
}

impl PlatformCentral {
    pub fn new(config: &BleConfig) -> Self {
        Self {
            adapter_index: config.adapter_index,
            lookup_timeout: config.lookup_timeout(),
            connect_timeout: config.connect_timeout(),
        }
    }

    async fn peripheral(&self, address: &str) -> Result<Peripheral, BleError> {
        let adapter = adapter(self.adapter_index).await?;
        find_peripheral(&adapter, address, self.lookup_timeout).await
    }
}

#[async_trait]
impl BleCentral for PlatformCentral {
    async fn discover(&self, timeout: Duration) -> Result<Vec<BleDevice>, BleError> {
        let adapter = adapter(self.adapter_index).await?;

        adapter.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(timeout).await;

        // Includes peripherals the adapter already knew before this scan
        let listed = list_devices(&adapter).await;
        finish_scan(listed, adapter.stop_scan().await)
    }

    async fn connect(&self, address: &str) -> Result<(), BleError> {
        let peripheral = self.peripheral(address).await?;
        connect_with_timeout(&peripheral, self.connect_timeout).await
    }

    async fn disconnect(&self, address: &str) -> Result<(), BleError> {
        let peripheral = self.peripheral(address).await?;
        peripheral.disconnect().await?;
        Ok(())
    }

    async fn services(&self, address: &str) -> Result<Vec<GattService>, BleError> {
        let peripheral = self.peripheral(address).await?;

        let was_connected = peripheral.is_connected().await?;
        if !was_connected {
            connect_with_timeout(&peripheral, self.connect_timeout).await?;
        }

        let discovered = peripheral.discover_services().await;
        let services: Vec<GattService> = peripheral.services().iter().map(to_gatt_service).collect();

        if !was_connected {
            if let Err(e) = peripheral.disconnect().await {
                tracing::debug!("Disconnect after service discovery failed for {}: {}", address, e);
            }
        }

        discovered?;
        Ok(services)
    }
}

/// Get the adapter at `index`
pub(crate) async fn adapter(index: usize) -> Result<Adapter, BleError> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters
        .into_iter()
        .nth(index)
        .ok_or(BleError::NoAdapter(index))
}

/// Resolve a peripheral by address, scanning for up to `window` if the
/// adapter does not already know it.
pub(crate) async fn find_peripheral(
    adapter: &Adapter,
    address: &str,
    window: Duration,
) -> Result<Peripheral, BleError> {
    if let Some(peripheral) = lookup(adapter, address).await? {
        return Ok(peripheral);
    }

    adapter.start_scan(ScanFilter::default()).await?;
    let deadline = Instant::now() + window;

    let found = loop {
        tokio::time::sleep(LOOKUP_POLL_INTERVAL).await;
        match lookup(adapter, address).await {
            Ok(Some(peripheral)) => break Ok(Some(peripheral)),
            Ok(None) if Instant::now() >= deadline => break Ok(None),
            Ok(None) => continue,
            Err(e) => break Err(e),
        }
    };

    finish_scan(found, adapter.stop_scan().await)?
        .ok_or_else(|| BleError::DeviceNotFound(address.to_string()))
}

/// Combine a scan's outcome with the result of stopping it. A failed stop
/// is logged and never masks the outcome.
fn finish_scan<T>(
    outcome: Result<T, BleError>,
    stopped: Result<(), btleplug::Error>,
) -> Result<T, BleError> {
    if let Err(e) = stopped {
        tracing::debug!("Failed to stop scan: {}", e);
    }
    outcome
}

async fn list_devices(adapter: &Adapter) -> Result<Vec<BleDevice>, BleError> {
    let peripherals = adapter.peripherals().await?;
    let mut devices = Vec::with_capacity(peripherals.len());

    for peripheral in peripherals {
        let name = peripheral
            .properties()
            .await?
            .and_then(|props| props.local_name);
        devices.push(BleDevice {
            address: peripheral.address().to_string(),
            name,
        });
    }

    Ok(devices)
}

pub(crate) async fn connect_with_timeout(
    peripheral: &Peripheral,
    timeout: Duration,
) -> Result<(), BleError> {
    tokio::time::timeout(timeout, peripheral.connect())
        .await
        .map_err(|_| BleError::Timeout(timeout))??;
    Ok(())
}

async fn lookup(adapter: &Adapter, address: &str) -> Result<Option<Peripheral>, BleError> {
    let peripherals = adapter.peripherals().await?;
    Ok(peripherals
        .into_iter()
        .find(|p| address_matches(&p.address().to_string(), address)))
}

fn address_matches(candidate: &str, wanted: &str) -> bool {
    candidate.eq_ignore_ascii_case(wanted.trim())
}

fn to_gatt_service(service: &Service) -> GattService {
    GattService {
        uuid: service.uuid.to_string(),
        primary: service.primary,
        characteristics: service
            .characteristics
            .iter()
            .map(|c| c.uuid.to_string())
            .collect(),
    }
}
