//! Device API handlers - discovery, monitoring, connect/disconnect

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;

use crate::error::AppError;
use crate::models::{BleDevice, StatusResponse};
use crate::state::AppState;

/// GET /discover - Scan for nearby peripherals
pub async fn discover(State(state): State<AppState>) -> Result<Json<Vec<BleDevice>>, AppError> {
    let devices = state.central.discover(state.scan_timeout).await?;
    tracing::info!("Discovered {} BLE devices", devices.len());
    Ok(Json(devices))
}

/// GET /monitor - Connect briefly and log the device's GATT services
pub async fn monitor(
    State(state): State<AppState>,
    WithRejection(Json(device), _): WithRejection<Json<BleDevice>, AppError>,
) -> Result<Json<StatusResponse>, AppError> {
    match state.central.services(&device.address).await {
        Ok(services) => {
            for service in &services {
                tracing::info!("Service: {}", service);
            }
            Ok(Json(StatusResponse::new("connected")))
        }
        Err(e) => {
            tracing::warn!("Monitor failed for {}: {}", device.address, e);
            Err(AppError::device_not_found(&device))
        }
    }
}

/// POST /connect
pub async fn connect(
    State(state): State<AppState>,
    WithRejection(Json(device), _): WithRejection<Json<BleDevice>, AppError>,
) -> Result<Json<StatusResponse>, AppError> {
    match state.central.connect(&device.address).await {
        Ok(()) => {
            tracing::info!("Connected to {}", device.display_name());
            Ok(Json(StatusResponse::new("connected")))
        }
        Err(e) => {
            tracing::warn!("Connect failed for {}: {}", device.address, e);
            Err(AppError::device_not_found(&device))
        }
    }
}

/// POST /disconnect
///
/// Issues a second disconnect after the first regardless of its outcome.
/// Only the first call decides the response.
pub async fn disconnect(
    State(state): State<AppState>,
    WithRejection(Json(device), _): WithRejection<Json<BleDevice>, AppError>,
) -> Result<Json<StatusResponse>, AppError> {
    let outcome = match state.central.disconnect(&device.address).await {
        Ok(()) => {
            tracing::info!("Disconnected from {}", device.display_name());
            Ok(Json(StatusResponse::new("disconnected")))
        }
        Err(e) => {
            tracing::warn!("Disconnect failed for {}: {}", device.address, e);
            Err(AppError::device_not_found(&device))
        }
    };

    if let Err(e) = state.central.disconnect(&device.address).await {
        tracing::debug!("Follow-up disconnect failed for {}: {}", device.address, e);
    }

    outcome
}
