//! Error handling module

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::ble::BleError;
use crate::desk::DeskError;
use crate::models::BleDevice;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Device {0} not found")]
    DeviceNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("BLE error: {0}")]
    Ble(#[from] BleError),

    #[error("Desk error: {0}")]
    Desk(#[from] DeskError),
}

impl AppError {
    pub fn device_not_found(device: &BleDevice) -> Self {
        AppError::DeviceNotFound(device.display_name().to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Ble(_) | AppError::Desk(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(serde_json::json!({
            "detail": self.to_string()
        }));

        (status, body).into_response()
    }
}
