//! Desk API handlers

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::error::AppError;
use crate::models::{BleDevice, HeightQuery, StatusResponse};
use crate::state::AppState;

/// POST /set-height?height=<metres>
///
/// Driver failures are not translated into a device error; they come back
/// as a 500 with the driver's message.
pub async fn set_height(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<HeightQuery>, AppError>,
    WithRejection(Json(device), _): WithRejection<Json<BleDevice>, AppError>,
) -> Result<Json<StatusResponse>, AppError> {
    state
        .desk
        .move_to_target(&device.address, query.height)
        .await?;

    tracing::info!("Set {} to {} m", device.display_name(), query.height);
    Ok(Json(StatusResponse::new("set height")))
}
