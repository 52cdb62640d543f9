use crate::api::{ApiError, AppState, OkResponse};
use crate::state::{Device, DeviceState};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, patch},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of POST /devices
#[derive(Debug, Deserialize)]
pub struct CreateDeviceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub state: Option<DeviceState>,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

/// Create device API router
pub fn create_device_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/devices", get(list_devices).post(create_device))
        .route("/devices/:id", patch(update_device))
        .with_state(state)
}

/// GET /devices - List all devices
async fn list_devices(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.coordinator.list_devices()?))
}

/// POST /devices - Create a device (no event is emitted)
async fn create_device(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDeviceRequest>,
) -> Result<Json<CreatedResponse>, ApiError> {
    let id = state
        .coordinator
        .create_device(&request.name, &request.kind, request.state)?;
    Ok(Json(CreatedResponse { id }))
}

/// PATCH /devices/:id - Merge a partial state into the device
async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(partial): Json<DeviceState>,
) -> Result<Json<OkResponse>, ApiError> {
    state.coordinator.update_device(&id, partial)?;
    Ok(Json(OkResponse::ok()))
}
