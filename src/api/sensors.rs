use crate::api::{ApiError, AppState, OkResponse};
use crate::state::Sensor;
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::Arc;

/// Body of POST /sensors/:id/trigger
#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    /// New trigger state (defaults to triggered). Any JSON value is
    /// accepted and read by truthiness.
    #[serde(default = "default_trigger_value", deserialize_with = "truthy")]
    pub value: bool,
}

fn default_trigger_value() -> bool {
    true
}

/// `null`, `false`, `0`, `""`, `[]` and `{}` are false, everything else true
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    })
}

/// Create sensor API router
pub fn create_sensor_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/sensors", get(list_sensors))
        .route("/sensors/:id/trigger", post(trigger_sensor))
        .with_state(state)
}

/// GET /sensors - List all sensors
async fn list_sensors(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Sensor>>, ApiError> {
    Ok(Json(state.coordinator.list_sensors()?))
}

/// POST /sensors/:id/trigger - Toggle a sensor
///
/// Unknown sensor ids are accepted; the write is a no-op but the event is
/// still recorded.
async fn trigger_sensor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<TriggerRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state.coordinator.trigger_sensor(&id, request.value)?;
    Ok(Json(OkResponse::ok()))
}
