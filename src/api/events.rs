use crate::api::{ApiError, AppState, OkResponse};
use crate::coordinator::MANUAL_SOURCE;
use crate::event::{Event, EventPayload, Level};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Query parameters for event listing
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Max events to return (default from config, must be positive)
    pub limit: Option<usize>,
}

/// Body of POST /logs
#[derive(Debug, Deserialize)]
pub struct LogRequest {
    #[serde(default)]
    pub level: Level,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub payload: Option<EventPayload>,
}

fn default_source() -> String {
    MANUAL_SOURCE.to_string()
}

/// Create event API router
pub fn create_event_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/events", get(list_events))
        .route("/logs", post(create_log))
        .with_state(state)
}

/// GET /events?limit=N - Most recent events, newest first
async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EventsQuery>,
) -> Result<Json<Vec<Event>>, ApiError> {
    let limit = params.limit.unwrap_or(state.default_event_limit);
    Ok(Json(state.coordinator.list_events(limit)?))
}

/// POST /logs - Inject a manual log entry (logged and broadcast)
async fn create_log(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LogRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    state
        .coordinator
        .log(request.level, &request.source, request.payload)?;
    Ok(Json(OkResponse::ok()))
}
