// HTTP and WebSocket APIs

pub mod devices;
mod error;
pub mod events;
pub mod sensors;
pub mod websocket;

pub use devices::create_device_router;
pub use error::ApiError;
pub use events::create_event_router;
pub use sensors::create_sensor_router;
pub use websocket::{create_ws_router, ws_handler};

use crate::coordinator::Coordinator;
use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// Events returned by GET /events when no limit is given
    pub default_event_limit: usize,
}

/// Acknowledgement body for mutations
#[derive(Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Full application router: REST endpoints, the observer socket and request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(create_device_router(Arc::clone(&state)))
        .merge(create_sensor_router(Arc::clone(&state)))
        .merge(create_event_router(Arc::clone(&state)))
        .merge(create_ws_router(state))
        .layer(TraceLayer::new_for_http())
}
