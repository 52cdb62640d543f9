use crate::api::AppState;
use crate::subscription::ConnectionManager;
use axum::{
    extract::{ws::WebSocket, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::info;

/// GET /ws - WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("WebSocket upgrade request received");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Create WebSocket router
pub fn create_ws_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Register the socket as an observer for its whole lifetime
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let observer = state.coordinator.connect();

    let id = ConnectionManager::new(observer).handle(socket).await;

    state.coordinator.disconnect(id);
}
