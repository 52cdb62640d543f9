use crate::subscription::hub::{Observer, ObserverId};
use axum::extract::ws::{Message, WebSocket};
use tracing::{debug, info, warn};

/// Drives a single WebSocket observer connection
///
/// Queued frames are written to the socket as text messages. Inbound
/// traffic is ignored apart from pings and closure detection.
pub struct ConnectionManager {
    observer: Observer,
}

impl ConnectionManager {
    pub fn new(observer: Observer) -> Self {
        Self { observer }
    }

    /// Run until the client goes away, a write fails, or the observer is
    /// removed from the hub. Returns the observer id so the caller can
    /// disconnect it.
    pub async fn handle(mut self, mut socket: WebSocket) -> ObserverId {
        let id = self.observer.id();
        info!(observer_id = %id, "WebSocket connection established");

        loop {
            tokio::select! {
                incoming = socket.recv() => {
                    match incoming {
                        Some(Ok(Message::Close(_))) | None => {
                            info!(observer_id = %id, "WebSocket client disconnected");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                warn!(observer_id = %id, error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Inbound text/binary/pong is ignored
                        }
                        Some(Err(e)) => {
                            warn!(observer_id = %id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                frame = self.observer.recv() => {
                    match frame {
                        Some(frame) => {
                            if let Err(e) = socket.send(Message::Text(frame.to_string())).await {
                                warn!(observer_id = %id, error = %e, "Failed to push event frame");
                                break;
                            }
                        }
                        None => {
                            debug!(observer_id = %id, "Observer removed from hub");
                            break;
                        }
                    }
                }
            }
        }

        info!(observer_id = %id, "WebSocket connection closed");
        id
    }
}
