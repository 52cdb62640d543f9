use crate::event::Event;
use serde::Serialize;

/// Server → Client frames pushed over the observer channel
///
/// Serialized as `{"type": "event", "event": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    Event { event: &'a Event },
}

impl<'a> ServerMessage<'a> {
    pub fn event(event: &'a Event) -> Self {
        ServerMessage::Event { event }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
