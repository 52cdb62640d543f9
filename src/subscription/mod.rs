// Real-time fan-out of events to connected observers

pub mod hub;
pub mod manager;
pub mod protocol;

pub use hub::{BroadcastHub, Frame, Observer, ObserverId, SendFailure, DEFAULT_QUEUE_CAPACITY};
pub use manager::ConnectionManager;
pub use protocol::ServerMessage;
