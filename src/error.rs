use thiserror::Error;

/// Failures surfaced by the state store, the event log and the coordinator.
///
/// Broadcast failures never show up here: they are absorbed by the hub.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Mutation targets an unknown device id
    #[error("device not found: {0}")]
    NotFound(String),

    /// Event listing asked for zero events
    #[error("limit must be a positive number")]
    InvalidLimit,

    /// Backing store unavailable or rejected the statement
    #[error("storage fault: {0}")]
    StorageFault(#[from] rusqlite::Error),

    /// Stored JSON could not be encoded or decoded
    #[error("serialization fault: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding a storage or commit lock
    #[error("storage lock poisoned")]
    LockPoisoned,
}
