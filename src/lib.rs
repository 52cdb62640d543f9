// Error types
pub mod error;

// Configuration
pub mod config;

// SQLite backing store
pub mod storage;

// Device and sensor state
pub mod state;

// Event model and append-only log
pub mod event;

// Observer registry and fan-out
pub mod subscription;

// Mutate → log → broadcast sequencing
pub mod coordinator;

// HTTP and WebSocket APIs
pub mod api;
