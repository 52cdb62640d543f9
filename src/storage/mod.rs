//! SQLite backing store shared by the state store and the event log.
//!
//! A single [`Connection`] sits behind a [`Mutex`], which makes the store a
//! single writer: every read-modify-write (device merges, event appends)
//! runs while holding that lock.
//!
//! # Schema
//! ```sql
//! CREATE TABLE devices (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,  -- creation order
//!     id TEXT NOT NULL UNIQUE,
//!     name TEXT NOT NULL,
//!     type TEXT NOT NULL,
//!     state TEXT NOT NULL,                    -- JSON object
//!     created_at TEXT NOT NULL
//! );
//! CREATE TABLE sensors (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,
//!     id TEXT NOT NULL UNIQUE,
//!     name TEXT NOT NULL,
//!     type TEXT NOT NULL,
//!     is_triggered INTEGER NOT NULL DEFAULT 0,
//!     sensitivity REAL NOT NULL DEFAULT 1.0,
//!     created_at TEXT NOT NULL
//! );
//! CREATE TABLE events (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,  -- append order
//!     id TEXT NOT NULL UNIQUE,
//!     timestamp TEXT NOT NULL,
//!     level TEXT NOT NULL,
//!     source TEXT NOT NULL,
//!     payload TEXT                            -- JSON object or NULL
//! );
//! ```

use crate::error::StoreError;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS devices (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        state TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS sensors (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        is_triggered INTEGER NOT NULL DEFAULT 0,
        sensitivity REAL NOT NULL DEFAULT 1.0,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        timestamp TEXT NOT NULL,
        level TEXT NOT NULL,
        source TEXT NOT NULL,
        payload TEXT
    );
"#;

/// Serialized access to the SQLite database
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened database");
        Self::init(conn)
    }

    /// Opens a private in-memory database. Contents vanish on drop.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the connection. Holding the guard excludes every other writer.
    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

/// Decode a JSON text column inside a row mapper.
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Like [`json_column`] for nullable columns.
pub(crate) fn optional_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
