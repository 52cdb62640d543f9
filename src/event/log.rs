use super::{Event, EventPayload, Level};
use crate::error::StoreError;
use crate::storage::{optional_json_column, Database};
use chrono::{DateTime, Duration, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Append-only, time-ordered event history
///
/// There is no deletion or eviction: the log grows for the lifetime of the
/// database.
pub struct EventLog {
    db: Arc<Database>,
}

impl EventLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a new event, assigning its id and timestamp.
    ///
    /// The timestamp is the current time, bumped one microsecond past the
    /// previous event when the clock has not advanced. An empty payload is
    /// stored as no payload.
    pub fn append(
        &self,
        level: Level,
        source: &str,
        payload: Option<EventPayload>,
    ) -> Result<Event, StoreError> {
        let payload = payload.filter(|p| !p.is_empty());
        let payload_json = payload.as_ref().map(serde_json::to_string).transpose()?;

        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let last: Option<DateTime<Utc>> = tx
            .query_row(
                "SELECT timestamp FROM events ORDER BY seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let mut timestamp = Utc::now();
        if let Some(last) = last {
            if timestamp <= last {
                timestamp = last + Duration::microseconds(1);
            }
        }

        let event = Event {
            id: Uuid::now_v7().to_string(),
            timestamp,
            level,
            source: source.to_string(),
            payload,
        };

        tx.execute(
            "INSERT INTO events (id, timestamp, level, source, payload) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![event.id, event.timestamp, event.level, event.source, payload_json],
        )?;
        tx.commit()?;

        debug!(event_id = %event.id, level = %event.level, source = %event.source, "Event appended");
        Ok(event)
    }

    /// Up to `limit` most recent events, newest first.
    ///
    /// `limit` must be positive. No upper bound is applied here.
    pub fn list(&self, limit: usize) -> Result<Vec<Event>, StoreError> {
        if limit == 0 {
            return Err(StoreError::InvalidLimit);
        }
        // SQLite takes a signed limit; anything beyond i64::MAX means "all"
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, level, source, payload FROM events ORDER BY seq DESC LIMIT ?1",
        )?;
        let events = stmt
            .query_map(params![limit], event_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    /// Total number of events ever appended
    pub fn count(&self) -> Result<u64, StoreError> {
        let conn = self.db.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        level: row.get(2)?,
        source: row.get(3)?,
        payload: optional_json_column(row, 4)?,
    })
}

impl ToSql for Level {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Level {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
