use crate::error::StoreError;
use crate::state::entity::{merge_state, Device, DeviceState, Sensor, DEFAULT_SENSORS};
use crate::storage::{json_column, Database};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const DEVICE_COLUMNS: &str = "id, name, type, state, created_at";
const SENSOR_COLUMNS: &str = "id, name, type, sensitivity, is_triggered, created_at";

/// State store holds the authoritative device and sensor state
///
/// All access goes through the database lock, so concurrent updates to the
/// same device are applied one after another and no merged key is lost.
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a device and return its freshly allocated id.
    ///
    /// `initial_state` is stored verbatim (empty mapping when absent).
    pub fn create_device(
        &self,
        name: &str,
        kind: &str,
        initial_state: Option<DeviceState>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let state = serde_json::to_string(&initial_state.unwrap_or_default())?;

        self.db.lock()?.execute(
            "INSERT INTO devices (id, name, type, state, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, kind, state, Utc::now()],
        )?;

        info!(device_id = %id, name = %name, kind = %kind, "Device created");
        Ok(id)
    }

    /// Merge `partial` into the device's stored state (core state mutation)
    ///
    /// Returns the device with its new full state.
    pub fn update_device(&self, id: &str, partial: DeviceState) -> Result<Device, StoreError> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let mut device = tx
            .query_row(
                &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"),
                params![id],
                device_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        merge_state(&mut device.state, partial);

        tx.execute(
            "UPDATE devices SET state = ?1 WHERE id = ?2",
            params![serde_json::to_string(&device.state)?, id],
        )?;
        tx.commit()?;

        debug!(device_id = %id, keys = device.state.len(), "Device state merged");
        Ok(device)
    }

    /// Get device by ID
    pub fn get_device(&self, id: &str) -> Result<Option<Device>, StoreError> {
        let conn = self.db.lock()?;
        let device = conn
            .query_row(
                &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"),
                params![id],
                device_from_row,
            )
            .optional()?;
        Ok(device)
    }

    /// All devices in creation order
    pub fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {DEVICE_COLUMNS} FROM devices ORDER BY seq"))?;
        let devices = stmt
            .query_map([], device_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(devices)
    }

    /// All sensors in creation order
    pub fn list_sensors(&self) -> Result<Vec<Sensor>, StoreError> {
        let conn = self.db.lock()?;
        let mut stmt = conn.prepare(&format!("SELECT {SENSOR_COLUMNS} FROM sensors ORDER BY seq"))?;
        let sensors = stmt
            .query_map([], sensor_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sensors)
    }

    /// Set a sensor's trigger flag.
    ///
    /// An unknown id is not an error: the write simply matches no row.
    pub fn set_sensor_triggered(&self, id: &str, value: bool) -> Result<(), StoreError> {
        let changed = self.db.lock()?.execute(
            "UPDATE sensors SET is_triggered = ?1 WHERE id = ?2",
            params![value, id],
        )?;

        if changed == 0 {
            debug!(sensor_id = %id, "Trigger write matched no sensor");
        }
        Ok(())
    }

    /// Insert the default sensor set if the sensor collection is empty.
    ///
    /// Returns how many sensors were inserted (0 when already populated).
    pub fn seed_default_sensors(&self) -> Result<usize, StoreError> {
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM sensors", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }

        let now = Utc::now();
        for (name, kind) in DEFAULT_SENSORS {
            tx.execute(
                "INSERT INTO sensors (id, name, type, is_triggered, sensitivity, created_at) VALUES (?1, ?2, ?3, 0, 1.0, ?4)",
                params![Uuid::new_v4().to_string(), name, kind, now],
            )?;
        }
        tx.commit()?;

        info!(count = DEFAULT_SENSORS.len(), "Seeded default sensors");
        Ok(DEFAULT_SENSORS.len())
    }
}

fn device_from_row(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        state: json_column(row, 3)?,
        created_at: row.get(4)?,
    })
}

fn sensor_from_row(row: &Row<'_>) -> rusqlite::Result<Sensor> {
    Ok(Sensor {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: row.get(2)?,
        sensitivity: row.get(3)?,
        is_triggered: row.get(4)?,
        created_at: row.get(5)?,
    })
}
