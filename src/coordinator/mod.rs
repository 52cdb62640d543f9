//! Canonical mutation protocol.
//!
//! Every externally triggered change runs the same three steps while holding
//! the commit lock:
//!
//! 1. apply the change through the [`StateStore`]
//! 2. append the describing [`Event`] to the [`EventLog`]
//! 3. publish that event through the [`BroadcastHub`]
//!
//! A failure in step 1 aborts the sequence: no event, no broadcast. Step 3
//! cannot fail from the caller's point of view. Holding the lock across all
//! three steps keeps mutation order, log order and broadcast order identical.

use crate::error::StoreError;
use crate::event::{Event, EventLog, EventPayload, Level};
use crate::state::{Device, DeviceState, Sensor, StateStore};
use crate::storage::Database;
use crate::subscription::{BroadcastHub, Observer, ObserverId};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;


/// Source recorded for sensor trigger events
pub const SENSOR_SOURCE: &str = "Sensor Update";

/// Source recorded for manual logs that do not name one
pub const MANUAL_SOURCE: &str = "Manual";

/// Source recorded for a device state change
pub fn device_source(name: &str) -> String {
    format!("Device Update: {}", name)
}

/// Result of a committed device update
#[derive(Clone, Debug)]
pub struct DeviceUpdate {
    /// Device with its merged state
    pub device: Device,
    /// Event recorded for the change
    pub event: Event,
}

/// Coordinator owns the mutate → log → broadcast sequence
pub struct Coordinator {
    store: StateStore,
    log: EventLog,
    hub: Arc<BroadcastHub>,
    commit: Mutex<()>,
}

impl Coordinator {
    pub fn new(db: Arc<Database>, hub: Arc<BroadcastHub>) -> Self {
        Self {
            store: StateStore::new(Arc::clone(&db)),
            log: EventLog::new(db),
            hub,
            commit: Mutex::new(()),
        }
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    fn lock_commit(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.commit.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Steps 2 and 3, called with the commit lock held
    fn record(
        &self,
        level: Level,
        source: &str,
        payload: Option<EventPayload>,
    ) -> Result<Event, StoreError> {
        let event = self.log.append(level, source, payload)?;
        let delivered = self.hub.publish(&event);
        info!(
            event_id = %event.id,
            level = %event.level,
            source = %event.source,
            delivered,
            "Event committed"
        );
        Ok(event)
    }

    /// Create a device. Creation is not an observable event.
    pub fn create_device(
        &self,
        name: &str,
        kind: &str,
        initial_state: Option<DeviceState>,
    ) -> Result<String, StoreError> {
        let _commit = self.lock_commit()?;
        self.store.create_device(name, kind, initial_state)
    }

    /// Merge `partial` into a device and announce the new full state.
    pub fn update_device(&self, id: &str, partial: DeviceState) -> Result<DeviceUpdate, StoreError> {
        let _commit = self.lock_commit()?;

        let device = self.store.update_device(id, partial)?;
        let event = self.record(
            Level::Info,
            &device_source(&device.name),
            Some(device.state.clone().into()),
        )?;

        Ok(DeviceUpdate { device, event })
    }

    /// Set a sensor's trigger flag and announce it (`warn` when triggered,
    /// `info` when cleared). Unknown sensor ids are accepted as a no-op write
    /// and still produce an event.
    pub fn trigger_sensor(&self, id: &str, value: bool) -> Result<Event, StoreError> {
        let _commit = self.lock_commit()?;

        self.store.set_sensor_triggered(id, value)?;
        let level = if value { Level::Warn } else { Level::Info };
        self.record(level, SENSOR_SOURCE, Some(EventPayload::sensor_trigger(id, value)))
    }

    /// Inject an externally supplied log entry through the same append and
    /// publish path, bypassing the state store.
    pub fn log(
        &self,
        level: Level,
        source: &str,
        payload: Option<EventPayload>,
    ) -> Result<Event, StoreError> {
        let _commit = self.lock_commit()?;
        self.record(level, source, payload)
    }

    /// Startup hook: populate the default sensors when none exist
    pub fn seed_default_sensors(&self) -> Result<usize, StoreError> {
        let _commit = self.lock_commit()?;
        self.store.seed_default_sensors()
    }

    pub fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        self.store.list_devices()
    }

    pub fn list_sensors(&self) -> Result<Vec<Sensor>, StoreError> {
        self.store.list_sensors()
    }

    /// Most recent events, newest first
    pub fn list_events(&self, limit: usize) -> Result<Vec<Event>, StoreError> {
        self.log.list(limit)
    }

    pub fn event_count(&self) -> Result<u64, StoreError> {
        self.log.count()
    }

    /// Register a live observer
    pub fn connect(&self) -> Observer {
        self.hub.connect()
    }

    pub fn disconnect(&self, id: ObserverId) -> bool {
        self.hub.disconnect(id)
    }
}
