use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Device state: top-level keys merged shallowly on update
pub type DeviceState = Map<String, Value>;

/// Device represents a controllable home appliance (light, lock, camera...)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique device identifier (UUID v4), immutable once assigned
    pub id: String,

    pub name: String,

    /// Free-form type tag (e.g., "light", "lock")
    #[serde(rename = "type")]
    pub kind: String,

    /// Current state, e.g. {"on": true, "brightness": 80}
    pub state: DeviceState,

    pub created_at: DateTime<Utc>,
}

/// Sensor represents a binary detector (door contact, motion, smoke...)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sensitivity: f64,
    pub is_triggered: bool,
    pub created_at: DateTime<Utc>,
}

/// Sensors seeded into an empty collection at startup: (name, type)
pub const DEFAULT_SENSORS: [(&str, &str); 4] = [
    ("Front Door", "door"),
    ("Living Room Motion", "motion"),
    ("Kitchen Window", "window"),
    ("Smoke Detector", "alarm"),
];

/// Shallow key-wise merge: every key of `partial` overwrites the stored key,
/// keys absent from `partial` are kept. Nested values are replaced wholesale.
pub fn merge_state(state: &mut DeviceState, partial: DeviceState) {
    for (key, value) in partial {
        state.insert(key, value);
    }
}
