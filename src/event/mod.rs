use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

mod log;

pub use self::log::EventLog;

/// Event represents an immutable record of something that happened in the home.
///
/// Events are created by [`EventLog::append`] and never mutated or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// UUIDv7 identifier (time-ordered, globally unique)
    pub id: String,

    /// Assigned at append time; strictly increasing in append order
    pub timestamp: DateTime<Utc>,

    pub level: Level,

    /// Free text naming what produced the event (e.g., "Sensor Update")
    pub source: String,

    /// Optional structured details
    pub payload: Option<EventPayload>,
}

/// Event severity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Info,
    Warn,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Critical => "critical",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown level string
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidLevel(pub String);

impl fmt::Display for InvalidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid level '{}': expected info, warn or critical", self.0)
    }
}

impl std::error::Error for InvalidLevel {}

impl FromStr for Level {
    type Err = InvalidLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Level::Info),
            "warn" => Ok(Level::Warn),
            "critical" => Ok(Level::Critical),
            other => Err(InvalidLevel(other.to_string())),
        }
    }
}

/// Payload of a sensor trigger toggle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorTrigger {
    pub sensor_id: String,
    pub triggered: bool,
}

/// Event payload: the known shapes, falling back to an opaque mapping.
///
/// Serialized untagged, so on the wire every variant is a plain JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// Emitted when a sensor is toggled
    SensorTrigger(SensorTrigger),

    /// Device state snapshots, manual log details and any unrecognized object
    Fields(Map<String, Value>),
}

impl EventPayload {
    pub fn sensor_trigger(sensor_id: &str, triggered: bool) -> Self {
        EventPayload::SensorTrigger(SensorTrigger {
            sensor_id: sensor_id.to_string(),
            triggered,
        })
    }

    /// True when the payload carries no data (an empty object)
    pub fn is_empty(&self) -> bool {
        match self {
            EventPayload::SensorTrigger(_) => false,
            EventPayload::Fields(fields) => fields.is_empty(),
        }
    }
}

impl From<Map<String, Value>> for EventPayload {
    fn from(fields: Map<String, Value>) -> Self {
        EventPayload::Fields(fields)
    }
}
