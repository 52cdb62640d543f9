// Device and sensor state

mod entity;
mod store;

pub use entity::{merge_state, Device, DeviceState, Sensor, DEFAULT_SENSORS};
pub use store::StateStore;

#[cfg(test)]
mod tests;
