use super::*;
use crate::error::StoreError;
use crate::storage::Database;
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;

fn create_store() -> StateStore {
    StateStore::new(Arc::new(Database::open_in_memory().unwrap()))
}

fn state(value: Value) -> DeviceState {
    value.as_object().unwrap().clone()
}

#[test]
fn test_create_device_and_list() {
    let store = create_store();

    let id = store
        .create_device("Lamp", "light", Some(state(json!({"on": false}))))
        .unwrap();

    let devices = store.list_devices().unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, id);
    assert_eq!(devices[0].name, "Lamp");
    assert_eq!(devices[0].kind, "light");
    assert_eq!(devices[0].state, state(json!({"on": false})));
}

#[test]
fn test_create_device_defaults_to_empty_state() {
    let store = create_store();

    let id = store.create_device("Hallway Cam", "camera", None).unwrap();

    let device = store.get_device(&id).unwrap().unwrap();
    assert!(device.state.is_empty());
}

#[test]
fn test_device_ids_are_unique() {
    let store = create_store();

    let a = store.create_device("Lamp", "light", None).unwrap();
    let b = store.create_device("Lamp", "light", None).unwrap();

    assert_ne!(a, b);
    assert_eq!(store.list_devices().unwrap().len(), 2);
}

#[test]
fn test_update_device_overwrites_key() {
    let store = create_store();
    let id = store
        .create_device("Lamp", "light", Some(state(json!({"on": false}))))
        .unwrap();

    let device = store.update_device(&id, state(json!({"on": true}))).unwrap();

    assert_eq!(device.state, state(json!({"on": true})));
    assert_eq!(
        store.get_device(&id).unwrap().unwrap().state,
        state(json!({"on": true}))
    );
}

#[test]
fn test_update_device_preserves_absent_keys() {
    let store = create_store();
    let id = store
        .create_device(
            "Lamp",
            "light",
            Some(state(json!({"on": false, "brightness": 40}))),
        )
        .unwrap();

    let device = store
        .update_device(&id, state(json!({"color": "warm"})))
        .unwrap();

    assert_eq!(
        device.state,
        state(json!({"on": false, "brightness": 40, "color": "warm"}))
    );
}

#[test]
fn test_update_device_replaces_nested_values_wholesale() {
    let store = create_store();
    let id = store
        .create_device(
            "Thermostat",
            "other",
            Some(state(json!({"schedule": {"mon": 20, "tue": 21}}))),
        )
        .unwrap();

    let device = store
        .update_device(&id, state(json!({"schedule": {"wed": 19}})))
        .unwrap();

    assert_eq!(device.state, state(json!({"schedule": {"wed": 19}})));
}

#[test]
fn test_merge_law_matches_left_fold() {
    let store = create_store();
    let initial = state(json!({"a": 1, "b": 2}));
    let id = store
        .create_device("Panel", "other", Some(initial.clone()))
        .unwrap();

    let partials = vec![
        state(json!({"a": 10})),
        state(json!({"c": 3, "b": null})),
        state(json!({})),
        state(json!({"a": [1, 2], "d": {"x": 1}})),
        state(json!({"c": "three"})),
    ];

    let mut expected = initial;
    for partial in &partials {
        merge_state(&mut expected, partial.clone());
        store.update_device(&id, partial.clone()).unwrap();
    }

    assert_eq!(store.get_device(&id).unwrap().unwrap().state, expected);
    assert_eq!(
        expected,
        state(json!({"a": [1, 2], "b": null, "c": "three", "d": {"x": 1}}))
    );
}

#[test]
fn test_update_unknown_device_is_not_found() {
    let store = create_store();

    let err = store
        .update_device("unknown-id", state(json!({"on": true})))
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(ref id) if id == "unknown-id"));
    assert!(store.list_devices().unwrap().is_empty());
}

#[test]
fn test_seed_default_sensors() {
    let store = create_store();

    assert_eq!(store.seed_default_sensors().unwrap(), 4);

    let sensors = store.list_sensors().unwrap();
    let names: Vec<(&str, &str)> = sensors
        .iter()
        .map(|s| (s.name.as_str(), s.kind.as_str()))
        .collect();
    assert_eq!(names, DEFAULT_SENSORS.to_vec());
    assert!(sensors.iter().all(|s| !s.is_triggered));
    assert!(sensors.iter().all(|s| (s.sensitivity - 1.0).abs() < f64::EPSILON));
}

#[test]
fn test_seed_only_when_empty() {
    let store = create_store();

    store.seed_default_sensors().unwrap();
    assert_eq!(store.seed_default_sensors().unwrap(), 0);
    assert_eq!(store.list_sensors().unwrap().len(), 4);
}

#[test]
fn test_set_sensor_triggered() {
    let store = create_store();
    store.seed_default_sensors().unwrap();
    let sensor_id = store.list_sensors().unwrap()[0].id.clone();

    store.set_sensor_triggered(&sensor_id, true).unwrap();
    let sensors = store.list_sensors().unwrap();
    assert!(sensors[0].is_triggered);
    assert!(sensors[1..].iter().all(|s| !s.is_triggered));

    store.set_sensor_triggered(&sensor_id, false).unwrap();
    assert!(!store.list_sensors().unwrap()[0].is_triggered);
}

/// Triggering an unknown sensor is deliberately permissive: it succeeds as a
/// no-op write instead of failing with NotFound.
#[test]
fn test_set_unknown_sensor_triggered_is_permissive_noop() {
    let store = create_store();
    store.seed_default_sensors().unwrap();

    store.set_sensor_triggered("no-such-sensor", true).unwrap();

    let sensors = store.list_sensors().unwrap();
    assert_eq!(sensors.len(), 4);
    assert!(sensors.iter().all(|s| !s.is_triggered));
}

#[test]
fn test_concurrent_updates_same_device() {
    let store = Arc::new(create_store());
    let id = store.create_device("Hub", "other", None).unwrap();
    let mut handles = vec![];

    // 10 threads, each merging a different key into the same device
    for i in 0..10 {
        let store = Arc::clone(&store);
        let id = id.clone();
        let handle = thread::spawn(move || {
            let mut partial = DeviceState::new();
            partial.insert(format!("prop_{}", i), json!(i));
            store.update_device(&id, partial).unwrap();
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    // No merge lost a key
    let device = store.get_device(&id).unwrap().unwrap();
    assert_eq!(device.state.len(), 10);
}
