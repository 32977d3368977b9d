use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};

use dt_core::DtCore;
use dt_core::consumer::MemoryConsumer;
use dt_sdk::{DTAnalytics, DTLogConsumer, Properties, SdkError};

fn props(v: Value) -> Properties {
    v.as_object().cloned().unwrap()
}

fn memory_sdk() -> (DTAnalytics, dt_core::consumer::MemoryHandle) {
    let core = Arc::new(DtCore::new());
    let (consumer, handle) = MemoryConsumer::new();
    core.init_with(Box::new(consumer), Default::default()).unwrap();
    (DTAnalytics::attach(core), handle)
}

fn log_lines(dir: &Path) -> Vec<Value> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let content = fs::read_to_string(entry.unwrap().path()).unwrap();
        out.extend(content.lines().map(|l| serde_json::from_str::<Value>(l).unwrap()));
    }
    out
}

#[test]
fn track_250_with_batch_200() {
    let dir = tempfile::tempdir().unwrap();
    let consumer = DTLogConsumer::new(dir.path().display().to_string(), 200, "dt", 0).unwrap();
    let dt = DTAnalytics::builder(&consumer)
        .core(Arc::new(DtCore::new()))
        .build()
        .unwrap();

    for i in 0..250 {
        let accepted = dt
            .track("device-1", Some("account-1"), "level_up", props(json!({ "level": i })))
            .unwrap();
        assert!(accepted);
    }
    dt.flush().unwrap();
    dt.close().unwrap();

    let lines = log_lines(dir.path());
    assert_eq!(lines.len(), 250);
    assert_eq!(lines[0]["#dt_id"], json!("device-1"));
    assert_eq!(lines[0]["#acid"], json!("account-1"));
    assert_eq!(lines[0]["properties"]["#sdk_type"], json!("dt_server_sdk_rust"));
    assert!(
        lines[0]["properties"]["#sdk_version_name"]
            .as_str()
            .unwrap()
            .starts_with(&format!("{}_", dt_sdk::SDK_VERSION))
    );
}

#[test]
fn validation_failures_return_false() {
    let (dt, handle) = memory_sdk();

    assert!(dt.user_add("d", None, props(json!({ "coins": 10 }))).unwrap());
    assert!(!dt.user_add("d", None, props(json!({ "coins": "ten" }))).unwrap());
    assert!(!dt.user_append("d", None, props(json!({ "tags": "a" }))).unwrap());
    assert!(!dt.track("d", None, "bad name", Properties::new()).unwrap());
    assert!(!dt.track("d", None, "#not_a_preset", Properties::new()).unwrap());
    assert!(!dt.track("", None, "login", Properties::new()).unwrap());
    assert!(!dt.track("d", None, "login", props(json!({ "#acid": "x" }))).unwrap());

    assert_eq!(handle.len(), 1);
}

#[test]
fn user_unset_reaches_core_zeroed() {
    let (dt, handle) = memory_sdk();
    assert!(dt.user_unset("d", Some("a"), props(json!({ "x": "v", "y": [1, 2] }))).unwrap());

    let event = &handle.events()[0];
    assert_eq!(event["#event_name"], json!("#user_unset"));
    assert_eq!(event["#event_type"], json!("user"));
    assert_eq!(event["properties"]["x"], json!(0));
    assert_eq!(event["properties"]["y"], json!(0));
}

#[test]
fn preset_track_event() {
    let (dt, handle) = memory_sdk();
    let accepted = dt
        .track(
            "d",
            None,
            "#iap_purchase_success",
            props(json!({ "#iap_sku": "gold", "#iap_price": 0.99, "#iap_currency": "USD" })),
        )
        .unwrap();
    assert!(accepted);
    assert!(!handle.events()[0].contains_key("#acid"));
}

#[test]
fn calls_after_close_are_errors() {
    let (dt, handle) = memory_sdk();
    dt.close().unwrap();
    assert!(handle.is_closed());

    let err = dt.track("d", None, "login", Properties::new()).unwrap_err();
    assert!(matches!(err, SdkError::Core(e) if e.kind == dt_api::ErrorKind::State));
    assert!(dt.flush().is_err());
}

#[test]
fn init_failure_surfaces_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let core = Arc::new(DtCore::new());
    let consumer = DTLogConsumer::new(dir.path().display().to_string(), 10, "dt", 0).unwrap();

    let _first = DTAnalytics::builder(&consumer).core(core.clone()).build().unwrap();
    let second = DTAnalytics::builder(&consumer).core(core).build();
    assert!(matches!(second, Err(SdkError::Core(_))));
}
