use std::fs;
use std::path::Path;

use serde_json::{Value, json};

use dt_api::{Config, Event, EventCore};
use dt_core::DtCore;

fn map(v: Value) -> Config {
    v.as_object().cloned().unwrap()
}

fn track(i: usize) -> Event {
    map(json!({
        "#dt_id": format!("user-{}", i % 7),
        "#acid": "acc",
        "#event_name": "level_up",
        "#event_type": "track",
        "#sdk_type": "dt_server_sdk_rust",
        "#sdk_version_name": "0.1.0",
        "level": i,
    }))
}

fn read_lines(dir: &Path) -> Vec<Value> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let content = fs::read_to_string(entry.unwrap().path()).unwrap();
        for line in content.lines() {
            out.push(serde_json::from_str(line).unwrap());
        }
    }
    out
}

#[test]
fn batched_events_are_all_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let core = DtCore::new();
    core.init(map(json!({
        "consumer": "log",
        "path": dir.path().display().to_string(),
        "max_batch_len": 200,
        "name_prefix": "dt_rs",
        "max_file_size_bytes": 0,
    })))
    .unwrap();

    for i in 0..250 {
        assert!(core.add_event(track(i)).unwrap());
    }
    // First batch of 200 is already on disk.
    assert_eq!(read_lines(dir.path()).len(), 200);

    core.flush().unwrap();
    core.close().unwrap();

    let lines = read_lines(dir.path());
    assert_eq!(lines.len(), 250);
    for line in &lines {
        assert_eq!(line["#event_type"], json!("track"));
        assert!(line["#event_time"].is_i64());
        assert!(line["properties"]["level"].is_u64());
        assert!(line.get("level").is_none());
    }
    assert!(core.add_event(track(0)).is_err());
}

#[test]
fn size_limit_spreads_events_over_shards() {
    let dir = tempfile::tempdir().unwrap();
    let core = DtCore::new();
    core.init(map(json!({
        "path": dir.path().display().to_string(),
        "max_batch_len": 10,
        "max_file_size_bytes": 2048,
    })))
    .unwrap();

    for i in 0..100 {
        assert!(core.add_event(track(i)).unwrap());
    }
    core.close().unwrap();

    let shards: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
    assert!(shards.len() > 1);
    for shard in &shards {
        let name = shard.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("dt-") && name.ends_with(".log"), "{name}");
        assert!(fs::metadata(shard).unwrap().len() <= 2048);
    }
    assert_eq!(read_lines(dir.path()).len(), 100);
}

#[test]
fn rejected_events_do_not_reach_the_log() {
    let dir = tempfile::tempdir().unwrap();
    let core = DtCore::new();
    core.init(map(json!({
        "path": dir.path().display().to_string(),
        "max_batch_len": 1,
    })))
    .unwrap();

    let mut bad = track(0);
    bad.insert("#event_type".into(), json!("profile"));
    assert!(!core.add_event(bad).unwrap());

    let mut user = track(1);
    user.insert("#event_type".into(), json!("user"));
    user.insert("#event_name".into(), json!("#user_add"));
    user.insert("level".into(), json!("high"));
    assert!(!core.add_event(user).unwrap());

    core.close().unwrap();
    assert!(read_lines(dir.path()).is_empty());
}

#[test]
fn toggling_logger_keeps_content() {
    let dir = tempfile::tempdir().unwrap();
    let core = DtCore::new();
    core.init(map(json!({
        "path": dir.path().display().to_string(),
        "max_batch_len": 100,
    })))
    .unwrap();

    let mut first = track(1);
    first.insert("#event_syn".into(), json!("same"));
    first.insert("#event_time".into(), json!(1_700_000_000_000i64));
    let second = first.clone();

    core.toggle_logger(true);
    core.add_event(first).unwrap();
    core.toggle_logger(false);
    core.add_event(second).unwrap();
    core.close().unwrap();

    let lines = read_lines(dir.path());
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], lines[1]);
}

#[test]
fn process_wide_core() {
    let dir = tempfile::tempdir().unwrap();
    assert!(dt_core::add_event(track(0)).is_err());

    dt_core::init(map(json!({
        "path": dir.path().display().to_string(),
        "max_batch_len": 5,
    })))
    .unwrap();
    assert!(dt_core::init(map(json!({ "path": "x", "max_batch_len": 1 }))).is_err());
    assert!(dt_core::global().is_initialized());

    assert!(dt_core::add_event(track(0)).unwrap());
    dt_core::flush().unwrap();
    dt_core::close().unwrap();
    assert_eq!(read_lines(dir.path()).len(), 1);
}
