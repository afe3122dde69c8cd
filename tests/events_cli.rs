mod support;

use serde_json::Value;

use support::{now_ms, TestData, DAY_MS};

fn read_events(data: &TestData) -> Vec<Value> {
    let raw = std::fs::read_to_string(data.path().join("events.jsonl")).expect("events file");
    raw.lines()
        .map(|line| serde_json::from_str(line).expect("event json"))
        .collect()
}

#[test]
fn mutations_are_mirrored_to_event_file() {
    let data = TestData::new();
    let events = data.path().join("events.jsonl");
    let events_arg = events.to_str().expect("utf-8 path");

    let created = data.json(&["project", "new", "Evented", "--events", events_arg]);
    let project = created["id"].as_str().expect("project id").to_string();
    let added = data.json(&["task", "add", &project, "watched", "--events", events_arg]);
    let task = added["record"]["id"].as_str().expect("task id").to_string();
    data.json(&["task", "cycle", &task, "--events", events_arg]);
    data.json(&["task", "today", &task, "--events", events_arg]);
    data.json(&["task", "done", &task, "--events", events_arg]);
    data.json(&["project", "status", &project, "cold", "--events", events_arg]);
    // Reads and no-ops emit nothing.
    data.json(&["tree", &project, "--events", events_arg]);
    data.json(&["task", "done", "missing", "--events", events_arg]);

    let kinds: Vec<String> = read_events(&data)
        .iter()
        .map(|event| event["event"].as_str().expect("kind").to_string())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "project_created",
            "task_created",
            "task_friction_cycled",
            "task_today_toggled",
            "task_toggled",
            "project_status_changed",
        ]
    );

    let first = &read_events(&data)[0];
    assert_eq!(first["schema_version"], "friction.event.v1");
    assert_eq!(first["data"]["name"], "Evented");
}

#[test]
fn startup_sweep_is_reported_as_event() {
    let data = TestData::new();
    let now = now_ms();
    data.write_file(
        "projects.json",
        &serde_json::json!([{ "id": "p1", "name": "Idle", "status": "hot",
            "createdAt": now - 9 * DAY_MS, "lastActivityAt": now - 9 * DAY_MS }])
        .to_string(),
    );
    let events = data.path().join("events.jsonl");

    data.json(&["status", "--events", events.to_str().expect("utf-8 path")]);

    let emitted = read_events(&data);
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0]["event"], "sweep_applied");
    assert_eq!(emitted[0]["data"]["cooled"][0], "p1");
}

#[test]
fn events_to_stdout_suppress_envelope() {
    let data = TestData::new();
    let output = data
        .cmd()
        .args(["project", "new", "Streamed", "--json", "--events", "-"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines: Vec<&str> = std::str::from_utf8(&output)
        .expect("utf-8")
        .lines()
        .collect();
    assert_eq!(lines.len(), 1);
    let event: Value = serde_json::from_str(lines[0]).expect("event json");
    assert_eq!(event["event"], "project_created");
}
