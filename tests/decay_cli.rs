mod support;

use serde_json::json;

use support::{now_ms, TestData, DAY_MS};

fn seed(data: &TestData, projects: serde_json::Value, tasks: serde_json::Value) {
    data.write_file("projects.json", &projects.to_string());
    data.write_file("tasks.json", &tasks.to_string());
}

#[test]
fn sweep_cools_idle_projects_and_expires_stale_picks() {
    let data = TestData::new();
    let now = now_ms();
    seed(
        &data,
        json!([
            { "id": "idle", "name": "Idle", "status": "hot",
              "createdAt": now - 30 * DAY_MS, "lastActivityAt": now - 8 * DAY_MS },
            { "id": "busy", "name": "Busy", "status": "hot",
              "createdAt": now - 30 * DAY_MS, "lastActivityAt": now - DAY_MS },
            { "id": "idea", "name": "Someday", "status": "idea",
              "createdAt": now - 30 * DAY_MS, "lastActivityAt": now - 60 * DAY_MS },
        ]),
        json!([
            { "id": "stale", "projectId": "busy", "text": "stale pick", "friction": "low",
              "isToday": now - 2 * DAY_MS, "completed": false, "createdAt": now - 3 * DAY_MS },
            { "id": "done", "projectId": "busy", "text": "finished pick", "friction": "low",
              "isToday": now - 2 * DAY_MS, "completed": true, "createdAt": now - 3 * DAY_MS },
            { "id": "capped", "projectId": "busy", "text": "already high", "friction": "high",
              "isToday": now - 2 * DAY_MS, "completed": false, "createdAt": now - 3 * DAY_MS },
        ]),
    );

    let report = data.json(&["sweep"]);
    assert_eq!(report["cooled"], json!(["idle"]));
    assert_eq!(report["expired"], json!(["stale", "capped"]));

    let projects = data.stored_projects();
    assert_eq!(projects[0]["status"], "cold");
    assert_eq!(projects[1]["status"], "hot");
    assert_eq!(projects[2]["status"], "idea");

    let tasks = data.stored_tasks();
    assert_eq!(tasks[0]["isToday"], false);
    assert_eq!(tasks[0]["friction"], "moderate");
    assert_eq!(tasks[1]["isToday"], now - 2 * DAY_MS);
    assert_eq!(tasks[2]["isToday"], false);
    assert_eq!(tasks[2]["friction"], "high");

    let again = data.json(&["sweep"]);
    assert_eq!(again["cooled"], json!([]));
    assert_eq!(again["expired"], json!([]));
}

#[test]
fn any_command_runs_the_startup_sweep() {
    let data = TestData::new();
    let now = now_ms();
    seed(
        &data,
        json!([{ "id": "p1", "name": "Old", "status": "hot",
                 "createdAt": now - 20 * DAY_MS, "lastActivityAt": now - 10 * DAY_MS }]),
        json!([]),
    );

    let listing = data.json(&["project", "ls"]);
    assert_eq!(listing["groups"][1]["status"], "cold");
    assert_eq!(listing["groups"][1]["projects"][0]["id"], "p1");
    assert_eq!(data.stored_projects()[0]["status"], "cold");
}

#[test]
fn legacy_records_are_migrated_on_load() {
    let data = TestData::new();
    let now = now_ms();
    seed(
        &data,
        json!([{ "id": "p1", "name": "Legacy", "status": "hot", "createdAt": now - DAY_MS }]),
        json!([
            { "id": "flag", "projectId": "p1", "text": "flag", "friction": "low",
              "isToday": true, "completed": false, "createdAt": now - DAY_MS },
            { "id": "text", "projectId": "p1", "text": "text", "friction": "low",
              "isToday": "2024-01-01", "completed": false, "createdAt": now - DAY_MS },
            { "id": "off", "projectId": "p1", "text": "off", "friction": "low",
              "completed": false, "createdAt": now - DAY_MS },
        ]),
    );

    let today = data.json(&["today"]);
    assert_eq!(today["total"], 2);

    // Any mutation writes both collections back in the current shape.
    data.json(&["task", "cycle", "off"]);
    let projects = data.stored_projects();
    assert!(projects[0]["lastActivityAt"].as_i64().expect("activity") >= now);
    let tasks = data.stored_tasks();
    assert!(tasks[0]["isToday"].as_i64().expect("flag stamp") >= now);
    assert!(tasks[1]["isToday"].as_i64().expect("text stamp") >= now);
    assert_eq!(tasks[2]["isToday"], false);
    assert_eq!(tasks[2]["friction"], "moderate");
}

#[test]
fn corrupt_collections_fall_back_to_empty() {
    let data = TestData::new();
    data.write_file("projects.json", "{ this is not json");
    data.write_file("tasks.json", "[]");

    let listing = data.json(&["project", "ls"]);
    assert_eq!(listing["total"], 0);

    data.new_project("Fresh start");
    assert_eq!(data.stored_projects().len(), 1);
}

#[test]
fn watch_stops_after_duration() {
    let data = TestData::new();
    let report = data.json(&["watch", "--interval", "1", "--duration", "1"]);
    assert_eq!(report["interval_secs"], 1);
    assert_eq!(report["sweeps_applied"], 0);
}

#[test]
fn watch_rejects_zero_interval() {
    let data = TestData::new();
    data.json_failure(&["watch", "--interval", "0", "--duration", "1"], 2);
}

#[test]
fn rejected_arguments_do_not_run_the_startup_sweep() {
    let data = TestData::new();
    let now = now_ms();
    seed(
        &data,
        json!([{ "id": "p1", "name": "Stale", "status": "hot",
                 "createdAt": now - 20 * DAY_MS, "lastActivityAt": now - 10 * DAY_MS }]),
        json!([{ "id": "t1", "projectId": "p1", "text": "keep", "friction": "low",
                 "completed": false, "createdAt": now - 10 * DAY_MS }]),
    );
    let before = data.read_json("projects.json");

    data.json_failure(&["project", "new", "  "], 2);
    data.json_failure(&["task", "add", "p1", " "], 2);
    data.json_failure(&["task", "edit", "t1", "--text", ""], 2);
    data.json_failure(&["watch", "--interval", "0"], 2);

    assert_eq!(data.read_json("projects.json"), before);
    assert_eq!(data.stored_projects()[0]["status"], "hot");
}
