mod support;

use predicates::str::contains;
use serde_json::{json, Value};

use support::TestData;

#[test]
fn export_then_import_into_fresh_data_dir() {
    let source = TestData::new();
    let project = source.new_project("Portable");
    let task = source.new_task(&project, "travel well");
    source.json(&["task", "today", &task]);

    let out = source.path().join("backup.json");
    let out_arg = out.to_str().expect("utf-8 path");
    let exported = source.json(&["export", "--out", out_arg]);
    assert_eq!(exported["projects"], 1);
    assert_eq!(exported["tasks"], 1);

    let doc = source.read_json("backup.json");
    assert!(doc["exportedAt"].is_i64());
    assert_eq!(doc["projects"][0]["id"], project.as_str());
    assert!(doc["tasks"][0]["isToday"].is_i64());

    let target = TestData::new();
    target.new_project("Will be replaced");
    let imported = target.json(&["import", out_arg, "--yes"]);
    assert_eq!(imported["imported"], true);
    assert_eq!(imported["report"]["replaced_projects"], 1);

    let projects = target.stored_projects();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["name"], "Portable");
    assert_eq!(target.stored_tasks()[0]["id"], task.as_str());
}

#[test]
fn export_defaults_to_dated_file_name() {
    let data = TestData::new();
    data.new_project("Dated");
    let exported = data.json(&["export"]);
    let path = exported["path"].as_str().expect("path");
    assert!(path.starts_with("friction-pm-backup-"), "{path}");
    assert!(path.ends_with(".json"), "{path}");
    assert!(data.path().join(path).exists());
}

#[test]
fn export_to_stdout_prints_document() {
    let data = TestData::new();
    data.new_project("Piped");
    let output = data
        .cmd()
        .args(["export", "--out", "-"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let doc: Value = serde_json::from_slice(&output).expect("backup json");
    assert_eq!(doc["projects"][0]["name"], "Piped");
    assert_eq!(doc["tasks"], json!([]));
}

#[test]
fn empty_backup_clears_everything() {
    let data = TestData::new();
    let project = data.new_project("Gone soon");
    data.new_task(&project, "also gone");
    let file = data.write_file(
        "empty.json",
        r#"{"projects": [], "tasks": [], "exportedAt": 1700000000000}"#,
    );

    data.json(&["import", file.to_str().expect("utf-8 path"), "--yes"]);
    assert!(data.stored_projects().is_empty());
    assert!(data.stored_tasks().is_empty());
}

#[test]
fn malformed_backup_is_rejected_without_changes() {
    let data = TestData::new();
    let project = data.new_project("Untouched");
    data.new_task(&project, "still here");
    let before = data.read_json("tasks.json");

    for (name, body) in [
        ("missing.json", r#"{"projects": []}"#),
        ("wrong.json", r#"{"projects": {}, "tasks": []}"#),
        ("garbage.json", "not json at all"),
        ("record.json", r#"{"projects": [{"id": "x"}], "tasks": []}"#),
    ] {
        let file = data.write_file(name, body);
        let envelope =
            data.json_failure(&["import", file.to_str().expect("utf-8 path"), "--yes"], 2);
        assert!(envelope["error"]["message"]
            .as_str()
            .expect("message")
            .starts_with("Malformed backup"));
    }

    assert_eq!(data.read_json("tasks.json"), before);
    assert_eq!(data.stored_projects().len(), 1);
}

#[test]
fn legacy_backup_is_migrated_on_import() {
    let data = TestData::new();
    let file = data.write_file(
        "legacy.json",
        &json!({
            "projects": [{ "id": "p1", "name": "Old export", "status": "cold", "createdAt": 1 }],
            "tasks": [{ "id": "t1", "projectId": "p1", "text": "picked", "friction": "none",
                        "isToday": true, "completed": false, "createdAt": 2 }],
        })
        .to_string(),
    );

    data.json(&["import", file.to_str().expect("utf-8 path"), "--yes"]);
    let projects = data.stored_projects();
    assert!(projects[0]["lastActivityAt"].is_i64());
    assert!(data.stored_tasks()[0]["isToday"].is_i64());
}

#[test]
fn import_requires_confirmation() {
    let data = TestData::new();
    data.new_project("Keep");
    let file = data.write_file("empty.json", r#"{"projects": [], "tasks": []}"#);

    data.cmd()
        .args(["import", file.to_str().expect("utf-8 path")])
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(contains("Confirmation required"));
    assert_eq!(data.stored_projects().len(), 1);
}
