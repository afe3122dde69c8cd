#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A scratch data directory for one test.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `friction` pointed at this data dir, with ambient env cleared.
    pub fn cmd(&self) -> Command {
        let mut cmd = friction_cmd();
        cmd.current_dir(self.dir.path());
        cmd.arg("--data-dir").arg(self.dir.path());
        cmd
    }

    /// Run with `--json`, assert success and return the `data` payload.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(value["status"], "success", "{value}");
        value["data"].clone()
    }

    /// Run with `--json`, assert exit `code` and return the whole envelope.
    pub fn json_failure(&self, args: &[&str], code: i32) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .write_stdin("")
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json error envelope")
    }

    pub fn new_project(&self, name: &str) -> String {
        let data = self.json(&["project", "new", name]);
        data["id"].as_str().expect("project id").to_string()
    }

    pub fn new_task(&self, project: &str, text: &str) -> String {
        let data = self.json(&["task", "add", project, text]);
        data["record"]["id"].as_str().expect("task id").to_string()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read_json(&self, rel_path: &str) -> Value {
        let raw = fs::read_to_string(self.dir.path().join(rel_path)).expect("read file");
        serde_json::from_str(&raw).expect("parse json")
    }

    pub fn stored_tasks(&self) -> Vec<Value> {
        self.read_json("tasks.json")
            .as_array()
            .cloned()
            .expect("tasks array")
    }

    pub fn stored_projects(&self) -> Vec<Value> {
        self.read_json("projects.json")
            .as_array()
            .cloned()
            .expect("projects array")
    }
}

pub fn friction_cmd() -> Command {
    let mut cmd = Command::cargo_bin("friction").expect("binary");
    cmd.env_remove("FRICTION_DATA_DIR");
    cmd.env_remove("RUST_LOG");
    cmd
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;
