//! Backup documents for export and import.
//!
//! A backup is a full snapshot: `{ projects, tasks, exportedAt }`. Importing
//! one replaces both collections; there is no merge.

use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::migrate;
use crate::model::{Project, Task};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub exported_at: DateTime<Utc>,
}

impl BackupDocument {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and decode a backup.
    ///
    /// The document must be an object with array-typed `projects` and
    /// `tasks`. Records go through the same migration as persisted data, so
    /// older exports import cleanly. A missing `exportedAt` reads as `now`.
    pub fn parse(raw: &str, now: DateTime<Utc>) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| Error::MalformedBackup(format!("not valid JSON: {err}")))?;
        Self::from_value(value, now)
    }

    pub fn from_value(mut value: Value, now: DateTime<Utc>) -> Result<Self> {
        let Some(fields) = value.as_object_mut() else {
            return Err(Error::MalformedBackup("expected a JSON object".to_string()));
        };

        let projects = take_array(fields, "projects")?;
        let tasks = take_array(fields, "tasks")?;
        let exported_at = fields
            .get("exportedAt")
            .and_then(Value::as_i64)
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .unwrap_or(now);

        let projects = migrate::projects_from_value(projects, now)
            .map_err(|err| Error::MalformedBackup(format!("invalid project record: {err}")))?;
        let tasks = migrate::tasks_from_value(tasks, now)
            .map_err(|err| Error::MalformedBackup(format!("invalid task record: {err}")))?;

        Ok(Self {
            projects,
            tasks,
            exported_at,
        })
    }

    pub fn read(path: &Path, now: DateTime<Utc>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw, now)
    }
}

fn take_array(fields: &mut serde_json::Map<String, Value>, key: &str) -> Result<Value> {
    match fields.remove(key) {
        Some(value @ Value::Array(_)) => Ok(value),
        Some(_) => Err(Error::MalformedBackup(format!("`{key}` must be an array"))),
        None => Err(Error::MalformedBackup(format!("missing `{key}` array"))),
    }
}

/// Default export file name for a given day.
pub fn default_file_name(day: NaiveDate) -> String {
    format!("friction-pm-backup-{}.json", day.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn parses_empty_snapshot() {
        let doc = BackupDocument::parse(
            r#"{"projects": [], "tasks": [], "exportedAt": 1690000000000}"#,
            now(),
        )
        .unwrap();
        assert!(doc.projects.is_empty());
        assert!(doc.tasks.is_empty());
        assert_eq!(doc.exported_at.timestamp_millis(), 1_690_000_000_000);
    }

    #[test]
    fn rejects_missing_or_mistyped_arrays() {
        for raw in [
            r#"[]"#,
            r#"{"projects": []}"#,
            r#"{"projects": {}, "tasks": []}"#,
            r#"{"projects": [], "tasks": "none"}"#,
            r#"not json"#,
        ] {
            let err = BackupDocument::parse(raw, now()).expect_err(raw);
            assert!(matches!(err, Error::MalformedBackup(_)), "{raw}: {err:?}");
        }
    }

    #[test]
    fn rejects_malformed_records() {
        let raw = json!({ "projects": [{ "id": "p1" }], "tasks": [] }).to_string();
        assert!(matches!(
            BackupDocument::parse(&raw, now()),
            Err(Error::MalformedBackup(_))
        ));
    }

    #[test]
    fn migrates_legacy_records_and_defaults_export_time() {
        let raw = json!({
            "projects": [{ "id": "p1", "name": "Old", "status": "cold", "createdAt": 1 }],
            "tasks": [{
                "id": "t1", "projectId": "p1", "text": "x", "friction": "moderate",
                "isToday": true, "completed": false, "createdAt": 2
            }],
        })
        .to_string();
        let doc = BackupDocument::parse(&raw, now()).unwrap();
        assert_eq!(doc.projects[0].last_activity_at, now());
        assert_eq!(doc.tasks[0].is_today, Some(now()));
        assert_eq!(doc.exported_at, now());
    }

    #[test]
    fn export_round_trip_keeps_wire_names() {
        let doc = BackupDocument {
            projects: vec![Project::new("A", crate::model::ProjectStatus::Hot, now())],
            tasks: Vec::new(),
            exported_at: now(),
        };
        let json = doc.to_json_pretty().unwrap();
        assert!(json.contains("\"exportedAt\": 1700000000000"));
        assert!(json.contains("\"lastActivityAt\""));
        assert_eq!(BackupDocument::parse(&json, now()).unwrap(), doc);
    }

    #[test]
    fn file_name_uses_iso_date() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(default_file_name(day), "friction-pm-backup-2024-03-09.json");
    }
}
