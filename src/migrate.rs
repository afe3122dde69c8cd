//! Schema migration for persisted and imported records.
//!
//! Older payloads carry shapes the current model does not accept:
//! - projects without `lastActivityAt`
//! - tasks whose `isToday` is `true` or a string instead of a timestamp
//!
//! Migration rewrites the raw JSON before typed deserialization, so the rest
//! of the crate only ever sees `isToday` as unset or a timestamp.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{Project, Task};

/// Fill in fields missing from a legacy project record.
pub fn normalize_project(record: &mut Value, now: DateTime<Utc>) {
    let Some(fields) = record.as_object_mut() else {
        return;
    };
    let missing = fields
        .get("lastActivityAt")
        .map(Value::is_null)
        .unwrap_or(true);
    if missing {
        fields.insert("lastActivityAt".to_string(), now.timestamp_millis().into());
    }
}

/// Normalize a legacy task record's `isToday`.
///
/// `true` and any string mean "picked", with no usable time; they become
/// `now`. `null` and absence become `false`. Numbers are kept.
pub fn normalize_task(record: &mut Value, now: DateTime<Utc>) {
    let Some(fields) = record.as_object_mut() else {
        return;
    };
    let replacement = match fields.get("isToday") {
        None | Some(Value::Null) => Some(Value::Bool(false)),
        Some(Value::Bool(true)) | Some(Value::String(_)) => Some(now.timestamp_millis().into()),
        Some(_) => None,
    };
    if let Some(value) = replacement {
        fields.insert("isToday".to_string(), value);
    }
}

/// Migrate and decode a project collection.
pub fn projects_from_value(value: Value, now: DateTime<Utc>) -> serde_json::Result<Vec<Project>> {
    decode(value, |record| normalize_project(record, now))
}

/// Migrate and decode a task collection.
pub fn tasks_from_value(value: Value, now: DateTime<Utc>) -> serde_json::Result<Vec<Task>> {
    decode(value, |record| normalize_task(record, now))
}

/// Parse, migrate and decode a raw project document.
pub fn parse_projects(raw: &str, now: DateTime<Utc>) -> serde_json::Result<Vec<Project>> {
    projects_from_value(serde_json::from_str(raw)?, now)
}

/// Parse, migrate and decode a raw task document.
pub fn parse_tasks(raw: &str, now: DateTime<Utc>) -> serde_json::Result<Vec<Task>> {
    tasks_from_value(serde_json::from_str(raw)?, now)
}

fn decode<T, F>(mut value: Value, mut normalize: F) -> serde_json::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    F: FnMut(&mut Value),
{
    if let Some(records) = value.as_array_mut() {
        records.iter_mut().for_each(&mut normalize);
    }
    serde_json::from_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::friction::Friction;
    use crate::model::ProjectStatus;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn missing_last_activity_defaults_to_now() {
        let raw = json!([
            { "id": "p1", "name": "Legacy", "status": "hot", "createdAt": 1_600_000_000_000i64 },
            { "id": "p2", "name": "Current", "status": "idea", "createdAt": 1_600_000_000_000i64,
              "lastActivityAt": 1_650_000_000_000i64 },
        ]);
        let projects = projects_from_value(raw, now()).unwrap();

        assert_eq!(projects[0].last_activity_at, now());
        assert_eq!(projects[0].status, ProjectStatus::Hot);
        assert_eq!(projects[1].last_activity_at.timestamp_millis(), 1_650_000_000_000);
    }

    #[test]
    fn legacy_today_values_are_normalized() {
        let task = |id: &str, today: Value| {
            json!({
                "id": id, "projectId": "p1", "text": id, "friction": "low",
                "isToday": today, "completed": false, "createdAt": 1_600_000_000_000i64,
            })
        };
        let raw = Value::Array(vec![
            task("flag", json!(true)),
            task("text", json!("2024-01-01")),
            task("off", json!(false)),
            task("stamp", json!(1_699_999_000_000i64)),
            task("null", Value::Null),
        ]);

        let tasks = tasks_from_value(raw, now()).unwrap();
        assert_eq!(tasks[0].is_today, Some(now()));
        assert_eq!(tasks[1].is_today, Some(now()));
        assert_eq!(tasks[2].is_today, None);
        assert_eq!(
            tasks[3].is_today.map(|stamp| stamp.timestamp_millis()),
            Some(1_699_999_000_000)
        );
        assert_eq!(tasks[4].is_today, None);
        assert!(tasks.iter().all(|task| task.friction == Friction::Low));
    }

    #[test]
    fn blocked_by_is_kept_verbatim() {
        let raw = r#"[{"id":"t1","projectId":"p1","text":"x","friction":"none",
            "isToday":false,"completed":false,"createdAt":0,"blockedBy":"gone"}]"#;
        let tasks = parse_tasks(raw, now()).unwrap();
        assert_eq!(tasks[0].blocked_by.as_deref(), Some("gone"));
    }

    #[test]
    fn corrupt_documents_are_errors() {
        assert!(parse_projects("{not json", now()).is_err());
        assert!(parse_tasks("{\"tasks\": []}", now()).is_err());
    }
}
