//! Project and task records.
//!
//! Records are persisted and exported with camelCase keys and epoch
//! millisecond timestamps. `isToday` is either `false` or the millisecond
//! timestamp at which the task was picked for today.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::friction::Friction;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Hot,
    Cold,
    Idea,
}

impl ProjectStatus {
    /// Display order for grouped listings.
    pub const ALL: [ProjectStatus; 3] = [ProjectStatus::Hot, ProjectStatus::Cold, ProjectStatus::Idea];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Hot => "hot",
            ProjectStatus::Cold => "cold",
            ProjectStatus::Idea => "idea",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(ProjectStatus::Hot),
            "cold" => Ok(ProjectStatus::Cold),
            "idea" => Ok(ProjectStatus::Idea),
            other => Err(Error::InvalidArgument(format!(
                "invalid project status '{other}' (expected hot|cold|idea)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    pub status: ProjectStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, status: ProjectStatus, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            status,
            created_at: now,
            last_activity_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub project_id: String,
    pub text: String,
    pub friction: Friction,
    #[serde(with = "today_mark", default)]
    pub is_today: Option<DateTime<Utc>>,
    pub completed: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
}

impl Task {
    pub fn new(
        project_id: impl Into<String>,
        text: impl Into<String>,
        friction: Friction,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            text: text.into(),
            friction,
            is_today: None,
            completed: false,
            created_at: now,
            blocked_by: None,
        }
    }

    pub fn is_picked_today(&self) -> bool {
        self.is_today.is_some()
    }

    /// Stored blocker id, ignoring empty strings.
    pub fn blocker(&self) -> Option<&str> {
        self.blocked_by
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }
}

/// `isToday` on the wire: `false` when unset, epoch milliseconds when set.
mod today_mark {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(stamp) => serializer.serialize_i64(stamp.timestamp_millis()),
            None => serializer.serialize_bool(false),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TodayVisitor)
    }

    struct TodayVisitor;

    impl TodayVisitor {
        fn from_millis<E: de::Error>(millis: i64) -> Result<Option<DateTime<Utc>>, E> {
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(Some)
                .ok_or_else(|| E::custom(format!("timestamp out of range: {millis}")))
        }
    }

    impl<'de> Visitor<'de> for TodayVisitor {
        type Value = Option<DateTime<Utc>>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("false, null, or a millisecond timestamp")
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<Self::Value, E> {
            if value {
                Err(E::custom("isToday must be a timestamp, not true"))
            } else {
                Ok(None)
            }
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
            Self::from_millis(value)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
            let millis = i64::try_from(value).map_err(E::custom)?;
            Self::from_millis(millis)
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<Self::Value, E> {
            // `i64::MAX as f64` rounds up to 2^63, hence the exclusive bound.
            let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&value);
            if value.fract() != 0.0 || !in_range {
                return Err(E::custom(format!(
                    "isToday must be a whole millisecond timestamp, got {value}"
                )));
            }
            Self::from_millis(value as i64)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn task_serializes_camel_case_with_false_today() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let task = Task::new("p1", "write docs", Friction::Low, now);
        let value = serde_json::to_value(&task).unwrap();

        assert_eq!(value["projectId"], json!("p1"));
        assert_eq!(value["isToday"], json!(false));
        assert_eq!(value["createdAt"], json!(1_700_000_000_000i64));
        assert!(value.get("blockedBy").is_none());
    }

    #[test]
    fn today_mark_accepts_number_false_and_null() {
        let base = json!({
            "id": "t1",
            "projectId": "p1",
            "text": "x",
            "friction": "high",
            "completed": false,
            "createdAt": 1_700_000_000_000i64,
        });

        let mut stamped = base.clone();
        stamped["isToday"] = json!(1_700_000_500_000i64);
        let task: Task = serde_json::from_value(stamped).unwrap();
        assert_eq!(
            task.is_today.map(|stamp| stamp.timestamp_millis()),
            Some(1_700_000_500_000)
        );

        let mut unset = base.clone();
        unset["isToday"] = json!(false);
        let task: Task = serde_json::from_value(unset).unwrap();
        assert!(task.is_today.is_none());

        let mut null = base.clone();
        null["isToday"] = serde_json::Value::Null;
        let task: Task = serde_json::from_value(null).unwrap();
        assert!(task.is_today.is_none());

        let task: Task = serde_json::from_value(base).unwrap();
        assert!(task.is_today.is_none());
    }

    #[test]
    fn today_mark_rejects_bare_true() {
        let value = json!({
            "id": "t1",
            "projectId": "p1",
            "text": "x",
            "friction": "none",
            "isToday": true,
            "completed": false,
            "createdAt": 0,
        });
        assert!(serde_json::from_value::<Task>(value).is_err());
    }

    #[test]
    fn today_mark_accepts_only_whole_float_stamps() {
        let with_today = |stamp: serde_json::Value| {
            serde_json::from_value::<Task>(json!({
                "id": "t1",
                "projectId": "p1",
                "text": "x",
                "friction": "low",
                "isToday": stamp,
                "completed": false,
                "createdAt": 0,
            }))
        };

        let task = with_today(json!(1_700_000_500_000.0)).unwrap();
        assert_eq!(
            task.is_today.map(|stamp| stamp.timestamp_millis()),
            Some(1_700_000_500_000)
        );
        assert!(with_today(json!(1_700_000_500_000.5)).is_err());
        assert!(with_today(json!(1e30)).is_err());
        assert!(with_today(json!(-1e30)).is_err());
    }

    #[test]
    fn blocker_ignores_blank_ids() {
        let mut task = Task::new("p", "x", Friction::None, Utc::now());
        task.blocked_by = Some("  ".to_string());
        assert_eq!(task.blocker(), None);
        task.blocked_by = Some("abc".to_string());
        assert_eq!(task.blocker(), Some("abc"));
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Idea".parse::<ProjectStatus>().unwrap(), ProjectStatus::Idea);
        assert!("warm".parse::<ProjectStatus>().is_err());
    }
}
