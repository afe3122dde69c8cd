//! Time-based decay of project and task state.
//!
//! Two rules run on every sweep:
//! - a `hot` project idle for longer than the hot TTL turns `cold`
//! - a task picked for today on an earlier calendar day loses its today mark
//!   and its friction escalates one level
//!
//! Both rules consume their own trigger (the project is no longer hot, the
//! mark is cleared), so a sweep converges in one pass and re-running it at
//! the same or a later instant changes nothing.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use serde::Serialize;

use crate::model::{Project, ProjectStatus, Task};

/// Default idle period after which a hot project cools down.
pub const DEFAULT_HOT_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy)]
pub struct DecayPolicy {
    pub hot_ttl: Duration,
}

impl Default for DecayPolicy {
    fn default() -> Self {
        Self {
            hot_ttl: Duration::days(DEFAULT_HOT_TTL_DAYS),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    /// Projects moved from hot to cold.
    pub cooled: Vec<String>,
    /// Tasks whose today mark expired.
    pub expired: Vec<String>,
}

impl SweepReport {
    pub fn changed(&self) -> bool {
        !self.cooled.is_empty() || !self.expired.is_empty()
    }
}

/// Sweep using the local timezone for calendar-day comparisons.
pub fn sweep(
    now: DateTime<Utc>,
    policy: &DecayPolicy,
    projects: &mut [Project],
    tasks: &mut [Task],
) -> SweepReport {
    sweep_in(&Local, now, policy, projects, tasks)
}

/// Sweep with an explicit timezone for calendar-day comparisons.
pub fn sweep_in<Tz: TimeZone>(
    tz: &Tz,
    now: DateTime<Utc>,
    policy: &DecayPolicy,
    projects: &mut [Project],
    tasks: &mut [Task],
) -> SweepReport {
    let mut report = SweepReport::default();

    for project in projects.iter_mut() {
        if project.status == ProjectStatus::Hot && now - project.last_activity_at > policy.hot_ttl {
            project.status = ProjectStatus::Cold;
            report.cooled.push(project.id.clone());
        }
    }

    let today = now.with_timezone(tz).date_naive();
    for task in tasks.iter_mut() {
        if task.completed {
            continue;
        }
        let Some(picked) = task.is_today else {
            continue;
        };
        if picked.with_timezone(tz).date_naive() != today {
            task.is_today = None;
            task.friction = task.friction.escalate();
            report.expired.push(task.id.clone());
        }
    }

    if report.changed() {
        tracing::debug!(
            cooled = report.cooled.len(),
            expired = report.expired.len(),
            "decay sweep applied"
        );
    }

    report
}
