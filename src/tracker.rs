//! The tracker: one object owning the project and task collections.
//!
//! Lifecycle: [`Tracker::open`] loads both collections through a
//! [`Gateway`], migrates legacy records and runs one decay sweep. Every
//! mutation is a transaction: take the store lock, reload the latest
//! committed collections, apply the change to that copy, save the touched
//! collection(s), and only then adopt the copy as the current snapshot. A
//! failed save leaves the snapshot (and, as far as possible, the store)
//! as it was. Reads are computed from the current snapshot on demand.
//!
//! Unknown ids and blank text never raise errors; they come back as
//! [`Outcome::Missing`] and [`Outcome::Rejected`] with nothing changed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backup::BackupDocument;
use crate::clock::{Clock, SystemClock};
use crate::decay::{self, DecayPolicy, SweepReport};
use crate::error::{Error, Result};
use crate::friction::{self, Friction};
use crate::migrate;
use crate::model::{Project, ProjectStatus, Task};
use crate::resolver::{self, Forest};
use crate::storage::{Gateway, Key};

/// Result of a mutation that may legitimately do nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    /// The referenced project or task does not exist.
    Missing,
    /// Input was blank; nothing changed.
    Rejected,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Missing | Outcome::Rejected => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

/// How `update_task` treats the stored blocker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockerUpdate {
    Keep,
    Clear,
    Set(String),
}

impl BlockerUpdate {
    /// `None` keeps the current blocker, `Some("")` clears it.
    pub fn from_option(value: Option<Option<String>>) -> Self {
        match value {
            None => BlockerUpdate::Keep,
            Some(None) => BlockerUpdate::Clear,
            Some(Some(id)) if id.trim().is_empty() => BlockerUpdate::Clear,
            Some(Some(id)) => BlockerUpdate::Set(id.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRemoval {
    pub project: Project,
    pub removed_tasks: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportReport {
    pub projects: usize,
    pub tasks: usize,
    pub replaced_projects: usize,
    pub replaced_tasks: usize,
}

/// Both collections as one unit.
#[derive(Debug, Clone, Default)]
struct Snapshot {
    projects: Vec<Project>,
    tasks: Vec<Task>,
}

impl Snapshot {
    fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|project| project.id == id)
    }

    fn touch(&mut self, project_id: &str, now: DateTime<Utc>) {
        if let Some(project) = self.projects.iter_mut().find(|project| project.id == project_id) {
            project.last_activity_at = now;
        }
    }

    /// Apply `edit` to one task and touch its project.
    fn edit_task<F>(&mut self, id: &str, now: DateTime<Utc>, edit: F) -> Outcome<Task>
    where
        F: FnOnce(&mut Task),
    {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            return Outcome::Missing;
        };
        edit(task);
        let task = task.clone();
        self.touch(&task.project_id, now);
        Outcome::Applied(task)
    }
}

/// Which collections a transaction needs written back.
#[derive(Debug, Clone, Copy)]
struct Dirty {
    projects: bool,
    tasks: bool,
}

impl Dirty {
    const NONE: Dirty = Dirty {
        projects: false,
        tasks: false,
    };
    const PROJECTS: Dirty = Dirty {
        projects: true,
        tasks: false,
    };
    const BOTH: Dirty = Dirty {
        projects: true,
        tasks: true,
    };

    fn when<T>(self, outcome: &Outcome<T>) -> Dirty {
        if outcome.is_applied() {
            self
        } else {
            Dirty::NONE
        }
    }
}

pub struct Tracker {
    gateway: Box<dyn Gateway>,
    clock: Arc<dyn Clock>,
    policy: DecayPolicy,
    snapshot: Snapshot,
    startup_sweep: SweepReport,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("policy", &self.policy)
            .field("projects", &self.snapshot.projects.len())
            .field("tasks", &self.snapshot.tasks.len())
            .finish()
    }
}

impl Tracker {
    /// Load both collections with the system clock and run the startup sweep.
    pub fn open(gateway: impl Gateway + 'static, policy: DecayPolicy) -> Result<Self> {
        Self::open_with_clock(gateway, Arc::new(SystemClock), policy)
    }

    pub fn open_with_clock(
        gateway: impl Gateway + 'static,
        clock: Arc<dyn Clock>,
        policy: DecayPolicy,
    ) -> Result<Self> {
        let mut tracker = Self {
            gateway: Box::new(gateway),
            clock,
            policy,
            snapshot: Snapshot::default(),
            startup_sweep: SweepReport::default(),
        };
        // The sweep transaction performs the initial load.
        tracker.startup_sweep = tracker.sweep()?;
        tracing::debug!(
            projects = tracker.snapshot.projects.len(),
            tasks = tracker.snapshot.tasks.len(),
            "tracker loaded"
        );
        Ok(tracker)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn policy(&self) -> &DecayPolicy {
        &self.policy
    }

    /// What the sweep run by `open` changed.
    pub fn startup_sweep(&self) -> &SweepReport {
        &self.startup_sweep
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn projects(&self) -> &[Project] {
        &self.snapshot.projects
    }

    pub fn tasks(&self) -> &[Task] {
        &self.snapshot.tasks
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.snapshot.project(id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.snapshot.tasks.iter().find(|task| task.id == id)
    }

    pub fn project_tasks<'a>(&'a self, project_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.snapshot
            .tasks
            .iter()
            .filter(move |task| task.project_id == project_id)
    }

    /// Projects with `status`, newest first.
    pub fn projects_with_status(&self, status: ProjectStatus) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self
            .snapshot
            .projects
            .iter()
            .filter(|project| project.status == status)
            .collect();
        projects.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        projects
    }

    /// Open tasks picked for today across all projects, earliest pick first.
    pub fn today(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .snapshot
            .tasks
            .iter()
            .filter(|task| task.is_today.is_some() && !task.completed)
            .collect();
        tasks.sort_by_key(|task| (task.is_today, task.created_at));
        tasks
    }

    /// Dependency forest for the open tasks of one project.
    pub fn forest<'a>(&'a self, project_id: &'a str) -> Forest<'a> {
        resolver::resolve(self.project_tasks(project_id))
    }

    pub fn is_effectively_blocked(&self, task: &Task) -> bool {
        resolver::is_effectively_blocked(task, &self.snapshot.tasks)
    }

    /// Friction points across all open tasks.
    pub fn total_open_cost(&self) -> u32 {
        friction::open_cost(&self.snapshot.tasks)
    }

    /// Resolve a full id or a unique prefix to a project id.
    ///
    /// Unknown input comes back unchanged so callers hit the silent no-op path.
    pub fn resolve_project_id(&self, input: &str) -> Result<String> {
        resolve_id(input, self.snapshot.projects.iter().map(|project| project.id.as_str()))
    }

    /// Resolve a full id or a unique prefix to a task id.
    pub fn resolve_task_id(&self, input: &str) -> Result<String> {
        resolve_id(input, self.snapshot.tasks.iter().map(|task| task.id.as_str()))
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub fn create_project(&mut self, name: &str, status: ProjectStatus) -> Result<Outcome<Project>> {
        if name.trim().is_empty() {
            return Ok(Outcome::Rejected);
        }
        let project = Project::new(name, status, self.now());
        let created = project.clone();
        self.transact(move |snapshot| {
            snapshot.projects.insert(0, project);
            Ok(Dirty::PROJECTS)
        })?;
        tracing::info!(project_id = %created.id, status = %status, "project created");
        Ok(Outcome::Applied(created))
    }

    /// Delete a project and every task it owns.
    pub fn delete_project(&mut self, id: &str) -> Result<Outcome<ProjectRemoval>> {
        let outcome = self.transact_outcome(|snapshot| {
            let Some(index) = snapshot.projects.iter().position(|project| project.id == id) else {
                return Ok((Outcome::Missing, Dirty::NONE));
            };
            let project = snapshot.projects.remove(index);
            let before = snapshot.tasks.len();
            snapshot.tasks.retain(|task| task.project_id != project.id);
            let removed_tasks = before - snapshot.tasks.len();
            let dirty = Dirty {
                projects: true,
                tasks: removed_tasks > 0,
            };
            Ok((
                Outcome::Applied(ProjectRemoval {
                    project,
                    removed_tasks,
                }),
                dirty,
            ))
        })?;
        if let Outcome::Applied(removal) = &outcome {
            tracing::info!(
                project_id = %removal.project.id,
                removed_tasks = removal.removed_tasks,
                "project deleted"
            );
        }
        Ok(outcome)
    }

    pub fn set_status(&mut self, id: &str, status: ProjectStatus) -> Result<Outcome<Project>> {
        let now = self.now();
        self.transact_outcome(|snapshot| {
            let Some(project) = snapshot.projects.iter_mut().find(|project| project.id == id)
            else {
                return Ok((Outcome::Missing, Dirty::NONE));
            };
            project.status = status;
            project.last_activity_at = now;
            Ok((Outcome::Applied(project.clone()), Dirty::PROJECTS))
        })
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    pub fn create_task(
        &mut self,
        project_id: &str,
        text: &str,
        friction: Friction,
    ) -> Result<Outcome<Task>> {
        if text.trim().is_empty() {
            return Ok(Outcome::Rejected);
        }
        let now = self.now();
        let outcome = self.transact_outcome(|snapshot| {
            if snapshot.project(project_id).is_none() {
                return Ok((Outcome::Missing, Dirty::NONE));
            }
            let task = Task::new(project_id, text, friction, now);
            snapshot.tasks.push(task.clone());
            snapshot.touch(project_id, now);
            Ok((Outcome::Applied(task), Dirty::BOTH))
        })?;
        if let Outcome::Applied(task) = &outcome {
            tracing::info!(task_id = %task.id, project_id, "task created");
        }
        Ok(outcome)
    }

    pub fn toggle_completed(&mut self, id: &str) -> Result<Outcome<Task>> {
        let now = self.now();
        self.transact_outcome(|snapshot| {
            let outcome = snapshot.edit_task(id, now, |task| task.completed = !task.completed);
            let dirty = Dirty::BOTH.when(&outcome);
            Ok((outcome, dirty))
        })
    }

    pub fn delete_task(&mut self, id: &str) -> Result<Outcome<Task>> {
        let now = self.now();
        let outcome = self.transact_outcome(|snapshot| {
            let Some(index) = snapshot.tasks.iter().position(|task| task.id == id) else {
                return Ok((Outcome::Missing, Dirty::NONE));
            };
            let task = snapshot.tasks.remove(index);
            snapshot.touch(&task.project_id, now);
            Ok((Outcome::Applied(task), Dirty::BOTH))
        })?;
        if let Outcome::Applied(task) = &outcome {
            tracing::info!(task_id = %task.id, "task deleted");
        }
        Ok(outcome)
    }

    /// Pick a task for today, or drop it from today.
    ///
    /// Picking an effectively blocked task is refused; dropping always works.
    pub fn toggle_today(&mut self, id: &str) -> Result<Outcome<Task>> {
        let now = self.now();
        self.transact_outcome(|snapshot| {
            let Some(task) = snapshot.tasks.iter().find(|task| task.id == id) else {
                return Ok((Outcome::Missing, Dirty::NONE));
            };
            if task.is_today.is_none() && resolver::is_effectively_blocked(task, &snapshot.tasks) {
                return Err(Error::TaskBlocked(id.to_string()));
            }
            let outcome = snapshot.edit_task(id, now, |task| {
                task.is_today = match task.is_today {
                    Some(_) => None,
                    None => Some(now),
                };
            });
            Ok((outcome, Dirty::BOTH))
        })
    }

    pub fn cycle_friction(&mut self, id: &str) -> Result<Outcome<Task>> {
        let now = self.now();
        self.transact_outcome(|snapshot| {
            let outcome = snapshot.edit_task(id, now, |task| task.friction = task.friction.next());
            let dirty = Dirty::BOTH.when(&outcome);
            Ok((outcome, dirty))
        })
    }

    /// Overwrite text and friction, and apply `blocker` to the stored link.
    ///
    /// A task left with a blocker is never picked for today.
    pub fn update_task(
        &mut self,
        id: &str,
        text: &str,
        friction: Friction,
        blocker: BlockerUpdate,
    ) -> Result<Outcome<Task>> {
        if text.trim().is_empty() {
            return Ok(Outcome::Rejected);
        }
        let now = self.now();
        self.transact_outcome(|snapshot| {
            let outcome = snapshot.edit_task(id, now, |task| {
                task.text = text.to_string();
                task.friction = friction;
                match blocker {
                    BlockerUpdate::Keep => {}
                    BlockerUpdate::Clear => task.blocked_by = None,
                    BlockerUpdate::Set(blocker_id) => task.blocked_by = Some(blocker_id),
                }
                if task.blocker().is_some() {
                    task.is_today = None;
                }
            });
            let dirty = Dirty::BOTH.when(&outcome);
            Ok((outcome, dirty))
        })
    }

    // =========================================================================
    // Decay and backups
    // =========================================================================

    /// Run the decay rules over the latest stored collections; persists only
    /// on change.
    pub fn sweep(&mut self) -> Result<SweepReport> {
        let now = self.now();
        let policy = self.policy;
        let mut report = SweepReport::default();
        self.transact(|snapshot| {
            report = decay::sweep(now, &policy, &mut snapshot.projects, &mut snapshot.tasks);
            Ok(Dirty {
                projects: !report.cooled.is_empty(),
                tasks: !report.expired.is_empty(),
            })
        })?;
        if report.changed() {
            tracing::info!(
                cooled = report.cooled.len(),
                expired = report.expired.len(),
                "decay sweep persisted"
            );
        }
        Ok(report)
    }

    pub fn export(&self) -> BackupDocument {
        BackupDocument {
            projects: self.snapshot.projects.clone(),
            tasks: self.snapshot.tasks.clone(),
            exported_at: self.now(),
        }
    }

    /// Replace both collections with the contents of `doc`.
    pub fn import(&mut self, doc: BackupDocument) -> Result<ImportReport> {
        let mut report = ImportReport {
            projects: doc.projects.len(),
            tasks: doc.tasks.len(),
            replaced_projects: 0,
            replaced_tasks: 0,
        };
        self.transact(|snapshot| {
            report.replaced_projects = snapshot.projects.len();
            report.replaced_tasks = snapshot.tasks.len();
            snapshot.projects = doc.projects;
            snapshot.tasks = doc.tasks;
            Ok(Dirty::BOTH)
        })?;
        tracing::info!(
            projects = report.projects,
            tasks = report.tasks,
            "backup imported"
        );
        Ok(report)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    fn transact_outcome<T, F>(&mut self, apply: F) -> Result<Outcome<T>>
    where
        F: FnOnce(&mut Snapshot) -> Result<(Outcome<T>, Dirty)>,
    {
        let mut outcome = Outcome::Missing;
        self.transact(|snapshot| {
            let (result, dirty) = apply(snapshot)?;
            outcome = result;
            Ok(dirty)
        })?;
        Ok(outcome)
    }

    /// Reload, apply and commit under the store lock.
    ///
    /// The current snapshot is replaced only when every save succeeded. If the
    /// task save fails after the project save went through, the previous
    /// projects document is written back.
    fn transact<F>(&mut self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Snapshot) -> Result<Dirty>,
    {
        let _lock = self.gateway.lock()?;
        let latest = self.load()?;
        let mut next = latest.clone();
        let dirty = apply(&mut next)?;

        if dirty.projects {
            self.save(Key::Projects, &next.projects)?;
        }
        if dirty.tasks {
            if let Err(err) = self.save(Key::Tasks, &next.tasks) {
                if dirty.projects {
                    if let Err(restore) = self.save(Key::Projects, &latest.projects) {
                        tracing::warn!(error = %restore, "failed to restore projects after a failed task save");
                    }
                }
                return Err(err);
            }
        }
        self.snapshot = next;
        Ok(())
    }

    fn load(&self) -> Result<Snapshot> {
        let now = self.now();
        let projects = load_collection(self.gateway.as_ref(), Key::Projects, |raw| {
            migrate::parse_projects(raw, now)
        })?;
        let tasks = load_collection(self.gateway.as_ref(), Key::Tasks, |raw| {
            migrate::parse_tasks(raw, now)
        })?;
        Ok(Snapshot { projects, tasks })
    }

    fn save<T: Serialize>(&self, key: Key, records: &[T]) -> Result<()> {
        let json = serde_json::to_string(records)?;
        self.gateway.save(key, &json)
    }
}

fn load_collection<T, G, F>(gateway: &G, key: Key, parse: F) -> Result<Vec<T>>
where
    G: Gateway + ?Sized,
    F: FnOnce(&str) -> serde_json::Result<Vec<T>>,
{
    let Some(raw) = gateway.load(key)? else {
        return Ok(Vec::new());
    };
    match parse(&raw) {
        Ok(records) => Ok(records),
        Err(err) => {
            tracing::warn!(collection = %key, error = %err, "failed to parse stored collection; starting empty");
            Ok(Vec::new())
        }
    }
}

fn resolve_id<'a>(input: &str, ids: impl Iterator<Item = &'a str>) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("id cannot be empty".to_string()));
    }
    let needle = trimmed.to_ascii_lowercase();

    let mut matches: Vec<&str> = Vec::new();
    for id in ids {
        let id_norm = id.to_ascii_lowercase();
        if id_norm == needle {
            return Ok(id.to_string());
        }
        if id_norm.starts_with(&needle) {
            matches.push(id);
        }
    }

    match matches.len() {
        0 => Ok(trimmed.to_string()),
        1 => Ok(matches[0].to_string()),
        count => Err(Error::AmbiguousId {
            input: trimmed.to_string(),
            count,
        }),
    }
}
