//! friction project command implementations.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::friction::Load;
use crate::model::{Project, ProjectStatus};
use crate::output::HumanOutput;
use crate::tracker::{Outcome, ProjectRemoval};

use super::{confirm, missing_warning, short_id, ChangeOutput, Context, Globals};

pub struct NewOptions {
    pub name: String,
    pub status: Option<ProjectStatus>,
}

pub struct ListOptions {
    pub status: Option<ProjectStatus>,
}

pub struct StatusOptions {
    pub id: String,
    pub status: ProjectStatus,
}

pub struct RmOptions {
    pub id: String,
    pub yes: bool,
}

#[derive(Serialize)]
pub(crate) struct ProjectSummary<'a> {
    #[serde(flatten)]
    pub project: &'a Project,
    pub open_tasks: usize,
    pub completed_tasks: usize,
    pub load: Load,
}

#[derive(Serialize)]
struct ProjectGroup<'a> {
    status: ProjectStatus,
    projects: Vec<ProjectSummary<'a>>,
}

#[derive(Serialize)]
struct ProjectListOutput<'a> {
    total: usize,
    groups: Vec<ProjectGroup<'a>>,
}

pub(crate) fn summarize<'a>(ctx: &'a Context, project: &'a Project) -> ProjectSummary<'a> {
    let (completed, open): (Vec<_>, Vec<_>) = ctx
        .tracker
        .project_tasks(&project.id)
        .partition(|task| task.completed);
    ProjectSummary {
        project,
        open_tasks: open.len(),
        completed_tasks: completed.len(),
        load: Load::measure(open, &ctx.config.gauge),
    }
}

pub fn run_new(globals: &Globals, options: NewOptions) -> Result<()> {
    if options.name.trim().is_empty() {
        return Err(Error::InvalidArgument(
            "project name cannot be empty".to_string(),
        ));
    }
    let mut ctx = Context::open(globals)?;
    let status = options
        .status
        .unwrap_or(ctx.config.projects.default_status);
    let project = match ctx.tracker.create_project(&options.name, status)? {
        Outcome::Applied(project) => project,
        Outcome::Missing | Outcome::Rejected => {
            return Err(Error::InvalidArgument(
                "project name cannot be empty".to_string(),
            ))
        }
    };

    let event_warning = ctx.emit_event(EventKind::ProjectCreated, &project);
    let mut human = HumanOutput::new("Project created");
    if let Some(warning) = event_warning {
        human.push_warning(warning);
    }
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    human.push_summary("Status", project.status.to_string());
    human.push_next_step(format!(
        "friction task add {} \"first step\"",
        short_id(&project.id)
    ));

    ctx.emit("project new", &project, &human)
}

pub fn run_list(globals: &Globals, options: ListOptions) -> Result<()> {
    let ctx = Context::open(globals)?;
    let statuses: Vec<ProjectStatus> = match options.status {
        Some(status) => vec![status],
        None => ProjectStatus::ALL.to_vec(),
    };

    let groups: Vec<ProjectGroup<'_>> = statuses
        .into_iter()
        .map(|status| ProjectGroup {
            status,
            projects: ctx
                .tracker
                .projects_with_status(status)
                .into_iter()
                .map(|project| summarize(&ctx, project))
                .collect(),
        })
        .collect();
    let total = groups.iter().map(|group| group.projects.len()).sum();

    let mut human = HumanOutput::new(format!("Projects ({total})"));
    for group in &groups {
        if group.projects.is_empty() {
            continue;
        }
        human.push_detail(format!("{}:", group.status));
        for summary in &group.projects {
            human.push_detail(format!(
                "  {} {}  open={} load={} ({}%, {})",
                short_id(&summary.project.id),
                summary.project.name,
                summary.open_tasks,
                summary.load.score,
                summary.load.percent,
                summary.load.band.as_str()
            ));
        }
    }
    if total == 0 {
        human.push_next_step("friction project new <name>");
    }

    ctx.emit("project ls", &ProjectListOutput { total, groups }, &human)
}

pub fn run_status(globals: &Globals, options: StatusOptions) -> Result<()> {
    let mut ctx = Context::open(globals)?;
    let id = ctx.project_id(&options.id)?;
    let outcome = ctx.tracker.set_status(&id, options.status)?;

    let mut human = HumanOutput::new("Project status");
    human.push_summary("ID", id.clone());
    let record = match outcome {
        Outcome::Applied(project) => {
            if let Some(warning) = ctx.emit_event(EventKind::ProjectStatusChanged, &project) {
                human.push_warning(warning);
            }
            human.push_summary("Name", project.name.clone());
            human.push_summary("Status", project.status.to_string());
            Some(project)
        }
        Outcome::Missing | Outcome::Rejected => {
            human.push_warning(missing_warning("project", &id));
            None
        }
    };

    let output = ChangeOutput {
        id,
        changed: record.is_some(),
        record,
    };
    ctx.emit("project status", &output, &human)
}

pub fn run_rm(globals: &Globals, options: RmOptions) -> Result<()> {
    let mut ctx = Context::open(globals)?;
    let id = ctx.project_id(&options.id)?;
    let mut human = HumanOutput::new("Project removed");
    human.push_summary("ID", id.clone());

    let Some(project) = ctx.tracker.project(&id) else {
        human.push_warning(missing_warning("project", &id));
        let output: ChangeOutput<ProjectRemoval> = ChangeOutput {
            id,
            changed: false,
            record: None,
        };
        return ctx.emit("project rm", &output, &human);
    };

    let open = ctx.tracker.project_tasks(&id).count();
    let prompt = format!(
        "Delete project '{}' and its {} task(s)?",
        project.name, open
    );
    if !confirm(&prompt, options.yes)? {
        let mut human = HumanOutput::new("Project kept");
        human.push_summary("ID", id.clone());
        let output: ChangeOutput<ProjectRemoval> = ChangeOutput {
            id,
            changed: false,
            record: None,
        };
        return ctx.emit("project rm", &output, &human);
    }

    let record = ctx.tracker.delete_project(&id)?.applied();
    if let Some(removal) = record.as_ref() {
        if let Some(warning) = ctx.emit_event(EventKind::ProjectDeleted, removal) {
            human.push_warning(warning);
        }
        human.push_summary("Name", removal.project.name.clone());
        human.push_summary("Tasks removed", removal.removed_tasks.to_string());
    }

    let output = ChangeOutput {
        id,
        changed: record.is_some(),
        record,
    };
    ctx.emit("project rm", &output, &human)
}
