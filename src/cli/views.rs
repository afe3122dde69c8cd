//! Read-only views: dependency tree, next suggestion, today list, overview.

use serde::Serialize;

use crate::error::Result;
use crate::friction::Load;
use crate::model::{Project, ProjectStatus, Task};
use crate::output::HumanOutput;
use crate::resolver::TreeRow;

use super::project::{summarize, ProjectSummary};
use super::{missing_warning, short_id, Context, Globals};

#[derive(Serialize)]
struct TreeOutput<'a> {
    project_id: String,
    rows: Vec<TreeRow<'a>>,
    orphans: usize,
    suggestion: Option<&'a Task>,
}

#[derive(Serialize)]
struct NextOutput<'a> {
    project_id: String,
    suggestion: Option<&'a Task>,
}

#[derive(Serialize)]
struct TodayEntry<'a> {
    #[serde(flatten)]
    task: &'a Task,
    project_name: Option<&'a str>,
}

#[derive(Serialize)]
struct TodayOutput<'a> {
    total: usize,
    tasks: Vec<TodayEntry<'a>>,
}

#[derive(Serialize)]
struct StatusCount {
    status: ProjectStatus,
    count: usize,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    data_dir: String,
    projects: Vec<StatusCount>,
    open_tasks: usize,
    today: usize,
    total_friction: u32,
    loads: Vec<ProjectSummary<'a>>,
}

pub fn run_tree(globals: &Globals, project: &str) -> Result<()> {
    let ctx = Context::open(globals)?;
    let project_id = ctx.project_id(project)?;

    let Some(project) = ctx.tracker.project(&project_id) else {
        return emit_missing_project(&ctx, "tree", project_id);
    };
    let forest = ctx.tracker.forest(&project_id);
    let rows = forest.rows();

    let mut human = HumanOutput::new(format!("{} ({} open)", project.name, rows.len()));
    for row in &rows {
        let indent = "  ".repeat(row.depth);
        let marker = if row.orphan { " (cycle)" } else { "" };
        human.push_detail(format!("{indent}{}{marker}", ctx.task_line(row.task)));
    }
    if !forest.orphans.is_empty() {
        human.push_warning(format!(
            "{} task(s) are caught in a blocker cycle; break one with `friction task edit <id> --unblock`",
            forest.orphans.len()
        ));
    }
    match forest.suggestion {
        Some(task) => human.push_summary("Suggested next", ctx.task_line(task)),
        None if rows.is_empty() => {
            human.push_next_step(format!(
                "friction task add {} \"first step\"",
                short_id(&project_id)
            ));
        }
        None => {}
    }

    let output = TreeOutput {
        project_id: project_id.clone(),
        orphans: forest.orphans.len(),
        suggestion: forest.suggestion,
        rows,
    };
    ctx.emit("tree", &output, &human)
}

pub fn run_next(globals: &Globals, project: &str) -> Result<()> {
    let ctx = Context::open(globals)?;
    let project_id = ctx.project_id(project)?;

    if ctx.tracker.project(&project_id).is_none() {
        return emit_missing_project(&ctx, "next", project_id);
    }
    let suggestion = ctx.tracker.forest(&project_id).suggestion;

    let mut human = HumanOutput::new("Next task");
    match suggestion {
        Some(task) => {
            human.push_detail(ctx.task_line(task));
            human.push_next_step(format!("friction task today {}", short_id(&task.id)));
        }
        None => human.push_detail("nothing unblocked to do"),
    }

    let output = NextOutput {
        project_id: project_id.clone(),
        suggestion,
    };
    ctx.emit("next", &output, &human)
}

pub fn run_today(globals: &Globals) -> Result<()> {
    let ctx = Context::open(globals)?;
    let tasks: Vec<TodayEntry<'_>> = ctx
        .tracker
        .today()
        .into_iter()
        .map(|task| TodayEntry {
            task,
            project_name: ctx
                .tracker
                .project(&task.project_id)
                .map(|project: &Project| project.name.as_str()),
        })
        .collect();

    let mut human = HumanOutput::new(format!("Today ({})", tasks.len()));
    for entry in &tasks {
        let project = entry.project_name.unwrap_or("?");
        human.push_detail(format!("{}  <{project}>", ctx.task_line(entry.task)));
    }
    if tasks.is_empty() {
        human.push_next_step("friction task today <task-id>");
    }

    let load = Load::measure(tasks.iter().map(|entry| entry.task), &ctx.config.gauge);
    human.push_summary("Friction", format!("{} ({})", load.score, load.band.as_str()));

    let output = TodayOutput {
        total: tasks.len(),
        tasks,
    };
    ctx.emit("today", &output, &human)
}

pub fn run_status(globals: &Globals) -> Result<()> {
    let ctx = Context::open(globals)?;
    let projects: Vec<StatusCount> = ProjectStatus::ALL
        .iter()
        .map(|&status| StatusCount {
            status,
            count: ctx.tracker.projects_with_status(status).len(),
        })
        .collect();
    let open_tasks = ctx.tracker.tasks().iter().filter(|task| !task.completed).count();
    let today = ctx.tracker.today().len();
    let total_friction = ctx.tracker.total_open_cost();
    let loads: Vec<ProjectSummary<'_>> = ctx
        .tracker
        .projects_with_status(ProjectStatus::Hot)
        .into_iter()
        .map(|project| summarize(&ctx, project))
        .collect();

    let mut human = HumanOutput::new("friction status");
    for count in &projects {
        human.push_summary(format!("{} projects", count.status), count.count.to_string());
    }
    human.push_summary("Open tasks", open_tasks.to_string());
    human.push_summary("Today", today.to_string());
    human.push_summary("Total friction", total_friction.to_string());
    for summary in &loads {
        human.push_detail(format!(
            "{} {}: {} ({}%, {})",
            short_id(&summary.project.id),
            summary.project.name,
            summary.load.score,
            summary.load.percent,
            summary.load.band.as_str()
        ));
    }

    let output = StatusOutput {
        data_dir: ctx.storage.data_dir().display().to_string(),
        projects,
        open_tasks,
        today,
        total_friction,
        loads,
    };
    ctx.emit("status", &output, &human)
}

fn emit_missing_project(ctx: &Context, command: &str, project_id: String) -> Result<()> {
    let mut human = HumanOutput::new(command.to_string());
    human.push_warning(missing_warning("project", &project_id));
    let output = NextOutput {
        project_id,
        suggestion: None,
    };
    ctx.emit(command, &output, &human)
}
