//! friction task command implementations.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::EventKind;
use crate::friction::Friction;
use crate::model::Task;
use crate::output::HumanOutput;
use crate::tracker::{BlockerUpdate, Outcome, Tracker};

use super::{confirm, missing_warning, short_id, ChangeOutput, Context, Globals};

pub struct AddOptions {
    pub project: String,
    pub text: String,
    pub friction: Option<Friction>,
}

pub struct ListOptions {
    pub project: String,
    pub all: bool,
}

pub struct RmOptions {
    pub id: String,
    pub yes: bool,
}

pub struct EditOptions {
    pub id: String,
    pub text: Option<String>,
    pub friction: Option<Friction>,
    pub blocked_by: Option<String>,
    pub unblock: bool,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    project_id: String,
    total: usize,
    tasks: Vec<&'a Task>,
}

pub fn run_add(globals: &Globals, options: AddOptions) -> Result<()> {
    require_text(Some(&options.text))?;
    let mut ctx = Context::open(globals)?;
    let project_id = ctx.project_id(&options.project)?;
    let friction = options
        .friction
        .unwrap_or(ctx.config.tasks.default_friction);

    let mut human = HumanOutput::new("Task created");
    let record = match ctx.tracker.create_task(&project_id, &options.text, friction)? {
        Outcome::Applied(task) => {
            if let Some(warning) = ctx.emit_event(EventKind::TaskCreated, &task) {
                human.push_warning(warning);
            }
            human.push_summary("ID", task.id.clone());
            human.push_summary("Project", project_id.clone());
            human.push_summary("Friction", task.friction.label());
            human.push_next_step(format!("friction task today {}", short_id(&task.id)));
            Some(task)
        }
        Outcome::Missing => {
            human.push_warning(missing_warning("project", &project_id));
            None
        }
        Outcome::Rejected => {
            return Err(Error::InvalidArgument("task text cannot be empty".to_string()))
        }
    };

    let output = ChangeOutput {
        id: record
            .as_ref()
            .map(|task| task.id.clone())
            .unwrap_or_default(),
        changed: record.is_some(),
        record,
    };
    ctx.emit("task add", &output, &human)
}

pub fn run_list(globals: &Globals, options: ListOptions) -> Result<()> {
    let ctx = Context::open(globals)?;
    let project_id = ctx.project_id(&options.project)?;

    let Some(project) = ctx.tracker.project(&project_id) else {
        let mut human = HumanOutput::new("Tasks");
        human.push_warning(missing_warning("project", &project_id));
        let output = TaskListOutput {
            project_id,
            total: 0,
            tasks: Vec::new(),
        };
        return ctx.emit("task ls", &output, &human);
    };

    let mut tasks: Vec<&Task> = ctx
        .tracker
        .project_tasks(&project_id)
        .filter(|task| options.all || !task.completed)
        .collect();
    tasks.sort_by_key(|task| (task.completed, task.created_at));

    let mut human = HumanOutput::new(format!("Tasks in {} ({})", project.name, tasks.len()));
    for task in &tasks {
        human.push_detail(ctx.task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step(format!(
            "friction task add {} \"first step\"",
            short_id(&project_id)
        ));
    }

    let output = TaskListOutput {
        project_id: project_id.clone(),
        total: tasks.len(),
        tasks,
    };
    ctx.emit("task ls", &output, &human)
}

pub fn run_done(globals: &Globals, id: &str) -> Result<()> {
    run_simple(globals, id, "task done", EventKind::TaskToggled, |tracker, id| {
        tracker.toggle_completed(id)
    })
}

pub fn run_today(globals: &Globals, id: &str) -> Result<()> {
    run_simple(globals, id, "task today", EventKind::TaskTodayToggled, |tracker, id| {
        tracker.toggle_today(id)
    })
}

pub fn run_cycle(globals: &Globals, id: &str) -> Result<()> {
    run_simple(globals, id, "task cycle", EventKind::TaskFrictionCycled, |tracker, id| {
        tracker.cycle_friction(id)
    })
}

pub fn run_rm(globals: &Globals, options: RmOptions) -> Result<()> {
    let mut ctx = Context::open(globals)?;
    let id = ctx.task_id(&options.id)?;

    if let Some(task) = ctx.tracker.task(&id) {
        let prompt = format!("Delete task '{}'?", task.text);
        if !confirm(&prompt, options.yes)? {
            let mut human = HumanOutput::new("Task kept");
            human.push_summary("ID", id.clone());
            let output: ChangeOutput<Task> = ChangeOutput {
                id,
                changed: false,
                record: None,
            };
            return ctx.emit("task rm", &output, &human);
        }
    }

    finish_change(&mut ctx, id, "task rm", EventKind::TaskDeleted, |tracker, id| {
        tracker.delete_task(id)
    })
}

pub fn run_edit(globals: &Globals, options: EditOptions) -> Result<()> {
    require_text(options.text.as_deref())?;
    let mut ctx = Context::open(globals)?;
    let id = ctx.task_id(&options.id)?;

    let requested = if options.unblock {
        Some(None)
    } else {
        options.blocked_by.map(Some)
    };
    let blocker = match BlockerUpdate::from_option(requested) {
        BlockerUpdate::Set(raw) => BlockerUpdate::Set(ctx.task_id(&raw)?),
        other => other,
    };

    let Some(task) = ctx.tracker.task(&id) else {
        return finish_change(&mut ctx, id, "task edit", EventKind::TaskEdited, |_, _| {
            Ok(Outcome::Missing)
        });
    };
    let text = options.text.unwrap_or_else(|| task.text.clone());
    let friction = options.friction.unwrap_or(task.friction);

    finish_change(&mut ctx, id, "task edit", EventKind::TaskEdited, |tracker, id| {
        tracker.update_task(id, &text, friction, blocker)
    })
}

/// Reject blank task text before anything is loaded.
fn require_text(text: Option<&str>) -> Result<()> {
    match text {
        Some(text) if text.trim().is_empty() => Err(Error::InvalidArgument(
            "task text cannot be empty".to_string(),
        )),
        _ => Ok(()),
    }
}

fn run_simple<F>(globals: &Globals, id: &str, command: &str, kind: EventKind, apply: F) -> Result<()>
where
    F: FnOnce(&mut Tracker, &str) -> Result<Outcome<Task>>,
{
    let mut ctx = Context::open(globals)?;
    let id = ctx.task_id(id)?;
    finish_change(&mut ctx, id, command, kind, apply)
}

fn finish_change<F>(
    ctx: &mut Context,
    id: String,
    command: &str,
    kind: EventKind,
    apply: F,
) -> Result<()>
where
    F: FnOnce(&mut Tracker, &str) -> Result<Outcome<Task>>,
{
    let outcome = apply(&mut ctx.tracker, &id)?;

    let mut human = HumanOutput::new(header_for(command));
    human.push_summary("ID", id.clone());
    let record = match outcome {
        Outcome::Applied(task) => {
            if let Some(warning) = ctx.emit_event(kind, &task) {
                human.push_warning(warning);
            }
            human.push_detail(ctx.task_line(&task));
            Some(task)
        }
        Outcome::Missing => {
            human.push_warning(missing_warning("task", &id));
            None
        }
        Outcome::Rejected => {
            human.push_warning("empty text; nothing changed");
            None
        }
    };

    let output = ChangeOutput {
        id,
        changed: record.is_some(),
        record,
    };
    ctx.emit(command, &output, &human)
}

fn header_for(command: &str) -> &'static str {
    match command {
        "task done" => "Task completion toggled",
        "task today" => "Today pick toggled",
        "task cycle" => "Friction cycled",
        "task rm" => "Task removed",
        "task edit" => "Task updated",
        _ => "Task changed",
    }
}
