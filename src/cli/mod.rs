//! Command-line interface for friction
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in submodules grouped by what they touch.

use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::friction::Friction;
use crate::model::{ProjectStatus, Task};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::FileStorage;
use crate::tracker::Tracker;

mod data;
mod project;
mod task;
mod views;

/// friction - a friction-based project and task tracker
///
/// Rate every task by how much it resists being done, pick a few for today,
/// and let idle projects cool off on their own.
#[derive(Parser, Debug)]
#[command(name = "friction")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding projects.json, tasks.json and friction.toml
    #[arg(long, global = true, env = "FRICTION_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit JSONL events to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Show a project's open tasks as a dependency tree
    Tree {
        /// Project id or unique prefix
        project: String,
    },

    /// Suggest the lowest-friction unblocked task of a project
    Next {
        /// Project id or unique prefix
        project: String,
    },

    /// List tasks picked for today across all projects
    Today,

    /// Apply decay rules now (cool idle projects, expire stale today picks)
    Sweep,

    /// Keep running and apply decay rules on an interval
    Watch {
        /// Seconds between sweeps (defaults to decay.sweep_interval_secs)
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Write a full backup of projects and tasks
    Export {
        /// Output file, or `-` for stdout (default: friction-pm-backup-<date>.json)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Replace all projects and tasks with a backup
    Import {
        /// Backup file produced by `friction export`
        file: PathBuf,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Overview: projects per status, today picks, friction load
    Status,
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    New {
        /// Project name
        name: String,

        /// Initial status: hot, cold, idea (defaults to projects.default_status)
        #[arg(long)]
        status: Option<ProjectStatus>,
    },

    /// List projects grouped by status
    Ls {
        /// Only show projects with this status
        #[arg(long)]
        status: Option<ProjectStatus>,
    },

    /// Change a project's status
    Status {
        /// Project id or unique prefix
        id: String,

        /// New status: hot, cold, idea
        status: ProjectStatus,
    },

    /// Delete a project and all of its tasks
    Rm {
        /// Project id or unique prefix
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task to a project
    Add {
        /// Project id or unique prefix
        project: String,

        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Friction: none, low, mod(erate), high (defaults to tasks.default_friction)
        #[arg(short, long)]
        friction: Option<Friction>,
    },

    /// List a project's tasks
    Ls {
        /// Project id or unique prefix
        project: String,

        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },

    /// Toggle a task between open and completed
    Done {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id or unique prefix
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Pick a task for today, or drop it from today
    Today {
        /// Task id or unique prefix
        id: String,
    },

    /// Cycle friction: none -> low -> moderate -> high -> none
    Cycle {
        /// Task id or unique prefix
        id: String,
    },

    /// Edit a task's text, friction or blocker
    Edit {
        /// Task id or unique prefix
        id: String,

        /// New text
        #[arg(long)]
        text: Option<String>,

        /// New friction level
        #[arg(short, long)]
        friction: Option<Friction>,

        /// Task that must be completed first (id or unique prefix)
        #[arg(long, conflicts_with = "unblock")]
        blocked_by: Option<String>,

        /// Remove the blocker
        #[arg(long)]
        unblock: bool,
    },
}

/// Flags shared by every command.
#[derive(Debug, Clone)]
pub(crate) struct Globals {
    pub data_dir: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
    pub events: Option<String>,
}

/// An opened tracker plus everything a command needs to report on it.
pub(crate) struct Context {
    pub tracker: Tracker,
    pub config: Config,
    pub storage: FileStorage,
    output: OutputOptions,
    events: Option<EventSink>,
}

impl Context {
    pub fn open(globals: &Globals) -> Result<Self> {
        let storage = FileStorage::discover(globals.data_dir.clone())?;
        let config = Config::load_from_dir(storage.data_dir());
        let tracker = Tracker::open(storage.clone(), config.decay.policy())?;

        let destination = EventDestination::parse(globals.events.as_deref());
        let events = destination.as_ref().map(|dest| dest.open()).transpose()?;
        let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));

        let mut ctx = Self {
            tracker,
            config,
            storage,
            output: OutputOptions {
                json: globals.json && !events_to_stdout,
                quiet: globals.quiet || events_to_stdout,
            },
            events,
        };

        let startup = ctx.tracker.startup_sweep().clone();
        if startup.changed() {
            if let Some(warning) = ctx.emit_event(EventKind::SweepApplied, &startup) {
                tracing::warn!("{warning}");
            }
        }
        Ok(ctx)
    }

    pub fn output(&self) -> OutputOptions {
        self.output
    }

    pub fn emit<T: Serialize>(&self, command: &str, data: &T, human: &HumanOutput) -> Result<()> {
        emit_success(self.output, command, data, Some(human))
    }

    /// Mirror a change to the event stream; returns a warning on failure.
    pub fn emit_event<T: Serialize>(&mut self, kind: EventKind, data: &T) -> Option<String> {
        let now = self.tracker.now();
        let sink = self.events.as_mut()?;
        let event = match Event::new(kind, now).with_data(data) {
            Ok(event) => event,
            Err(err) => return Some(format!("event output failed: {err}")),
        };
        if let Err(err) = sink.emit(&event) {
            return Some(format!("event output failed: {err}"));
        }
        None
    }

    pub fn take_events(&mut self) -> Option<EventSink> {
        self.events.take()
    }

    pub fn project_id(&self, input: &str) -> Result<String> {
        self.tracker.resolve_project_id(input)
    }

    pub fn task_id(&self, input: &str) -> Result<String> {
        self.tracker.resolve_task_id(input)
    }

    /// One-line rendering of a task for human output.
    pub fn task_line(&self, task: &Task) -> String {
        let mut line = format!(
            "{} [{}] {}",
            short_id(&task.id),
            task.friction.label(),
            task.text
        );
        if task.completed {
            line.push_str(" (done)");
        }
        if task.is_picked_today() {
            line.push_str(" (today)");
        }
        if !task.completed && self.tracker.is_effectively_blocked(task) {
            if let Some(blocker) = task.blocker() {
                line.push_str(&format!(" (blocked by {})", short_id(blocker)));
            }
        }
        line
    }
}

/// Result of a command that names a record which may not exist.
#[derive(Serialize)]
pub(crate) struct ChangeOutput<T: Serialize> {
    pub id: String,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<T>,
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Ask before destructive commands.
///
/// `--yes` skips the prompt; without a terminal the command is refused.
/// Returns `false` when the user declines.
pub(crate) fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Err(Error::ConfirmationRequired(prompt.to_string()));
    }
    let mut stderr = std::io::stderr();
    write!(stderr, "{prompt} [y/N] ")?;
    stderr.flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

pub(crate) fn missing_warning(kind: &str, id: &str) -> String {
    format!("no {kind} with id '{id}'; nothing changed")
}

impl Cli {
    fn globals(&self) -> Globals {
        Globals {
            data_dir: self.data_dir.clone(),
            json: self.json,
            quiet: self.quiet,
            events: self.events.clone(),
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = self.globals();
        match self.command {
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New { name, status } => {
                    project::run_new(&globals, project::NewOptions { name, status })
                }
                ProjectCommands::Ls { status } => {
                    project::run_list(&globals, project::ListOptions { status })
                }
                ProjectCommands::Status { id, status } => {
                    project::run_status(&globals, project::StatusOptions { id, status })
                }
                ProjectCommands::Rm { id, yes } => {
                    project::run_rm(&globals, project::RmOptions { id, yes })
                }
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    project,
                    text,
                    friction,
                } => task::run_add(
                    &globals,
                    task::AddOptions {
                        project,
                        text: text.join(" "),
                        friction,
                    },
                ),
                TaskCommands::Ls { project, all } => {
                    task::run_list(&globals, task::ListOptions { project, all })
                }
                TaskCommands::Done { id } => task::run_done(&globals, &id),
                TaskCommands::Rm { id, yes } => {
                    task::run_rm(&globals, task::RmOptions { id, yes })
                }
                TaskCommands::Today { id } => task::run_today(&globals, &id),
                TaskCommands::Cycle { id } => task::run_cycle(&globals, &id),
                TaskCommands::Edit {
                    id,
                    text,
                    friction,
                    blocked_by,
                    unblock,
                } => task::run_edit(
                    &globals,
                    task::EditOptions {
                        id,
                        text,
                        friction,
                        blocked_by,
                        unblock,
                    },
                ),
            },
            Commands::Tree { project } => views::run_tree(&globals, &project),
            Commands::Next { project } => views::run_next(&globals, &project),
            Commands::Today => views::run_today(&globals),
            Commands::Status => views::run_status(&globals),
            Commands::Sweep => data::run_sweep(&globals),
            Commands::Watch { interval, duration } => {
                data::run_watch(&globals, data::WatchOptions { interval, duration })
            }
            Commands::Export { out } => data::run_export(&globals, data::ExportOptions { out }),
            Commands::Import { file, yes } => {
                data::run_import(&globals, data::ImportOptions { file, yes })
            }
        }
    }
}
