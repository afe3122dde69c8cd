//! Decay sweeps, the watch loop, and backup export/import.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;

use crate::backup::{self, BackupDocument};
use crate::decay::SweepReport;
use crate::error::{Error, Result};
use crate::events::{Event, EventKind};
use crate::lock;
use crate::output::HumanOutput;
use crate::scheduler::{SharedTracker, Sweeper};
use crate::tracker::ImportReport;

use super::{confirm, Context, Globals};

pub struct WatchOptions {
    pub interval: Option<u64>,
    pub duration: Option<u64>,
}

pub struct ExportOptions {
    pub out: Option<PathBuf>,
}

pub struct ImportOptions {
    pub file: PathBuf,
    pub yes: bool,
}

#[derive(Serialize)]
struct ExportOutput {
    path: String,
    projects: usize,
    tasks: usize,
    exported_at: i64,
}

#[derive(Serialize)]
struct ImportOutput {
    file: String,
    imported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ImportReport>,
}

#[derive(Serialize)]
struct WatchOutput {
    interval_secs: u64,
    sweeps_applied: usize,
    cooled: usize,
    expired: usize,
}

pub fn run_sweep(globals: &Globals) -> Result<()> {
    let mut ctx = Context::open(globals)?;
    // Opening already ran one pass; report it together with this one.
    let mut report = ctx.tracker.startup_sweep().clone();
    let fresh = ctx.tracker.sweep()?;
    if fresh.changed() {
        if let Some(warning) = ctx.emit_event(EventKind::SweepApplied, &fresh) {
            tracing::warn!("{warning}");
        }
    }
    report.cooled.extend(fresh.cooled);
    report.expired.extend(fresh.expired);

    let mut human = HumanOutput::new("Decay sweep");
    human.push_summary("Projects cooled", report.cooled.len().to_string());
    human.push_summary("Today picks expired", report.expired.len().to_string());
    for id in &report.cooled {
        if let Some(project) = ctx.tracker.project(id) {
            human.push_detail(format!("cooled: {}", project.name));
        }
    }
    for id in &report.expired {
        if let Some(task) = ctx.tracker.task(id) {
            human.push_detail(format!("expired: {}", ctx.task_line(task)));
        }
    }
    ctx.emit("sweep", &report, &human)
}

pub fn run_watch(globals: &Globals, options: WatchOptions) -> Result<()> {
    if options.interval == Some(0) {
        return Err(Error::InvalidArgument(
            "--interval must be greater than zero".to_string(),
        ));
    }
    let mut ctx = Context::open(globals)?;
    let interval = options
        .interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| ctx.config.decay.sweep_interval());
    let interval_secs = interval.as_secs();
    let output = ctx.output();
    let mut events = ctx.take_events();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let Context { tracker, .. } = ctx;
    let shared: SharedTracker = Arc::new(Mutex::new(tracker));
    let totals = Arc::new(Mutex::new(WatchOutput {
        interval_secs,
        sweeps_applied: 0,
        cooled: 0,
        expired: 0,
    }));

    if !output.json && !output.quiet {
        eprintln!("watching; sweeping every {interval_secs}s (Ctrl-C to stop)");
    }
    tracing::info!(interval_secs, "watch started");

    let seen = Arc::clone(&totals);
    runtime.block_on(async move {
        let sweeper = Sweeper::spawn(
            Arc::clone(&shared),
            interval,
            move |report: &SweepReport| {
                {
                    let mut totals = seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    totals.sweeps_applied += 1;
                    totals.cooled += report.cooled.len();
                    totals.expired += report.expired.len();
                }
                if let Some(sink) = events.as_mut() {
                    let emitted = Event::new(EventKind::SweepApplied, chrono::Utc::now())
                        .with_data(report)
                        .and_then(|event| sink.emit(&event));
                    if let Err(err) = emitted {
                        tracing::warn!(error = %err, "event output failed");
                    }
                }
                if !output.json && !output.quiet {
                    eprintln!(
                        "sweep: cooled {} project(s), expired {} today pick(s)",
                        report.cooled.len(),
                        report.expired.len()
                    );
                }
            },
        );

        match options.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %err, "failed to listen for Ctrl-C");
                }
            }
        }
        sweeper.shutdown().await;
    });
    tracing::info!("watch stopped");

    let totals = totals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut human = HumanOutput::new("Watch stopped");
    human.push_summary("Sweeps applied", totals.sweeps_applied.to_string());
    human.push_summary("Projects cooled", totals.cooled.to_string());
    human.push_summary("Today picks expired", totals.expired.to_string());
    crate::output::emit_success(output, "watch", &*totals, Some(&human))
}

pub fn run_export(globals: &Globals, options: ExportOptions) -> Result<()> {
    let ctx = Context::open(globals)?;
    let doc = ctx.tracker.export();
    let json = doc.to_json_pretty()?;

    let to_stdout = options
        .out
        .as_ref()
        .map(|path| path.as_os_str() == "-")
        .unwrap_or(false);
    if to_stdout {
        println!("{json}");
        return Ok(());
    }

    let path = options
        .out
        .unwrap_or_else(|| PathBuf::from(backup::default_file_name(Local::now().date_naive())));
    lock::write_atomic(&path, json.as_bytes())?;
    tracing::info!(path = %path.display(), "backup exported");

    let mut human = HumanOutput::new("Backup exported");
    human.push_summary("File", path.display().to_string());
    human.push_summary("Projects", doc.projects.len().to_string());
    human.push_summary("Tasks", doc.tasks.len().to_string());
    human.push_next_step(format!("friction import {}", path.display()));

    let output = ExportOutput {
        path: path.display().to_string(),
        projects: doc.projects.len(),
        tasks: doc.tasks.len(),
        exported_at: doc.exported_at.timestamp_millis(),
    };
    ctx.emit("export", &output, &human)
}

pub fn run_import(globals: &Globals, options: ImportOptions) -> Result<()> {
    let mut ctx = Context::open(globals)?;
    // Validate before asking, so a bad file never prompts and never mutates.
    let doc = BackupDocument::read(&options.file, ctx.tracker.now())?;
    let file = options.file.display().to_string();

    let prompt = format!(
        "Replace {} project(s) and {} task(s) with {} project(s) and {} task(s) from {file}?",
        ctx.tracker.projects().len(),
        ctx.tracker.tasks().len(),
        doc.projects.len(),
        doc.tasks.len(),
    );
    if !confirm(&prompt, options.yes)? {
        let human = HumanOutput::new("Import cancelled");
        let output = ImportOutput {
            file,
            imported: false,
            report: None,
        };
        return ctx.emit("import", &output, &human);
    }

    let report = ctx.tracker.import(doc)?;
    let mut human = HumanOutput::new("Backup imported");
    if let Some(warning) = ctx.emit_event(EventKind::BackupImported, &report) {
        human.push_warning(warning);
    }
    human.push_summary("File", file.clone());
    human.push_summary("Projects", report.projects.to_string());
    human.push_summary("Tasks", report.tasks.to_string());

    let output = ImportOutput {
        file,
        imported: true,
        report: Some(report),
    };
    ctx.emit("import", &output, &human)
}
