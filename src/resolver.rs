//! Dependency resolution over `blockedBy` links.
//!
//! The resolver turns the flat open-task list of a project into an ordered
//! forest. A task is a root when nothing open blocks it; every task whose
//! blocker is a given node hangs below that node. Cycles and chains hanging
//! off a cycle are never reached from a root and come back as orphans, which
//! callers display at depth 0.
//!
//! Links are plain ids resolved by lookup on every read. Nothing here
//! mutates, and malformed graphs (self-loops, cycles, dangling ids) never
//! produce an error.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::Task;

/// True when `task` names a blocker that exists in `tasks` and is still open.
///
/// `tasks` may contain completed records; a completed or missing blocker
/// leaves the link inert. Only blockers in the same project count.
pub fn is_effectively_blocked(task: &Task, tasks: &[Task]) -> bool {
    let Some(blocker_id) = task.blocker() else {
        return false;
    };
    tasks.iter().any(|candidate| {
        candidate.id == blocker_id
            && candidate.project_id == task.project_id
            && !candidate.completed
    })
}

/// One row of a flattened forest.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TreeRow<'a> {
    pub task: &'a Task,
    pub depth: usize,
    pub orphan: bool,
}

#[derive(Debug, Clone)]
pub struct Forest<'a> {
    /// Unblocked tasks, oldest first.
    pub roots: Vec<&'a Task>,
    pub orphans: Vec<&'a Task>,
    pub suggestion: Option<&'a Task>,
    /// Depth-first rows reachable from `roots`.
    tree: Vec<TreeRow<'a>>,
}

impl<'a> Forest<'a> {
    /// Depth-first rows, roots first, then orphans at depth 0.
    pub fn rows(&self) -> Vec<TreeRow<'a>> {
        let mut rows = self.tree.clone();
        rows.extend(self.orphans.iter().map(|task| TreeRow {
            task: *task,
            depth: 0,
            orphan: true,
        }));
        rows
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.orphans.is_empty()
    }
}

/// Resolve the open tasks in `tasks` into a forest.
///
/// Completed records are filtered out first, so callers may pass the full
/// task list of a project.
pub fn resolve<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Forest<'a> {
    let mut open: Vec<&'a Task> = tasks.into_iter().filter(|task| !task.completed).collect();
    open.sort_by_key(|task| task.created_at);

    let open_ids: HashSet<&str> = open.iter().map(|task| task.id.as_str()).collect();
    let blocked = |task: &Task| {
        task.blocker()
            .map(|blocker| open_ids.contains(blocker))
            .unwrap_or(false)
    };

    let mut children_of: HashMap<&str, Vec<&'a Task>> = HashMap::new();
    for task in open.iter().copied() {
        if let Some(blocker) = task.blocker() {
            children_of.entry(blocker).or_default().push(task);
        }
    }

    let roots: Vec<&'a Task> = open.iter().copied().filter(|task| !blocked(*task)).collect();

    // Explicit stack so long blocker chains cannot exhaust the call stack.
    let mut visited: HashSet<&'a str> = HashSet::new();
    let mut tree = Vec::new();
    let mut stack: Vec<(&'a Task, usize)> = roots.iter().rev().map(|task| (*task, 0)).collect();
    while let Some((task, depth)) = stack.pop() {
        if !visited.insert(task.id.as_str()) {
            continue;
        }
        tree.push(TreeRow {
            task,
            depth,
            orphan: false,
        });
        if let Some(children) = children_of.get(task.id.as_str()) {
            stack.extend(children.iter().rev().map(|child| (*child, depth + 1)));
        }
    }

    let orphans: Vec<&'a Task> = open
        .iter()
        .copied()
        .filter(|task| !visited.contains(task.id.as_str()))
        .collect();

    let suggestion = roots
        .iter()
        .copied()
        .min_by_key(|task| (task.friction.cost(), task.created_at));

    Forest {
        roots,
        orphans,
        suggestion,
        tree,
    }
}

/// The open, effectively unblocked task with the lowest friction cost,
/// oldest first on ties.
pub fn lowest_friction<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Option<&'a Task> {
    resolve(tasks).suggestion
}
