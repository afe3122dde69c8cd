//! friction - friction-based project and task tracking
//!
//! This library provides the engine behind the `friction` CLI: projects with
//! a hot/cold/idea lifecycle, tasks rated by friction, single-parent blocker
//! links resolved into a dependency forest, and decay rules that cool idle
//! projects and expire stale today picks.
//!
//! # Core Concepts
//!
//! - **Friction**: none/low/moderate/high, costing 0/1/3/5 points
//! - **Blockers**: a task may name one task that must be finished first
//! - **Today**: a task picked for today carries the pick time; picks from an
//!   earlier day expire and raise the task's friction
//! - **Decay**: hot projects idle for longer than the TTL turn cold
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `tracker`: The store owning both collections and every mutation
//! - `resolver`: Dependency forest, orphans and next-task suggestion
//! - `decay`: Project cooling and today-pick expiry
//! - `scheduler`: Periodic sweeps on a tokio interval
//! - `friction`: Friction levels, costs and load gauge
//! - `model`: Project and task records and their wire format
//! - `migrate`: Legacy record normalization
//! - `backup`: Export/import documents
//! - `storage`: Persistence gateway (file and in-memory)
//! - `lock`: File locking and atomic writes
//! - `config`: Configuration loading from `friction.toml`
//! - `events`: JSONL event stream
//! - `output`: Human and JSON output envelopes
//! - `error`: Error types and result aliases

pub mod backup;
pub mod cli;
pub mod clock;
pub mod config;
pub mod decay;
pub mod error;
pub mod events;
pub mod friction;
pub mod lock;
pub mod migrate;
pub mod model;
pub mod output;
pub mod resolver;
pub mod scheduler;
pub mod storage;
pub mod tracker;

pub use error::{Error, Result};
