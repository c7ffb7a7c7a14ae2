//! taskdeck - File-Backed Personal Task Tracker
//!
//! This library organizes work items into three kinds - standalone tasks,
//! epics (containers of subtasks), and subtasks (children of exactly one
//! epic) - with derived status/scheduling rollups, a deduplicated
//! recently-viewed history, and durable persistence to a flat file.
//!
//! # Core Concepts
//!
//! - **Tasks / Epics / Subtasks**: One identity space; equality is by id
//! - **Rollups**: Epic status and schedule are computed from subtasks on
//!   every read, never stored
//! - **History**: Most-recently-viewed list, one entry per id, reordered
//!   on repeat access
//! - **Store**: Whole-state flat-file flush after every operation
//!
//! # Module Organization
//!
//! - `config`: Configuration loading from `taskdeck.toml`
//! - `error`: Error types and result aliases
//! - `task`: Entity model and rollup derivations
//! - `history`: Recently-viewed tracker
//! - `manager`: The task manager owning the canonical collections
//! - `storage`: Flat-file store and row encoding
//! - `managers`: Factory surface for the default configurations

pub mod config;
pub mod error;
pub mod history;
pub mod manager;
pub mod managers;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
