//! Default managers.
//!
//! Construction-time choices only: an in-memory manager, a manager flushing
//! to the well-known store file (`tasks.csv`, overridable through
//! `taskdeck.toml`), a manager rebuilt from an existing store file, and a
//! standalone history tracker.

use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::history::HistoryTracker;
use crate::manager::TaskManager;
use crate::storage::TaskFileStore;

/// Fresh manager with no persistence attached.
pub fn in_memory() -> TaskManager {
    TaskManager::new()
}

/// Manager bound to the well-known store file in the current directory.
/// The file is created (or truncated back to just its header) on startup.
pub fn file_backed() -> Result<TaskManager> {
    file_backed_at(Path::new("."))
}

/// Like [`file_backed`], rooted at `dir` instead of the current directory.
/// `taskdeck.toml` in `dir`, when present, chooses the store file.
pub fn file_backed_at(dir: impl AsRef<Path>) -> Result<TaskManager> {
    let dir = dir.as_ref();
    let config = Config::load_from_dir(dir);
    let store = TaskFileStore::bind(dir.join(config.storage.file));
    store.create()?;
    Ok(TaskManager::with_store(store))
}

/// Manager rebuilt from an existing store file; subsequent flushes go back
/// to the same file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<TaskManager> {
    TaskManager::load(TaskFileStore::bind(path.as_ref()))
}

/// Standalone history tracker.
pub fn default_history() -> HistoryTracker {
    HistoryTracker::new()
}
