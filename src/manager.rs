//! The task manager: canonical collections, identity allocation, hierarchy
//! invariants, and flush wiring.
//!
//! Tasks, epics, and subtasks live in three independent id-keyed maps. Ids
//! come from one monotonic counter shared by all three kinds and are never
//! reused, even after deletion; entities loaded with pre-assigned ids bump
//! the counter past themselves.
//!
//! When a [`TaskFileStore`] is attached, every operation flushes: pure
//! insertions append a single row, everything else (updates, deletes, and
//! also the single-entity getters, which mutate history) rewrites the full
//! state. A failed flush surfaces to the caller synchronously; the
//! in-memory change is not rolled back, so memory and disk may diverge
//! until the next successful flush.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::{Error, Result};
use crate::history::HistoryTracker;
use crate::storage::{PersistedRecord, TaskFileStore};
use crate::task::{AnyTask, Epic, EpicRollup, Subtask, Task, TaskId, TaskKind};

/// Single-owner, synchronous task manager.
#[derive(Debug)]
pub struct TaskManager {
    tasks: BTreeMap<TaskId, Task>,
    epics: BTreeMap<TaskId, Epic>,
    subtasks: BTreeMap<TaskId, Subtask>,
    history: HistoryTracker,
    next_id: TaskId,
    store: Option<TaskFileStore>,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    /// Fresh in-memory manager with no persistence attached.
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            epics: BTreeMap::new(),
            subtasks: BTreeMap::new(),
            history: HistoryTracker::new(),
            next_id: 1,
            store: None,
        }
    }

    /// Fresh manager flushing to `store`. The store file itself is the
    /// caller's to create; see [`crate::managers`].
    pub fn with_store(store: TaskFileStore) -> Self {
        Self {
            store: Some(store),
            ..Self::new()
        }
    }

    /// Rebuild a manager from everything in `store`, then keep flushing to
    /// it.
    ///
    /// Rows may appear in any order: epics are inserted first, then
    /// subtasks (relinking each epic's id set from the subtask
    /// back-references), then tasks. A malformed row aborts the whole
    /// load.
    pub fn load(store: TaskFileStore) -> Result<Self> {
        let entities = store.load_all()?;
        let mut manager = Self::with_store(store);

        let mut tasks = Vec::new();
        let mut epics = Vec::new();
        let mut subtasks = Vec::new();
        for entity in entities {
            match entity {
                AnyTask::Task(task) => tasks.push(task),
                AnyTask::Epic(epic) => epics.push(epic),
                AnyTask::Subtask(subtask) => subtasks.push(subtask),
            }
        }

        for epic in epics {
            manager.insert_epic(epic);
        }
        for subtask in subtasks {
            manager.insert_subtask(subtask);
        }
        for task in tasks {
            manager.insert_task(task);
        }
        Ok(manager)
    }

    // =========================================================================
    // Additions
    // =========================================================================

    /// Insert a task, assigning the next id if unset. Returns the id.
    pub fn add_task(&mut self, task: Task) -> Result<TaskId> {
        let id = self.insert_task(task);
        self.append_row(id)?;
        Ok(id)
    }

    /// Insert an epic, assigning the next id if unset. Returns the id.
    pub fn add_epic(&mut self, epic: Epic) -> Result<TaskId> {
        let id = self.insert_epic(epic);
        self.append_row(id)?;
        Ok(id)
    }

    /// Insert a subtask, assigning the next id if unset, and register it
    /// with its owning epic. A self-referential or dangling epic link is
    /// logged and dropped; the insertion itself still succeeds. Returns
    /// the id.
    pub fn add_subtask(&mut self, subtask: Subtask) -> Result<TaskId> {
        let id = self.insert_subtask(subtask);
        self.append_row(id)?;
        Ok(id)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Look up one task, recording the view in history.
    pub fn get_task(&mut self, id: TaskId) -> Result<Task> {
        let task = self.tasks.get(&id).cloned().ok_or(Error::NotFound {
            kind: TaskKind::Task,
            id,
        })?;
        self.history.record(Some(AnyTask::Task(task.clone())));
        self.flush()?;
        Ok(task)
    }

    /// Look up one epic, recording the view in history.
    pub fn get_epic(&mut self, id: TaskId) -> Result<Epic> {
        let epic = self.epics.get(&id).cloned().ok_or(Error::NotFound {
            kind: TaskKind::Epic,
            id,
        })?;
        self.history.record(Some(AnyTask::Epic(epic.clone())));
        self.flush()?;
        Ok(epic)
    }

    /// Look up one subtask, recording the view in history.
    pub fn get_subtask(&mut self, id: TaskId) -> Result<Subtask> {
        let subtask = self.subtasks.get(&id).cloned().ok_or(Error::NotFound {
            kind: TaskKind::Subtask,
            id,
        })?;
        self.history.record(Some(AnyTask::Subtask(subtask.clone())));
        self.flush()?;
        Ok(subtask)
    }

    /// All tasks in insertion order. No history side effect.
    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    /// All epics in insertion order. No history side effect.
    pub fn epics(&self) -> Vec<Epic> {
        self.epics.values().cloned().collect()
    }

    /// All subtasks in insertion order. No history side effect.
    pub fn subtasks(&self) -> Vec<Subtask> {
        self.subtasks.values().cloned().collect()
    }

    /// The epic's subtasks in epic-declared order.
    pub fn epic_subtasks(&self, epic_id: TaskId) -> Result<Vec<Subtask>> {
        let epic = self.epics.get(&epic_id).ok_or(Error::NotFound {
            kind: TaskKind::Epic,
            id: epic_id,
        })?;
        Ok(epic
            .subtask_ids()
            .iter()
            .filter_map(|id| self.subtasks.get(id).cloned())
            .collect())
    }

    /// Derived status and schedule of an epic, recomputed from its live
    /// subtasks on every call.
    pub fn epic_rollup(&self, epic_id: TaskId) -> Result<EpicRollup> {
        let epic = self.epics.get(&epic_id).ok_or(Error::NotFound {
            kind: TaskKind::Epic,
            id: epic_id,
        })?;
        Ok(EpicRollup::compute(
            epic.subtask_ids()
                .iter()
                .filter_map(|id| self.subtasks.get(id)),
        ))
    }

    /// Recently viewed entities, oldest first.
    pub fn history(&self) -> Vec<AnyTask> {
        self.history.history()
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Replace the stored task wholesale. Fails with `NotFound` when the
    /// id is unset or unknown.
    pub fn update_task(&mut self, task: Task) -> Result<()> {
        let id = match task.id {
            Some(id) if self.tasks.contains_key(&id) => id,
            other => {
                return Err(Error::NotFound {
                    kind: TaskKind::Task,
                    id: other.unwrap_or_default(),
                })
            }
        };
        self.tasks.insert(id, task);
        self.flush()
    }

    /// Replace the stored epic wholesale, including its subtask id set.
    pub fn update_epic(&mut self, epic: Epic) -> Result<()> {
        let id = match epic.id {
            Some(id) if self.epics.contains_key(&id) => id,
            other => {
                return Err(Error::NotFound {
                    kind: TaskKind::Epic,
                    id: other.unwrap_or_default(),
                })
            }
        };
        self.epics.insert(id, epic);
        self.flush()
    }

    /// Replace the stored subtask wholesale.
    ///
    /// Changing `epic_id` here does not move the subtask between epics'
    /// id sets; ownership changes through update are a documented
    /// limitation, not enforced.
    pub fn update_subtask(&mut self, subtask: Subtask) -> Result<()> {
        let id = match subtask.id {
            Some(id) if self.subtasks.contains_key(&id) => id,
            other => {
                return Err(Error::NotFound {
                    kind: TaskKind::Subtask,
                    id: other.unwrap_or_default(),
                })
            }
        };
        self.subtasks.insert(id, subtask);
        self.flush()
    }

    // =========================================================================
    // Deletions (absent ids are a silent no-op, uniformly)
    // =========================================================================

    /// Delete one task and drop it from history.
    pub fn delete_task(&mut self, id: TaskId) -> Result<()> {
        if self.tasks.remove(&id).is_some() {
            self.history.remove(id);
        }
        self.flush()
    }

    /// Delete one epic, cascading to every subtask it owns; all removed
    /// ids leave history.
    pub fn delete_epic(&mut self, id: TaskId) -> Result<()> {
        if let Some(epic) = self.epics.remove(&id) {
            for subtask_id in epic.subtask_ids() {
                self.subtasks.remove(subtask_id);
                self.history.remove(*subtask_id);
            }
            self.history.remove(id);
        }
        self.flush()
    }

    /// Delete one subtask, unregistering it from its owning epic.
    pub fn delete_subtask(&mut self, id: TaskId) -> Result<()> {
        if let Some(subtask) = self.subtasks.remove(&id) {
            if let Some(epic_id) = subtask.epic_id {
                if let Some(epic) = self.epics.get_mut(&epic_id) {
                    epic.unlink_subtask(id);
                }
            }
            self.history.remove(id);
        }
        self.flush()
    }

    /// Delete every task.
    pub fn clear_tasks(&mut self) -> Result<()> {
        let ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        self.history.remove_ids(ids);
        self.tasks.clear();
        self.flush()
    }

    /// Delete every epic, and with them every subtask.
    pub fn clear_epics(&mut self) -> Result<()> {
        let ids: Vec<TaskId> = self
            .epics
            .keys()
            .chain(self.subtasks.keys())
            .copied()
            .collect();
        self.history.remove_ids(ids);
        self.epics.clear();
        self.subtasks.clear();
        self.flush()
    }

    /// Delete every subtask, emptying each epic's id set.
    pub fn clear_subtasks(&mut self) -> Result<()> {
        let ids: Vec<TaskId> = self.subtasks.keys().copied().collect();
        self.history.remove_ids(ids);
        for epic in self.epics.values_mut() {
            epic.clear_subtasks();
        }
        self.subtasks.clear();
        self.flush()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn claim_id(&mut self, preset: Option<TaskId>) -> TaskId {
        match preset {
            Some(id) => {
                // Never hand out an id at or below a preset one.
                self.next_id = self.next_id.max(id + 1);
                id
            }
            None => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
        }
    }

    fn insert_task(&mut self, task: Task) -> TaskId {
        let id = self.claim_id(task.id);
        self.tasks.insert(id, task.with_id(id));
        id
    }

    fn insert_epic(&mut self, epic: Epic) -> TaskId {
        let id = self.claim_id(epic.id);
        self.epics.insert(id, epic.with_id(id));
        id
    }

    fn insert_subtask(&mut self, subtask: Subtask) -> TaskId {
        let id = self.claim_id(subtask.id);
        let mut subtask = subtask.with_id(id);
        if let Some(epic_id) = subtask.epic_id {
            match self.epics.get_mut(&epic_id) {
                Some(epic) => epic.link_subtask(id),
                None => {
                    warn!(subtask_id = id, epic_id, "subtask references missing epic");
                    subtask.epic_id = None;
                }
            }
        }
        self.subtasks.insert(id, subtask);
        id
    }

    fn flush(&self) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        store.rewrite(&self.records())
    }

    fn append_row(&self, id: TaskId) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if let Some(record) = self.record_for(id) {
            store.append(&record)?;
        }
        Ok(())
    }

    fn record_for(&self, id: TaskId) -> Option<PersistedRecord> {
        if let Some(task) = self.tasks.get(&id) {
            return Some(task_record(id, task));
        }
        if let Some(subtask) = self.subtasks.get(&id) {
            return Some(subtask_record(id, subtask));
        }
        self.epics.get(&id).map(|epic| self.epic_record(id, epic))
    }

    /// Rows in the original save order: tasks, subtasks, epics. The loader
    /// does not depend on it.
    fn records(&self) -> Vec<PersistedRecord> {
        let mut rows =
            Vec::with_capacity(self.tasks.len() + self.subtasks.len() + self.epics.len());
        rows.extend(self.tasks.iter().map(|(id, task)| task_record(*id, task)));
        rows.extend(
            self.subtasks
                .iter()
                .map(|(id, subtask)| subtask_record(*id, subtask)),
        );
        rows.extend(
            self.epics
                .iter()
                .map(|(id, epic)| self.epic_record(*id, epic)),
        );
        rows
    }

    /// Epic rows carry the rollup as derived at save time; the loader
    /// ignores it.
    fn epic_record(&self, id: TaskId, epic: &Epic) -> PersistedRecord {
        let rollup = EpicRollup::compute(
            epic.subtask_ids()
                .iter()
                .filter_map(|sid| self.subtasks.get(sid)),
        );
        PersistedRecord {
            id,
            kind: TaskKind::Epic,
            name: epic.name.clone(),
            status: rollup.status,
            description: epic.description.clone(),
            epic_id: None,
            duration_minutes: rollup.duration.map(|d| d.num_minutes()),
            start_time: rollup.start_time,
        }
    }
}

fn task_record(id: TaskId, task: &Task) -> PersistedRecord {
    PersistedRecord {
        id,
        kind: TaskKind::Task,
        name: task.name.clone(),
        status: task.status,
        description: task.description.clone(),
        epic_id: None,
        duration_minutes: task.duration.map(|d| d.num_minutes()),
        start_time: task.start_time,
    }
}

fn subtask_record(id: TaskId, subtask: &Subtask) -> PersistedRecord {
    PersistedRecord {
        id,
        kind: TaskKind::Subtask,
        name: subtask.name.clone(),
        status: subtask.status,
        description: subtask.description.clone(),
        epic_id: subtask.epic_id,
        duration_minutes: subtask.duration.map(|d| d.num_minutes()),
        start_time: subtask.start_time,
    }
}
