//! Entity model for taskdeck.
//!
//! Three concrete work-item types share one identity space: plain [`Task`],
//! [`Epic`] (a container of subtasks), and [`Subtask`] (owned by exactly one
//! epic). Equality and hashing are by id alone; two instances with the same
//! id are the same logical item regardless of other fields.
//!
//! An epic stores no status or schedule of its own. Those are pure functions
//! of its current subtasks, recomputed on every read via [`EpicRollup`].

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{Duration, NaiveDateTime};
use tracing::warn;

/// Identity of a task, epic, or subtask. Unique across all three kinds.
pub type TaskId = u64;

/// Lifecycle status of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    New,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Token used in persisted rows.
    pub fn as_token(&self) -> &'static str {
        match self {
            TaskStatus::New => "NEW",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "NEW" => Some(TaskStatus::New),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "DONE" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Variant tag carried by every persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Task,
    Epic,
    Subtask,
}

impl TaskKind {
    pub fn as_token(&self) -> &'static str {
        match self {
            TaskKind::Task => "TASK",
            TaskKind::Epic => "EPIC",
            TaskKind::Subtask => "SUBTASK",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TASK" => Some(TaskKind::Task),
            "EPIC" => Some(TaskKind::Epic),
            "SUBTASK" => Some(TaskKind::Subtask),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// A standalone work item.
///
/// `id` is `None` until the manager assigns one (or a load supplies one).
/// `end_time()` is derived from `start_time + duration` and is `None`
/// whenever either part is missing.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: Option<TaskId>,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub duration: Option<Duration>,
    pub start_time: Option<NaiveDateTime>,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        status: TaskStatus,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            status,
            duration: None,
            start_time: None,
        }
    }

    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn scheduled(mut self, duration: Duration, start_time: NaiveDateTime) -> Self {
        self.duration = Some(duration);
        self.start_time = Some(start_time);
        self
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        end_of(self.start_time, self.duration)
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A container of subtasks.
///
/// Holds an ordered set of subtask ids (insertion order, duplicates
/// rejected). Status, duration, and start/end times are never stored;
/// compute them with [`EpicRollup::compute`] over the live subtasks.
#[derive(Debug, Clone)]
pub struct Epic {
    pub id: Option<TaskId>,
    pub name: String,
    pub description: String,
    subtask_ids: Vec<TaskId>,
}

impl Epic {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            subtask_ids: Vec::new(),
        }
    }

    /// Fix the id, dropping any already-linked subtask id that would now
    /// be the epic's own.
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        if self.subtask_ids.contains(&id) {
            warn!(id, "epic should not add itself as subtask");
            self.subtask_ids.retain(|sid| *sid != id);
        }
        self
    }

    /// Register a subtask id. An epic never contains its own id, and
    /// duplicates are rejected; both cases log a warning and leave the set
    /// unchanged.
    pub fn link_subtask(&mut self, subtask_id: TaskId) {
        if self.id == Some(subtask_id) {
            warn!(id = subtask_id, "epic should not add itself as subtask");
        } else if self.subtask_ids.contains(&subtask_id) {
            warn!(subtask_id, "should add distinct subtask ids");
        } else {
            self.subtask_ids.push(subtask_id);
        }
    }

    pub fn unlink_subtask(&mut self, subtask_id: TaskId) {
        self.subtask_ids.retain(|id| *id != subtask_id);
    }

    pub fn clear_subtasks(&mut self) {
        self.subtask_ids.clear();
    }

    /// Subtask ids in the order they were linked.
    pub fn subtask_ids(&self) -> &[TaskId] {
        &self.subtask_ids
    }
}

impl PartialEq for Epic {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Epic {}

impl Hash for Epic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A work item owned by exactly one epic.
///
/// The epic link is optional in the type because a subtask that would
/// reference itself has its link dropped (with a warning) rather than
/// failing construction.
#[derive(Debug, Clone)]
pub struct Subtask {
    pub id: Option<TaskId>,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub epic_id: Option<TaskId>,
    pub duration: Option<Duration>,
    pub start_time: Option<NaiveDateTime>,
}

impl Subtask {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        status: TaskStatus,
        epic_id: TaskId,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            status,
            epic_id: Some(epic_id),
            duration: None,
            start_time: None,
        }
    }

    /// Fix the id, dropping the epic link if it would become
    /// self-referential.
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        if self.epic_id == Some(id) {
            warn!(id, "subtask cannot be attached to itself");
            self.epic_id = None;
        }
        self
    }

    pub fn scheduled(mut self, duration: Duration, start_time: NaiveDateTime) -> Self {
        self.duration = Some(duration);
        self.start_time = Some(start_time);
        self
    }

    pub fn end_time(&self) -> Option<NaiveDateTime> {
        end_of(self.start_time, self.duration)
    }
}

impl PartialEq for Subtask {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subtask {}

impl Hash for Subtask {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Closed sum over the three entity kinds, used wherever any of them may
/// appear: history entries and records coming back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnyTask {
    Task(Task),
    Epic(Epic),
    Subtask(Subtask),
}

impl AnyTask {
    pub fn id(&self) -> Option<TaskId> {
        match self {
            AnyTask::Task(t) => t.id,
            AnyTask::Epic(e) => e.id,
            AnyTask::Subtask(s) => s.id,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            AnyTask::Task(_) => TaskKind::Task,
            AnyTask::Epic(_) => TaskKind::Epic,
            AnyTask::Subtask(_) => TaskKind::Subtask,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AnyTask::Task(t) => &t.name,
            AnyTask::Epic(e) => &e.name,
            AnyTask::Subtask(s) => &s.name,
        }
    }
}

/// Derived view of an epic, recomputed from its live subtasks on every
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpicRollup {
    pub status: TaskStatus,
    pub duration: Option<Duration>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

impl EpicRollup {
    /// Reduce over an epic's subtasks.
    ///
    /// Status: empty set is NEW; any IN_PROGRESS subtask wins; all DONE is
    /// DONE; a NEW/DONE mixture collapses to NEW. The mixture collapsing to
    /// NEW rather than IN_PROGRESS is deliberate policy.
    ///
    /// The three time reductions are independent: `end_time` is the max
    /// subtask end, not `start_time + duration`.
    pub fn compute<'a>(subtasks: impl IntoIterator<Item = &'a Subtask>) -> Self {
        let mut seen_any = false;
        let mut any_in_progress = false;
        let mut all_done = true;
        let mut duration: Option<Duration> = None;
        let mut start_time: Option<NaiveDateTime> = None;
        let mut end_time: Option<NaiveDateTime> = None;

        for subtask in subtasks {
            seen_any = true;
            match subtask.status {
                TaskStatus::InProgress => any_in_progress = true,
                TaskStatus::Done => {}
                TaskStatus::New => all_done = false,
            }
            if let Some(d) = subtask.duration {
                duration = Some(duration.map_or(d, |total| total + d));
            }
            if let Some(start) = subtask.start_time {
                start_time = Some(start_time.map_or(start, |earliest| earliest.min(start)));
            }
            if let Some(end) = subtask.end_time() {
                end_time = Some(end_time.map_or(end, |latest| latest.max(end)));
            }
        }

        let status = if !seen_any {
            TaskStatus::New
        } else if any_in_progress {
            TaskStatus::InProgress
        } else if all_done {
            TaskStatus::Done
        } else {
            TaskStatus::New
        };

        Self {
            status,
            duration,
            start_time,
            end_time,
        }
    }
}

fn end_of(start_time: Option<NaiveDateTime>, duration: Option<Duration>) -> Option<NaiveDateTime> {
    match (start_time, duration) {
        (Some(start), Some(duration)) => start.checked_add_signed(duration),
        _ => None,
    }
}
