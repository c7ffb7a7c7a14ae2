//! Flat-file persistence for taskdeck.
//!
//! One store file holds the whole manager state:
//!
//! ```text
//! id,type,name,status,description,epic,duration,startTime
//! 1,TASK,Write docs,NEW,crate-level docs,,30,2025-11-10T21:42:27
//! 2,EPIC,Release,DONE,cut 1.0,,60,2025-10-10T21:42:27
//! 3,SUBTASK,Tag build,DONE,push the tag,2,60,2025-10-10T21:42:27
//! ```
//!
//! Subtask rows carry the owning epic id in the `epic` column; task and epic
//! rows leave it empty. `duration` is whole minutes, `startTime` is naive
//! ISO-8601; absent optional values are empty strings. Epic rows persist the
//! rollup derived at save time and the loader ignores those columns, since
//! epic state is recomputed from subtasks. An earlier generation of the
//! format had no duration/startTime columns, so rows with six columns are
//! still accepted on load.
//!
//! Full rewrites go through a temp file + rename so a crashed write never
//! leaves a half-written store behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};

use crate::error::{Error, Result};
use crate::task::{AnyTask, Epic, Subtask, Task, TaskId, TaskKind, TaskStatus};

/// Header line naming the row columns.
pub const STORE_HEADER: &str = "id,type,name,status,description,epic,duration,startTime";

/// Timestamp layout used in rows (`LocalDateTime`-style, no zone).
const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Older rows may omit seconds.
const START_TIME_FORMAT_SHORT: &str = "%Y-%m-%dT%H:%M";

/// One persisted row, self-describing its variant through `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub id: TaskId,
    pub kind: TaskKind,
    pub name: String,
    pub status: TaskStatus,
    pub description: String,
    pub epic_id: Option<TaskId>,
    pub duration_minutes: Option<i64>,
    pub start_time: Option<NaiveDateTime>,
}

impl PersistedRecord {
    /// Encode as one store line.
    pub fn encode(&self) -> String {
        let epic = self
            .epic_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let duration = self
            .duration_minutes
            .map(|minutes| minutes.to_string())
            .unwrap_or_default();
        let start = self
            .start_time
            .map(|t| t.format(START_TIME_FORMAT).to_string())
            .unwrap_or_default();
        format!(
            "{},{},{},{},{},{},{},{}",
            self.id, self.kind, self.name, self.status, self.description, epic, duration, start
        )
    }

    /// Decode one store line. Any defect aborts with `MalformedRecord`.
    pub fn decode(line: &str) -> Result<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = trimmed.split(',').collect();
        if fields.len() != 6 && fields.len() != 8 {
            return Err(malformed(
                trimmed,
                format!("expected 6 or 8 columns, got {}", fields.len()),
            ));
        }

        let id: TaskId = fields[0]
            .parse()
            .map_err(|_| malformed(trimmed, format!("invalid id '{}'", fields[0])))?;
        let kind = TaskKind::from_token(fields[1])
            .ok_or_else(|| malformed(trimmed, format!("unknown type '{}'", fields[1])))?;
        let status = TaskStatus::from_token(fields[3])
            .ok_or_else(|| malformed(trimmed, format!("unknown status '{}'", fields[3])))?;
        let epic_id = match fields[5] {
            "" => None,
            raw => Some(
                raw.parse::<TaskId>()
                    .map_err(|_| malformed(trimmed, format!("invalid epic id '{raw}'")))?,
            ),
        };

        let mut duration_minutes = None;
        let mut start_time = None;
        if fields.len() == 8 {
            duration_minutes = match fields[6] {
                "" => None,
                raw => {
                    let minutes: i64 = raw
                        .parse()
                        .map_err(|_| malformed(trimmed, format!("invalid duration '{raw}'")))?;
                    if minutes < 0 {
                        return Err(malformed(trimmed, format!("negative duration '{raw}'")));
                    }
                    Some(minutes)
                }
            };
            start_time = match fields[7] {
                "" => None,
                raw => Some(parse_start_time(raw).ok_or_else(|| {
                    malformed(trimmed, format!("invalid startTime '{raw}'"))
                })?),
            };
        }

        Ok(Self {
            id,
            kind,
            name: fields[2].to_string(),
            status,
            description: fields[4].to_string(),
            epic_id,
            duration_minutes,
            start_time,
        })
    }

    /// Rebuild the entity this row describes.
    ///
    /// Epic rows keep only identity fields; their status and schedule are
    /// derived from subtasks after relinking. A subtask row whose epic
    /// column names the row's own id degrades to an unlinked subtask, the
    /// same soft-fail applied at construction time.
    pub fn into_entity(self) -> AnyTask {
        let duration = self.duration_minutes.map(Duration::minutes);
        match self.kind {
            TaskKind::Epic => AnyTask::Epic(Epic::new(self.name, self.description).with_id(self.id)),
            TaskKind::Subtask => {
                let subtask = Subtask {
                    id: None,
                    name: self.name,
                    description: self.description,
                    status: self.status,
                    epic_id: self.epic_id,
                    duration,
                    start_time: self.start_time,
                };
                AnyTask::Subtask(subtask.with_id(self.id))
            }
            TaskKind::Task => {
                let mut task = Task::new(self.name, self.description, self.status).with_id(self.id);
                task.duration = duration;
                task.start_time = self.start_time;
                AnyTask::Task(task)
            }
        }
    }
}

fn malformed(line: &str, reason: String) -> Error {
    Error::MalformedRecord {
        line: line.to_string(),
        reason,
    }
}

fn parse_start_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, START_TIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, START_TIME_FORMAT_SHORT))
        .ok()
}

/// The persistence adapter: a store bound to one file path.
#[derive(Debug, Clone)]
pub struct TaskFileStore {
    path: PathBuf,
}

impl TaskFileStore {
    /// Bind to a path without touching the filesystem.
    pub fn bind(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Startup creation/cleanup: truncate-or-create the store file and
    /// write the header line.
    pub fn create(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(&self.path)?;
        writeln!(file, "{STORE_HEADER}")?;
        file.sync_all()?;
        Ok(())
    }

    /// Append a single row; used only for pure insertions.
    pub fn append(&self, record: &PersistedRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", record.encode())?;
        file.sync_all()?;
        Ok(())
    }

    /// Replace the whole store with header + all current rows, atomically
    /// (temp file in the same directory, then rename).
    pub fn rewrite(&self, records: &[PersistedRecord]) -> Result<()> {
        let mut contents = String::with_capacity(64 * (records.len() + 1));
        contents.push_str(STORE_HEADER);
        contents.push('\n');
        for record in records {
            contents.push_str(&record.encode());
            contents.push('\n');
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Read every row back as an entity.
    ///
    /// The first line is the header and is always skipped. An empty or
    /// header-only file yields no entities; a missing file or an
    /// unparsable row is an error (the whole load aborts, bad rows are
    /// never skipped).
    pub fn load_all(&self) -> Result<Vec<AnyTask>> {
        let contents = fs::read_to_string(&self.path)?;
        let mut entities = Vec::new();
        for line in contents.lines().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            entities.push(PersistedRecord::decode(line)?.into_entity());
        }
        Ok(entities)
    }
}
