mod support;

use chrono::Duration;

use taskdeck::managers;
use taskdeck::storage::STORE_HEADER;
use taskdeck::task::{Epic, Subtask, Task, TaskStatus};
use taskdeck::Error;

use support::{at, init_tracing, StoreDir};

#[test]
fn file_backed_startup_creates_the_store() {
    let dir = StoreDir::new();
    let _manager = managers::file_backed_at(dir.path()).expect("file backed");

    assert_eq!(dir.read_store(), format!("{STORE_HEADER}\n"));
}

#[test]
fn file_backed_startup_truncates_leftover_state() {
    let dir = StoreDir::new();
    dir.write_store(&format!("{STORE_HEADER}\n1,TASK,old,NEW,stale,,,\n"));

    let _manager = managers::file_backed_at(dir.path()).expect("file backed");
    assert_eq!(dir.read_store(), format!("{STORE_HEADER}\n"));
}

#[test]
fn config_relocates_the_store() {
    let dir = StoreDir::new();
    dir.write_config("[storage]\nfile = \"plans/backlog.csv\"\n");

    let mut manager = managers::file_backed_at(dir.path()).expect("file backed");
    manager
        .add_task(Task::new("T", "", TaskStatus::New))
        .expect("add");

    let relocated = dir.path().join("plans/backlog.csv");
    assert!(relocated.exists());
    assert!(!dir.store_path().exists());
}

#[test]
fn pure_insertions_append_single_rows() {
    let dir = StoreDir::new();
    let mut manager = managers::file_backed_at(dir.path()).expect("file backed");

    manager
        .add_task(Task::new("T1", "D1", TaskStatus::New))
        .expect("add");
    manager.add_epic(Epic::new("E1", "D1")).expect("add");

    let contents = dir.read_store();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], STORE_HEADER);
    assert_eq!(lines[1], "1,TASK,T1,NEW,D1,,,");
    assert_eq!(lines[2], "2,EPIC,E1,NEW,D1,,,");
}

#[test]
fn mutations_rewrite_the_full_state() {
    let dir = StoreDir::new();
    let mut manager = managers::file_backed_at(dir.path()).expect("file backed");

    let t = manager
        .add_task(Task::new("Before", "", TaskStatus::New))
        .expect("add");
    manager
        .update_task(Task::new("After", "", TaskStatus::Done).with_id(t))
        .expect("update");

    let contents = dir.read_store();
    assert!(contents.contains("After"), "{contents}");
    assert!(!contents.contains("Before"), "{contents}");

    manager.delete_task(t).expect("delete");
    assert_eq!(dir.read_store(), format!("{STORE_HEADER}\n"));
}

#[test]
fn epic_rows_persist_the_derived_rollup() {
    let dir = StoreDir::new();
    let mut manager = managers::file_backed_at(dir.path()).expect("file backed");

    let e = manager.add_epic(Epic::new("E", "big one")).expect("add");
    manager
        .add_subtask(
            Subtask::new("S", "", TaskStatus::Done, e)
                .scheduled(Duration::minutes(45), at(9, 10, 21, 42)),
        )
        .expect("add");
    // Any non-insert mutation rewrites, refreshing the epic row.
    manager.delete_task(999).expect("no-op rewrite");

    let contents = dir.read_store();
    assert!(
        contents.contains("1,EPIC,E,DONE,big one,,45,2025-09-10T21:42:00"),
        "{contents}"
    );
}

#[test]
fn round_trip_preserves_everything() {
    init_tracing();
    let dir = StoreDir::new();
    let mut manager = managers::file_backed_at(dir.path()).expect("file backed");

    let t = manager
        .add_task(
            Task::new("Task1", "Description task1", TaskStatus::New)
                .scheduled(Duration::minutes(30), at(11, 10, 21, 42)),
        )
        .expect("add");
    let e = manager
        .add_epic(Epic::new("Epic2", "Description epic2"))
        .expect("add");
    let s = manager
        .add_subtask(
            Subtask::new("Sub Task2", "Description sub task3", TaskStatus::Done, e)
                .scheduled(Duration::minutes(4000), at(9, 10, 21, 42)),
        )
        .expect("add");

    let mut loaded = managers::load_from_file(dir.store_path()).expect("load");

    assert_eq!(loaded.tasks().len(), 1);
    assert_eq!(loaded.epics().len(), 1);
    assert_eq!(loaded.subtasks().len(), 1);

    let task = loaded.get_task(t).expect("get");
    assert_eq!(task.name, "Task1");
    assert_eq!(task.description, "Description task1");
    assert_eq!(task.status, TaskStatus::New);
    assert_eq!(task.duration, Some(Duration::minutes(30)));
    assert_eq!(task.start_time, Some(at(11, 10, 21, 42)));

    let subtask = loaded.get_subtask(s).expect("get");
    assert_eq!(subtask.epic_id, Some(e));
    assert_eq!(subtask.duration, Some(Duration::minutes(4000)));
    assert_eq!(subtask.start_time, Some(at(9, 10, 21, 42)));

    // The epic's id set was rebuilt from the subtask back-reference, and
    // its rollup matches the subtask schedule.
    let epic = loaded.get_epic(e).expect("get");
    assert_eq!(epic.subtask_ids(), &[s]);
    let rollup = loaded.epic_rollup(e).expect("rollup");
    assert_eq!(rollup.status, TaskStatus::Done);
    assert_eq!(rollup.duration, Some(Duration::minutes(4000)));
    assert_eq!(rollup.start_time, Some(at(9, 10, 21, 42)));
}

#[test]
fn loaded_ids_seed_the_allocator() {
    let dir = StoreDir::new();
    dir.write_store(&format!(
        "{STORE_HEADER}\n1,TASK,T1,NEW,d,,,\n7,TASK,T7,NEW,d,,,\n"
    ));

    let mut loaded = managers::load_from_file(dir.store_path()).expect("load");
    let next = loaded
        .add_task(Task::new("T8", "", TaskStatus::New))
        .expect("add");
    assert_eq!(next, 8);
}

#[test]
fn row_order_does_not_matter_for_relinking() {
    init_tracing();
    let dir = StoreDir::new();
    // Subtask row first, its epic last.
    dir.write_store(&format!(
        "{STORE_HEADER}\n3,SUBTASK,S,DONE,d,2,,\n1,TASK,T,NEW,d,,,\n2,EPIC,E,DONE,d,,,\n"
    ));

    let loaded = managers::load_from_file(dir.store_path()).expect("load");
    let epics = loaded.epics();
    assert_eq!(epics.len(), 1);
    assert_eq!(epics[0].subtask_ids(), &[3]);
}

#[test]
fn subtask_row_with_dangling_epic_loses_the_link() {
    init_tracing();
    let dir = StoreDir::new();
    dir.write_store(&format!("{STORE_HEADER}\n3,SUBTASK,S,NEW,d,42,,\n"));

    let loaded = managers::load_from_file(dir.store_path()).expect("load");
    let subtasks = loaded.subtasks();
    assert_eq!(subtasks.len(), 1);
    assert_eq!(subtasks[0].epic_id, None);
}

#[test]
fn empty_and_header_only_files_load_clean() {
    let dir = StoreDir::new();

    dir.write_store("");
    let loaded = managers::load_from_file(dir.store_path()).expect("load empty");
    assert!(loaded.tasks().is_empty());
    assert!(loaded.epics().is_empty());
    assert!(loaded.subtasks().is_empty());

    dir.write_store(&format!("{STORE_HEADER}\n"));
    let loaded = managers::load_from_file(dir.store_path()).expect("load header-only");
    assert!(loaded.tasks().is_empty());
    assert!(loaded.epics().is_empty());
    assert!(loaded.subtasks().is_empty());
}

#[test]
fn missing_file_is_distinguishable_from_empty() {
    let dir = StoreDir::new();
    let err = managers::load_from_file(dir.store_path()).expect_err("missing file");
    assert!(err.is_storage());
}

#[test]
fn malformed_row_aborts_the_load() {
    let dir = StoreDir::new();
    dir.write_store(&format!(
        "{STORE_HEADER}\n1,TASK,ok,NEW,d,,,\n2,TASK,broken,NEW\n3,TASK,never-reached,NEW,d,,,\n"
    ));

    let err = managers::load_from_file(dir.store_path()).expect_err("malformed row");
    assert!(matches!(err, Error::MalformedRecord { .. }));
}

#[cfg(unix)]
#[test]
fn failed_flush_surfaces_and_memory_diverges() {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    let dir = StoreDir::new();
    let mut manager = managers::file_backed_at(dir.path()).expect("file backed");
    manager
        .add_task(Task::new("T1", "", TaskStatus::New))
        .expect("add");

    // A read-only store file makes the append fail.
    fs::set_permissions(dir.store_path(), fs::Permissions::from_mode(0o444)).expect("chmod");

    let err = manager
        .add_task(Task::new("T2", "", TaskStatus::New))
        .expect_err("append should fail");
    assert!(err.is_storage());

    // The insertion itself was not rolled back.
    assert_eq!(manager.tasks().len(), 2);

    fs::set_permissions(dir.store_path(), fs::Permissions::from_mode(0o644)).expect("chmod back");
}
