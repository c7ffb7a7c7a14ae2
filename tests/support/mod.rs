#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

use taskdeck::storage::TaskFileStore;

/// Install a test-writer subscriber so soft-fail warnings land in the
/// captured test output. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Temp directory holding one store file (and optionally a config file).
pub struct StoreDir {
    dir: TempDir,
}

impl StoreDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn store_path(&self) -> PathBuf {
        self.dir.path().join("tasks.csv")
    }

    pub fn store(&self) -> TaskFileStore {
        TaskFileStore::bind(self.store_path())
    }

    pub fn write_store(&self, contents: &str) -> PathBuf {
        let path = self.store_path();
        fs::write(&path, contents).expect("write store file");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join("taskdeck.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    pub fn read_store(&self) -> String {
        fs::read_to_string(self.store_path()).expect("read store file")
    }
}

/// Fixed timestamp helper; tests never depend on the wall clock.
pub fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, month, day)
        .expect("valid date")
        .and_hms_opt(hour, minute, 0)
        .expect("valid time")
}
