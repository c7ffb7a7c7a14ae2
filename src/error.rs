//! Error types for taskdeck
//!
//! Only two conditions abort an operation: a lookup that misses
//! (`NotFound`) and a storage failure (`Storage`/`MalformedRecord`).
//! Self-referential hierarchy links are never errors; they are logged
//! and dropped at the point of linking.

use thiserror::Error;

use crate::task::{TaskId, TaskKind};

/// Main error type for taskdeck operations
#[derive(Error, Debug)]
pub enum Error {
    // Lookup misses
    #[error("no {kind} with id {id}")]
    NotFound { kind: TaskKind, id: TaskId },

    // Storage failures
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("malformed record '{line}': {reason}")]
    MalformedRecord { line: String, reason: String },

    // Configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// True for errors raised by the persistence adapter, including
    /// unparsable rows encountered during a load.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::MalformedRecord { .. })
    }
}

/// Result type alias for taskdeck operations
pub type Result<T> = std::result::Result<T, Error>;
