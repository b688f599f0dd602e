//! Error types for runlog
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// runlog error types
#[derive(Error, Debug)]
pub enum Error {
    /// Registry already holds a run with this identifier
    #[error("Run identifier collision: '{0}' is already registered\nStart a new run to draw a fresh identifier")]
    RunIdCollision(String),

    /// Neither the registry nor the storage directory knows this run
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Registry is empty (or missing), so there is no most recent run
    #[error("No runs recorded yet")]
    NoRuns,

    /// Run log header lacks a key required by the caller
    #[error("Run '{run}' is missing metadata key '{key}'")]
    MissingMetadata {
        /// Run identifier
        run: String,
        /// Metadata key that was expected
        key: String,
    },

    /// Record fields differ from the run log's header (strict schema only)
    #[error("Schema mismatch: run log columns are [{expected}], record has [{found}]")]
    SchemaMismatch {
        /// Columns fixed by the first record
        expected: String,
        /// Columns of the rejected record
        found: String,
    },

    /// Step does not fit the signed 64-bit step column
    #[error("Step {0} is out of range; steps must not exceed {max}", max = i64::MAX)]
    StepOutOfRange(u64),

    /// `start` called on a tracker that already started (or closed)
    #[error("Tracker already started; create a new tracker for a new run")]
    AlreadyStarted,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry (SQLite) error
    #[error("Registry error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for the two "no such run" conditions, as opposed to storage failures.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RunNotFound(_) | Self::NoRuns)
    }
}
