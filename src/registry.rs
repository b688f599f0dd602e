//! Run Registry - shared SQLite store of run metadata
//!
//! One `runs` row per run plus one `config` row per configuration key:
//!
//! ```text
//! runs(run PK, command, timestamp, git_commit, config)
//!   └──< config(run FK, key, value, PK(run, key))
//! ```
//!
//! Rows are only ever inserted. Each writer opens its own connection; the
//! primary key on `runs.run` is the only guard between concurrent writers.

use crate::value::{config_value_text, RunConfig};
use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Format a start time the way the registry and run logs store it.
///
/// UTC, microsecond precision, `Z` suffix: lexical order is chronological.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored start time.
///
/// # Errors
///
/// Returns the chrono parse error if `s` is not RFC 3339.
pub fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}

/// Registry row describing one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEntry {
    run_id: String,
    started_at: DateTime<Utc>,
    command: String,
    revision: Option<String>,
    config: RunConfig,
}

impl RunEntry {
    /// Create an entry stamped with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, command: impl Into<String>, config: RunConfig) -> Self {
        Self::builder(run_id, command, config).build()
    }

    /// Create a builder for an entry with optional fields.
    #[must_use]
    pub fn builder(
        run_id: impl Into<String>,
        command: impl Into<String>,
        config: RunConfig,
    ) -> RunEntryBuilder {
        RunEntryBuilder::new(run_id, command, config)
    }

    /// Get the run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Get the normalized command line.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Get the source revision, if one was available.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Get the run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }
}

/// Builder for `RunEntry`.
#[derive(Debug)]
pub struct RunEntryBuilder {
    run_id: String,
    started_at: DateTime<Utc>,
    command: String,
    revision: Option<String>,
    config: RunConfig,
}

impl RunEntryBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(run_id: impl Into<String>, command: impl Into<String>, config: RunConfig) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            command: command.into(),
            revision: None,
            config,
        }
    }

    /// Set a custom start timestamp.
    #[must_use]
    pub const fn started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    /// Set the source revision.
    #[must_use]
    pub fn revision(mut self, revision: Option<String>) -> Self {
        self.revision = revision;
        self
    }

    /// Build the `RunEntry`.
    #[must_use]
    pub fn build(self) -> RunEntry {
        RunEntry {
            run_id: self.run_id,
            started_at: self.started_at,
            command: self.command,
            revision: self.revision,
            config: self.config,
        }
    }
}

const SELECT_RUN: &str = "SELECT run, command, timestamp, git_commit, config FROM runs";

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunEntry> {
    let run_id: String = row.get(0)?;
    let command: String = row.get(1)?;
    let timestamp: String = row.get(2)?;
    let revision: Option<String> = row.get(3)?;
    let config: String = row.get(4)?;

    let started_at = parse_timestamp(&timestamp)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    let config: RunConfig = serde_json::from_str(&config)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(RunEntry {
        run_id,
        started_at,
        command,
        revision,
        config,
    })
}

/// Handle on the shared run registry.
#[derive(Debug)]
pub struct Registry {
    conn: Connection,
}

impl Registry {
    /// Open (creating if needed) the registry at `path`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or database cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open an existing registry without writing to it.
    ///
    /// Neither the file nor the schema is created; use
    /// [`Registry::has_schema`] before querying a registry that may be empty.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error if the file is missing or not a database.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Check whether the `runs` table exists.
    ///
    /// # Errors
    ///
    /// Returns error if the schema query fails.
    pub fn has_schema(&self) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'runs'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Open a private in-memory registry (tests, dry runs).
    ///
    /// # Errors
    ///
    /// Returns error if SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let registry = Self { conn };
        registry.ensure_schema()?;
        Ok(registry)
    }

    /// Create the `runs` and `config` tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns error if the schema statements fail.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS runs (\
               run TEXT PRIMARY KEY,\
               command TEXT NOT NULL,\
               timestamp TEXT NOT NULL,\
               git_commit TEXT,\
               config TEXT NOT NULL\
             );\
             CREATE TABLE IF NOT EXISTS config (\
               run TEXT NOT NULL REFERENCES runs(run),\
               key TEXT NOT NULL,\
               value TEXT,\
               PRIMARY KEY (run, key)\
             );\
             CREATE INDEX IF NOT EXISTS idx_runs_timestamp ON runs(timestamp);",
        )?;
        Ok(())
    }

    /// Register a run: one `runs` row plus one `config` row per key.
    ///
    /// Both are written in a single transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunIdCollision`] if the run identifier is taken, or
    /// the underlying SQLite/JSON error.
    pub fn insert_run(&mut self, entry: &RunEntry) -> Result<()> {
        let config_blob = serde_json::to_string(&entry.config)?;
        let tx = self.conn.transaction()?;

        match tx.execute(
            "INSERT INTO runs (run, command, timestamp, git_commit, config) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.run_id,
                entry.command,
                format_timestamp(entry.started_at),
                entry.revision,
                config_blob,
            ],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(Error::RunIdCollision(entry.run_id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        {
            let mut stmt =
                tx.prepare("INSERT INTO config (run, key, value) VALUES (?1, ?2, ?3)")?;
            for (key, value) in &entry.config {
                stmt.execute(params![entry.run_id, key, config_value_text(value)])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Identifier of the run with the latest start time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuns`] when the registry is empty.
    pub fn most_recent_run(&self) -> Result<String> {
        self.conn
            .query_row(
                "SELECT run FROM runs ORDER BY timestamp DESC, rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(Error::NoRuns)
    }

    /// Check whether a run is registered.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub fn contains(&self, run_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM runs WHERE run = ?1", params![run_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }

    /// Fetch one run's registry row.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or the row cannot be decoded.
    pub fn get_run(&self, run_id: &str) -> Result<Option<RunEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("{SELECT_RUN} WHERE run = ?1"),
                params![run_id],
                map_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Most recent runs first, at most `limit` of them.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or a row cannot be decoded.
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_RUN} ORDER BY timestamp DESC, rowid DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit], map_entry)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Expanded configuration rows of one run, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub fn config_for(&self, run_id: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM config WHERE run = ?1 ORDER BY rowid")?;
        let rows = stmt.query_map(params![run_id], |row| {
            let key: String = row.get(0)?;
            let value: Option<String> = row.get(1)?;
            Ok((key, value.unwrap_or_default()))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of registered runs.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub fn run_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Release the connection, reporting any close error.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error raised while closing.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::Sqlite(e))
    }
}
