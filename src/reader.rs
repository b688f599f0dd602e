//! Retrieval Engine - find stored runs and load them back
//!
//! Every lookup takes an optional run identifier; `None` means "the most
//! recently started run in the registry".
//!
//! # Example
//!
//! ```rust,no_run
//! use runlog::{RunReader, Settings};
//!
//! let reader = RunReader::new(&Settings::from_env());
//! let table = reader.load_table(None)?;
//! println!("{} rows, columns {:?}", table.num_rows(), table.columns());
//! println!("{}", reader.describe(None)?);
//! # Ok::<(), runlog::Error>(())
//! ```

use crate::logfile::codec;
use crate::logfile::metadata::{self, Metadata, KEY_COMMAND, KEY_GIT_COMMIT, KEY_TIME};
use crate::registry::{parse_timestamp, Registry, RunEntry};
use crate::settings::{Settings, StorageLayout};
use crate::table::RunTable;
use crate::{Error, Result};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Length of the abbreviated revision shown by `describe`.
const SHORT_REVISION_LEN: usize = 7;

/// A registered run together with the number of rows in its log.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Registry row
    pub entry: RunEntry,
    /// Logged rows (0 when the log is missing or unreadable)
    pub rows: usize,
}

/// Read-only access to the runs in one storage directory.
#[derive(Debug, Clone)]
pub struct RunReader {
    layout: StorageLayout,
}

impl RunReader {
    /// Reader over the storage directory `settings` resolves to.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self::with_layout(settings.storage())
    }

    /// Reader over an explicit storage layout.
    #[must_use]
    pub const fn with_layout(layout: StorageLayout) -> Self {
        Self { layout }
    }

    /// The storage layout being read.
    #[must_use]
    pub const fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Open the registry read-only if it exists and has its tables.
    fn registry(&self) -> Result<Option<Registry>> {
        let path = self.layout.registry_path();
        if !path.exists() {
            return Ok(None);
        }
        let registry = Registry::open_read_only(path)?;
        Ok(registry.has_schema()?.then_some(registry))
    }

    /// Turn an optional run identifier into a concrete one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRuns`] when `run` is `None` and nothing is
    /// registered, [`Error::RunNotFound`] when `run` names an unknown run.
    pub fn resolve(&self, run: Option<&str>) -> Result<String> {
        let registry = self.registry()?;
        match run {
            None => registry.ok_or(Error::NoRuns)?.most_recent_run(),
            Some(run_id) => {
                if let Some(registry) = &registry {
                    if registry.contains(run_id)? {
                        return Ok(run_id.to_string());
                    }
                }
                self.locate(run_id).map(|_| run_id.to_string())
            }
        }
    }

    /// Find the run log file of `run_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunNotFound`] if no candidate location has it.
    pub fn locate(&self, run_id: &str) -> Result<PathBuf> {
        self.layout
            .log_candidates(run_id)
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(|| Error::RunNotFound(run_id.to_string()))
    }

    /// Resolve `run` and locate its log in one step.
    ///
    /// # Errors
    ///
    /// Same as [`RunReader::resolve`] and [`RunReader::locate`].
    pub fn find(&self, run: Option<&str>) -> Result<(String, PathBuf)> {
        let run_id = self.resolve(run)?;
        let path = self.locate(&run_id)?;
        Ok((run_id, path))
    }

    /// Metadata header of a run's log.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown runs, or the IO error.
    pub fn load_metadata(&self, run: Option<&str>) -> Result<Metadata> {
        let (_, path) = self.find(run)?;
        read_metadata(&path)
    }

    /// Logged records of a run as a table, indexed by `step` when present.
    ///
    /// A log without any record yields an empty table.
    ///
    /// # Errors
    ///
    /// Returns a not-found error for unknown runs, or the IO error.
    pub fn load_table(&self, run: Option<&str>) -> Result<RunTable> {
        let (_, path) = self.find(run)?;
        read_table(&path)
    }

    /// Number of records logged for a run.
    ///
    /// # Errors
    ///
    /// Same as [`RunReader::load_table`].
    pub fn count_rows(&self, run: Option<&str>) -> Result<usize> {
        Ok(self.load_table(run)?.num_rows())
    }

    /// Human-readable summary of a run:
    ///
    /// ```text
    /// quiet-amber-falcon-3f9c0a @ 2024-05-01 09:30:00 (commit 4c1d2e8)
    ///   command: scripts/train.py --lr 0.1
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMetadata`] if `time`, `git_commit` or
    /// `command` is absent from the header, or a lookup error.
    pub fn describe(&self, run: Option<&str>) -> Result<String> {
        let (run_id, path) = self.find(run)?;
        describe_metadata(&run_id, &read_metadata(&path)?)
    }

    /// Most recent registered runs with their row counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns the registry error; missing or unreadable logs count as 0 rows.
    pub fn list_recent(&self, limit: usize) -> Result<Vec<RunSummary>> {
        let Some(registry) = self.registry()? else {
            return Ok(Vec::new());
        };
        Ok(registry
            .recent_runs(limit)?
            .into_iter()
            .map(|entry| {
                let rows = self
                    .locate(entry.run_id())
                    .and_then(|path| read_table(&path))
                    .map_or(0, |table| table.num_rows());
                RunSummary { entry, rows }
            })
            .collect())
    }
}

/// Read the metadata header of the run log at `path`.
///
/// # Errors
///
/// Returns the IO error.
pub fn read_metadata(path: &Path) -> Result<Metadata> {
    Metadata::read_from(BufReader::new(File::open(path)?))
}

/// Read the records of the run log at `path` into a table.
///
/// # Errors
///
/// Returns the IO error.
pub fn read_table(path: &Path) -> Result<RunTable> {
    let text = std::fs::read_to_string(path)?;
    let (_, body) = metadata::split_header(&text);

    let mut rows = codec::parse_rows(body).into_iter();
    let header = rows.next().unwrap_or_default();
    Ok(RunTable::from_rows(header, rows.collect()))
}

/// Format the `describe` summary from an already loaded header.
///
/// # Errors
///
/// Returns [`Error::MissingMetadata`] if `time`, `git_commit` or `command`
/// is absent.
pub fn describe_metadata(run_id: &str, metadata: &Metadata) -> Result<String> {
    let time = metadata.require(run_id, KEY_TIME)?;
    metadata.require(run_id, KEY_GIT_COMMIT)?;
    let command = metadata.require(run_id, KEY_COMMAND)?;

    let commit = metadata.revision().map_or_else(
        || "none".to_string(),
        |rev| rev.chars().take(SHORT_REVISION_LEN).collect(),
    );

    Ok(format!(
        "{run_id} @ {} (commit {commit})\n  command: {command}",
        display_time(time)
    ))
}

/// `YYYY-MM-DD HH:MM:SS` for stored timestamps, the raw text otherwise.
#[must_use]
pub fn display_time(raw: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M:%S";
    if let Ok(ts) = parse_timestamp(raw) {
        return ts.format(DISPLAY).to_string();
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_or_else(|_| raw.to_string(), |ts| ts.format(DISPLAY).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_time() {
        assert_eq!(display_time("2024-05-01T09:30:00.123456Z"), "2024-05-01 09:30:00");
        assert_eq!(display_time("2024-05-01T09:30:00.123456"), "2024-05-01 09:30:00");
        assert_eq!(display_time("yesterday"), "yesterday");
    }

    #[test]
    fn test_empty_storage_has_no_runs() {
        let dir = tempfile::tempdir().unwrap();
        let reader = RunReader::with_layout(StorageLayout::new(dir.path()));

        assert!(matches!(reader.resolve(None), Err(Error::NoRuns)));
        assert!(matches!(reader.resolve(Some("ghost")), Err(Error::RunNotFound(_))));
        assert!(reader.list_recent(10).unwrap().is_empty());
        // Reading never creates the registry
        assert!(!reader.layout().registry_path().exists());
    }

    #[test]
    fn test_log_without_registry_is_still_readable() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        std::fs::write(
            layout.log_path("loose"),
            "# run: loose\n# time: 2024-05-01T09:30:00.000000Z\n# command: x\n# git_commit: None\nacc,step\n0.9,3\n",
        )
        .unwrap();
        let reader = RunReader::with_layout(layout);

        assert_eq!(reader.resolve(Some("loose")).unwrap(), "loose");
        let table = reader.load_table(Some("loose")).unwrap();
        assert_eq!(table.column_f64("acc").unwrap(), vec![0.9]);
        assert_eq!(reader.count_rows(Some("loose")).unwrap(), 1);
        assert_eq!(
            reader.describe(Some("loose")).unwrap(),
            "loose @ 2024-05-01 09:30:00 (commit none)\n  command: x"
        );
    }

    #[test]
    fn test_describe_requires_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        std::fs::write(layout.log_path("bare"), "# run: bare\nx\n1\n").unwrap();
        let reader = RunReader::with_layout(layout);

        let err = reader.describe(Some("bare")).unwrap_err();
        assert!(matches!(err, Error::MissingMetadata { ref key, .. } if key == "time"));
    }

    #[test]
    fn test_find_returns_id_and_log_path() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        std::fs::write(
            layout.log_path("loose"),
            "# run: loose\n# time: t\n# command: x\n# git_commit: 4c1d2e8f00\n",
        )
        .unwrap();
        let reader = RunReader::with_layout(layout.clone());

        let (run_id, path) = reader.find(Some("loose")).unwrap();
        assert_eq!(run_id, "loose");
        assert_eq!(path, layout.log_path("loose"));

        let metadata = read_metadata(&path).unwrap();
        assert_eq!(
            describe_metadata(&run_id, &metadata).unwrap(),
            reader.describe(Some("loose")).unwrap()
        );
        assert!(reader.describe(None).is_err());
    }

    #[test]
    fn test_reader_leaves_registry_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        // Registry file exists but no tables were created yet
        std::fs::write(layout.registry_path(), b"").unwrap();
        let reader = RunReader::with_layout(layout.clone());

        assert!(matches!(reader.resolve(None), Err(Error::NoRuns)));
        assert!(reader.list_recent(5).unwrap().is_empty());
        assert_eq!(std::fs::metadata(layout.registry_path()).unwrap().len(), 0);
    }

    #[test]
    fn test_header_only_log_is_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        std::fs::write(layout.log_path("fresh"), "# run: fresh\n").unwrap();
        let reader = RunReader::with_layout(layout);

        let table = reader.load_table(Some("fresh")).unwrap();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
