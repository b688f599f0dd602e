//! Run Log - append-only, self-describing per-run CSV file
//!
//! ```text
//! # run: quiet-amber-falcon-3f9c0a
//! # time: 2024-05-01T09:30:00.000000Z
//! # command: scripts/train.py --lr 0.1
//! # git_commit: 4c1d2e...
//! # config: {"lr":0.1}
//! loss,acc,step
//! 1.0,0.1,0
//! 0.5,0.4,1
//! ```
//!
//! The first appended record fixes the column order for the life of the
//! file. What happens to later records with different fields depends on the
//! [`SchemaPolicy`].

pub mod codec;
pub mod metadata;

pub use metadata::Metadata;

use crate::settings::SchemaPolicy;
use crate::value::Record;
use crate::{Error, Result};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writer for one run log file.
///
/// The file handle is released by [`RunLog::close`] or, failing that, when
/// the `RunLog` is dropped.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    columns: Option<Vec<String>>,
    policy: SchemaPolicy,
    dropped_fields: HashSet<String>,
    rows_written: usize,
}

impl RunLog {
    /// Create (truncating) the file at `path` and write the metadata header.
    ///
    /// The file stays open for appending records.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or written.
    pub fn create(path: impl AsRef<Path>, metadata: &Metadata, policy: SchemaPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        metadata.write_to(&mut writer)?;
        writer.flush()?;

        Ok(Self {
            path,
            writer: Some(writer),
            columns: None,
            policy,
            dropped_fields: HashSet::new(),
            rows_written: 0,
        })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column order fixed by the first record, once one was appended.
    #[must_use]
    pub fn columns(&self) -> Option<&[String]> {
        self.columns.as_deref()
    }

    /// Number of records appended through this handle.
    #[must_use]
    pub const fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// True while the file handle is held.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        let writer = match self.writer.take() {
            Some(writer) => writer,
            None => BufWriter::new(OpenOptions::new().append(true).open(&self.path)?),
        };
        Ok(self.writer.insert(writer))
    }

    /// Cells for `record` in header order, enforcing the schema policy.
    fn row_cells(&mut self, columns: &[String], record: &Record) -> Result<Vec<String>> {
        let extra: Vec<&str> = record
            .keys()
            .filter(|k| !columns.iter().any(|c| c.as_str() == *k))
            .collect();
        let missing = columns.iter().any(|c| !record.contains_key(c));

        if self.policy == SchemaPolicy::Strict && (missing || !extra.is_empty()) {
            return Err(Error::SchemaMismatch {
                expected: columns.join(", "),
                found: record.keys().collect::<Vec<_>>().join(", "),
            });
        }

        for field in extra {
            if self.dropped_fields.insert(field.to_string()) {
                tracing::warn!(
                    path = %self.path.display(),
                    field,
                    "field not in run log header; dropping it"
                );
            }
        }

        Ok(columns
            .iter()
            .map(|c| record.get(c).map(|v| v.to_cell()).unwrap_or_default())
            .collect())
    }

    /// Append one record.
    ///
    /// The first call also writes the CSV header row from the record's
    /// field names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaMismatch`] under [`SchemaPolicy::Strict`] when
    /// the record's fields differ from the header, or the IO error.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        let text = match self.columns.take() {
            Some(columns) => {
                let cells = self.row_cells(&columns, record);
                self.columns = Some(columns);
                codec::encode_row(cells?)
            }
            None => {
                let columns: Vec<String> = record.keys().map(str::to_string).collect();
                let mut text = codec::encode_row(&columns);
                text.push_str(&codec::encode_row(record.iter().map(|(_, v)| v.to_cell())));
                self.columns = Some(columns);
                text
            }
        };

        self.writer()?.write_all(text.as_bytes())?;
        self.rows_written += 1;
        Ok(())
    }

    /// Push buffered rows to durable storage without closing the file.
    ///
    /// # Errors
    ///
    /// Returns the IO error from flushing or syncing.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }
        Ok(())
    }

    /// Flush and release the file handle. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns the IO error from the final flush.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_data()?;
        }
        Ok(())
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to close run log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    fn header() -> Metadata {
        let mut metadata = Metadata::new();
        metadata.push("run", "r1");
        metadata
    }

    #[test]
    fn test_create_writes_header_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.csv");
        std::fs::write(&path, "stale contents\n").unwrap();

        let mut log = RunLog::create(&path, &header(), SchemaPolicy::Permissive).unwrap();
        log.close().unwrap();

        assert_eq!(read(&path), "# run: r1\n");
    }

    #[test]
    fn test_first_record_fixes_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.csv");
        let mut log = RunLog::create(&path, &header(), SchemaPolicy::Permissive).unwrap();

        log.append(&Record::new().with("loss", 1.0).with("step", 0)).unwrap();
        log.append(&Record::new().with("step", 1).with("loss", 0.5)).unwrap();
        log.close().unwrap();

        assert_eq!(read(&path), "# run: r1\nloss,step\n1.0,0\n0.5,1\n");
        assert_eq!(log.rows_written(), 2);
        assert_eq!(log.columns().unwrap(), ["loss", "step"]);
    }

    #[test]
    fn test_permissive_drift_aligns_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.csv");
        let mut log = RunLog::create(&path, &header(), SchemaPolicy::Permissive).unwrap();

        log.append(&Record::new().with("a", 1).with("b", 2)).unwrap();
        log.append(&Record::new().with("b", 3).with("c", 4)).unwrap();
        log.close().unwrap();

        assert_eq!(read(&path), "# run: r1\na,b\n1,2\n,3\n");
    }

    #[test]
    fn test_strict_drift_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.csv");
        let mut log = RunLog::create(&path, &header(), SchemaPolicy::Strict).unwrap();

        log.append(&Record::new().with("a", 1)).unwrap();
        let err = log.append(&Record::new().with("b", 2)).unwrap_err();
        log.close().unwrap();

        assert!(matches!(err, Error::SchemaMismatch { .. }));
        assert_eq!(read(&path), "# run: r1\na\n1\n");
        // Header survives the rejected record
        assert_eq!(log.columns().unwrap(), ["a"]);
    }

    #[test]
    fn test_close_is_idempotent_and_append_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.csv");
        let mut log = RunLog::create(&path, &header(), SchemaPolicy::Permissive).unwrap();

        log.append(&Record::new().with("x", 1)).unwrap();
        log.close().unwrap();
        log.close().unwrap();
        assert!(!log.is_open());

        log.append(&Record::new().with("x", 2)).unwrap();
        drop(log);

        assert_eq!(read(&path), "# run: r1\nx\n1\n2\n");
    }

    #[test]
    fn test_flush_makes_rows_visible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r1.csv");
        let mut log = RunLog::create(&path, &header(), SchemaPolicy::Permissive).unwrap();

        log.append(&Record::new().with("x", "a,b")).unwrap();
        log.flush().unwrap();

        assert_eq!(read(&path), "# run: r1\nx\n\"a,b\"\n");
        assert!(log.is_open());
    }
}
