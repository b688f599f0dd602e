//! Run log metadata header: `# key: value` lines before the CSV body

use crate::registry::{format_timestamp, RunEntry};
use crate::{Error, Result};
use std::io::{BufRead, Write};

/// Marker written for `git_commit` when no revision was available.
pub const ABSENT: &str = "None";

/// Metadata key holding the run identifier.
pub const KEY_RUN: &str = "run";
/// Metadata key holding the start time.
pub const KEY_TIME: &str = "time";
/// Metadata key holding the normalized command line.
pub const KEY_COMMAND: &str = "command";
/// Metadata key holding the source revision.
pub const KEY_GIT_COMMIT: &str = "git_commit";
/// Metadata key holding the serialized run configuration.
pub const KEY_CONFIG: &str = "config";

const COMMENT_PREFIX: char = '#';

/// Ordered `key: value` pairs from a run log header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: Vec<(String, String)>,
}

impl Metadata {
    /// Create empty metadata.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// The header written for a freshly registered run.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration cannot be serialized.
    pub fn for_run(entry: &RunEntry) -> Result<Self> {
        let mut metadata = Self::new();
        metadata.push(KEY_RUN, entry.run_id());
        metadata.push(KEY_TIME, format_timestamp(entry.started_at()));
        metadata.push(KEY_COMMAND, entry.command());
        metadata.push(KEY_GIT_COMMIT, entry.revision().unwrap_or(ABSENT));
        metadata.push(KEY_CONFIG, serde_json::to_string(entry.config())?);
        Ok(metadata)
    }

    /// Append a pair. `get` returns the first value of a repeated key.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a value that `run` must have.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingMetadata`] if the key is absent.
    pub fn require(&self, run: &str, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| Error::MissingMetadata {
            run: run.to_string(),
            key: key.to_string(),
        })
    }

    /// Source revision, treating the absence marker as `None`.
    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        self.get(KEY_GIT_COMMIT).filter(|v| *v != ABSENT && !v.is_empty())
    }

    /// Keys in header order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the header had no parsable pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write the header, one `# key: value` line per pair.
    ///
    /// Line breaks inside values are flattened to spaces so the header stays
    /// one line per pair.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        for (key, value) in &self.entries {
            let value = value.replace(&['\r', '\n'][..], " ");
            writeln!(out, "{COMMENT_PREFIX} {key}: {value}")?;
        }
        Ok(())
    }

    /// Read header lines up to the first non-comment line.
    ///
    /// Lines without a `:` are skipped. Keys and values are trimmed.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error.
    pub fn read_from<R: BufRead>(input: R) -> Result<Self> {
        let mut metadata = Self::new();
        for line in input.lines() {
            let line = line?;
            let Some(rest) = line.strip_prefix(COMMENT_PREFIX) else {
                break;
            };
            if let Some((key, value)) = rest.trim().split_once(':') {
                metadata.push(key.trim(), value.trim());
            }
        }
        Ok(metadata)
    }
}

/// Split run log text into its header part and its CSV body.
///
/// The body starts at the first line that does not begin with `#`.
#[must_use]
pub fn split_header(text: &str) -> (&str, &str) {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if !line.starts_with(COMMENT_PREFIX) {
            break;
        }
        offset += line.len();
    }
    text.split_at(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::RunConfig;

    #[test]
    fn test_for_run_key_order() {
        let entry = RunEntry::new("calm-oak-1", "train.py", RunConfig::new());
        let metadata = Metadata::for_run(&entry).unwrap();

        assert_eq!(
            metadata.keys().collect::<Vec<_>>(),
            vec!["run", "time", "command", "git_commit", "config"]
        );
        assert_eq!(metadata.get("git_commit"), Some(ABSENT));
        assert_eq!(metadata.revision(), None);
        assert_eq!(metadata.get("config"), Some("{}"));
    }

    #[test]
    fn test_write_then_read() {
        let mut metadata = Metadata::new();
        metadata.push("run", "r1");
        metadata.push("time", "2024-01-02T03:04:05.000006Z");
        metadata.push("note", "multi\nline");

        let mut buf = Vec::new();
        metadata.write_to(&mut buf).unwrap();
        buf.extend_from_slice(b"loss,step\n1.0,0\n");

        let read = Metadata::read_from(buf.as_slice()).unwrap();
        assert_eq!(read.get("run"), Some("r1"));
        // Only the first colon separates key from value
        assert_eq!(read.get("time"), Some("2024-01-02T03:04:05.000006Z"));
        assert_eq!(read.get("note"), Some("multi line"));
        assert_eq!(read.len(), 3);
    }

    #[test]
    fn test_read_skips_lines_without_colon() {
        let text = "# just a comment\n# key: value\nloss\n";
        let read = Metadata::read_from(text.as_bytes()).unwrap();
        assert_eq!(read.iter().collect::<Vec<_>>(), vec![("key", "value")]);
    }

    #[test]
    fn test_require_reports_missing_key() {
        let metadata = Metadata::new();
        let err = metadata.require("r1", "time").unwrap_err();
        assert!(matches!(err, Error::MissingMetadata { ref key, .. } if key == "time"));
    }

    #[test]
    fn test_split_header() {
        let text = "# run: a\n# time: b\nloss,step\n1,0\n";
        let (header, body) = split_header(text);
        assert_eq!(header, "# run: a\n# time: b\n");
        assert_eq!(body, "loss,step\n1,0\n");
    }
}
