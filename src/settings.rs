//! Ambient configuration and storage layout
//!
//! A storage directory holds the shared registry (`runs.db`) and one run
//! log per run (`<run>.csv`). It is found in this order:
//!
//! 1. an explicit [`SettingsBuilder::storage_dir`]
//! 2. the `RUNLOG_DIR` environment variable (via [`Settings::from_env`])
//! 3. `.runlog` under the git project root of the working directory
//! 4. `.runlog` under the working directory itself

use crate::probe;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Name of the storage directory under the project root.
pub const STORAGE_DIR_NAME: &str = ".runlog";

/// File name of the shared run registry inside the storage directory.
pub const REGISTRY_FILE_NAME: &str = "runs.db";

/// Environment variable overriding the storage directory.
pub const STORAGE_DIR_ENV: &str = "RUNLOG_DIR";

/// File extension of run logs.
const RUN_LOG_EXTENSION: &str = "csv";

/// How a run log treats records whose fields differ from its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Align cells by column name; blank missing fields, drop extra ones.
    #[default]
    Permissive,
    /// Reject any record whose field set differs from the header.
    Strict,
}

/// Tracker and reader settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    storage_dir: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    command: Option<Vec<String>>,
    schema_policy: SchemaPolicy,
}

impl Settings {
    /// Create a settings builder
    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Default settings, honouring `RUNLOG_DIR` when set.
    #[must_use]
    pub fn from_env() -> Self {
        let mut builder = Self::builder();
        if let Some(dir) = std::env::var_os(STORAGE_DIR_ENV).filter(|d| !d.is_empty()) {
            builder = builder.storage_dir(dir);
        }
        builder.build()
    }

    /// Schema drift policy for run logs.
    #[must_use]
    pub const fn schema_policy(&self) -> SchemaPolicy {
        self.schema_policy
    }

    /// Directory provenance is probed from (defaults to the current directory).
    #[must_use]
    pub fn working_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Command line recorded for new runs (defaults to the process arguments).
    ///
    /// Arguments that are not valid Unicode are recorded lossily.
    #[must_use]
    pub fn command_args(&self) -> Vec<String> {
        self.command
            .clone()
            .unwrap_or_else(|| lossy_args(std::env::args_os()))
    }

    /// Resolve the storage layout.
    #[must_use]
    pub fn storage(&self) -> StorageLayout {
        if let Some(dir) = &self.storage_dir {
            return StorageLayout::new(dir);
        }
        let working = self.working_dir();
        self.storage_under(probe::project_root(&working).as_deref())
    }

    /// Resolve the storage layout given an already probed project root.
    #[must_use]
    pub fn storage_under(&self, project_root: Option<&Path>) -> StorageLayout {
        if let Some(dir) = &self.storage_dir {
            return StorageLayout::new(dir);
        }
        let base = project_root.map_or_else(|| self.working_dir(), Path::to_path_buf);
        StorageLayout::new(base.join(STORAGE_DIR_NAME))
    }
}

fn lossy_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}

/// Builder for [`Settings`].
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    /// Use `dir` as the storage directory instead of discovering one.
    #[must_use]
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.storage_dir = Some(dir.into());
        self
    }

    /// Probe git provenance from `dir` instead of the current directory.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.working_dir = Some(dir.into());
        self
    }

    /// Record `args` as the invoking command instead of the process arguments.
    #[must_use]
    pub fn command<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.command = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Set the schema drift policy.
    #[must_use]
    pub fn schema_policy(mut self, policy: SchemaPolicy) -> Self {
        self.settings.schema_policy = policy;
        self
    }

    /// Build the settings
    #[must_use]
    pub fn build(self) -> Settings {
        self.settings
    }
}

/// Paths inside one storage directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    dir: PathBuf,
}

impl StorageLayout {
    /// Layout rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the shared run registry.
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.dir.join(REGISTRY_FILE_NAME)
    }

    /// Path of the run log for `run_id`.
    #[must_use]
    pub fn log_path(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.{RUN_LOG_EXTENSION}"))
    }

    /// Places a run log may live, in lookup order: this directory, then
    /// `.runlog` under the current directory.
    #[must_use]
    pub fn log_candidates(&self, run_id: &str) -> Vec<PathBuf> {
        let mut candidates = vec![self.log_path(run_id)];
        let local = PathBuf::from(STORAGE_DIR_NAME).join(format!("{run_id}.{RUN_LOG_EXTENSION}"));
        if !candidates.contains(&local) {
            candidates.push(local);
        }
        candidates
    }
}
