//! Logging Engine - one tracked run from start to close
//!
//! ```text
//! Uninitialized ──start──> Active ──close──> Closed
//!       └─────────────────close─────────────────┘
//! ```
//!
//! `log` and `commit` only act in `Active`; anywhere else they are silently
//! ignored. Dropping an active tracker closes it.
//!
//! # Example
//!
//! ```rust,no_run
//! use runlog::{Record, RunConfig, Settings, Tracker};
//!
//! let mut config = RunConfig::new();
//! config.insert("lr".into(), serde_json::json!(0.01));
//!
//! let mut tracker = Tracker::new(Settings::from_env());
//! let run_id = tracker.start(config)?;
//!
//! for epoch in 0..3 {
//!     // Several records under one step, then advance
//!     tracker.log(Record::new().with("loss", 1.0 / f64::from(epoch + 1)), None, false)?;
//!     tracker.log(Record::new().with("loss", 0.5 / f64::from(epoch + 1)), None, true)?;
//!     tracker.commit()?;
//! }
//! tracker.close()?;
//! println!("logged run {run_id}");
//! # Ok::<(), runlog::Error>(())
//! ```

use crate::identity::IdGenerator;
use crate::logfile::{Metadata, RunLog};
use crate::probe::Provenance;
use crate::registry::{Registry, RunEntry};
use crate::settings::Settings;
use crate::table::STEP_COLUMN;
use crate::value::{Record, RunConfig};
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Lifecycle state of a [`Tracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// Created, `start` not called yet.
    Uninitialized,
    /// Run registered, log open.
    Active,
    /// Closed; further calls are ignored.
    Closed,
}

/// Resources held while a run is active.
#[derive(Debug)]
struct ActiveRun {
    log: RunLog,
    registry: Registry,
}

#[derive(Debug)]
enum Phase {
    Uninitialized,
    Active(ActiveRun),
    Closed,
}

/// Logging engine for one run.
#[derive(Debug)]
pub struct Tracker {
    settings: Settings,
    ids: IdGenerator,
    phase: Phase,
    run_id: Option<String>,
    log_path: Option<PathBuf>,
    step: u64,
}

impl Tracker {
    /// Create an uninitialized tracker.
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self {
            settings,
            ids: IdGenerator::new(),
            phase: Phase::Uninitialized,
            run_id: None,
            log_path: None,
            step: 0,
        }
    }

    /// Create a tracker and start a run right away.
    ///
    /// # Errors
    ///
    /// Same as [`Tracker::start`].
    pub fn start_with(settings: Settings, config: RunConfig) -> Result<Self> {
        let mut tracker = Self::new(settings);
        tracker.start(config)?;
        Ok(tracker)
    }

    /// Start a run: draw an identifier, capture provenance, register the run
    /// and create its log.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] unless uninitialized,
    /// [`Error::RunIdCollision`] if the identifier is taken, or the
    /// registry/IO error. The tracker stays uninitialized on failure.
    pub fn start(&mut self, config: RunConfig) -> Result<String> {
        if !matches!(self.phase, Phase::Uninitialized) {
            return Err(Error::AlreadyStarted);
        }

        let run_id = self.ids.generate();
        let provenance =
            Provenance::capture(&self.settings.working_dir(), self.settings.command_args());
        let layout = self.settings.storage_under(provenance.project_root.as_deref());

        let mut registry = Registry::open(layout.registry_path())?;
        let entry = RunEntry::builder(&run_id, provenance.command, config)
            .revision(provenance.revision)
            .build();
        registry.insert_run(&entry)?;

        let path = layout.log_path(&run_id);
        let log = RunLog::create(&path, &Metadata::for_run(&entry)?, self.settings.schema_policy())?;

        tracing::info!(run = %run_id, path = %path.display(), "Starting run");

        self.phase = Phase::Active(ActiveRun { log, registry });
        self.run_id = Some(run_id.clone());
        self.log_path = Some(path);
        self.step = 0;
        Ok(run_id)
    }

    /// Log one record.
    ///
    /// `step` overrides the internal counter; `None` uses its current value.
    /// The step is stored in the record's `step` field. With `commit` the
    /// counter advances by one afterwards.
    ///
    /// Ignored unless the tracker is active.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StepOutOfRange`] for a step above `i64::MAX` (nothing
    /// is written and the counter is untouched), or the run log's write or
    /// schema error.
    pub fn log(&mut self, record: impl Into<Record>, step: Option<u64>, commit: bool) -> Result<()> {
        let Phase::Active(active) = &mut self.phase else {
            tracing::trace!("log ignored: tracker not active");
            return Ok(());
        };

        let step = step.unwrap_or(self.step);
        let cell = i64::try_from(step).map_err(|_| Error::StepOutOfRange(step))?;
        self.step = step;

        let mut record = record.into();
        record.insert(STEP_COLUMN, cell);
        active.log.append(&record)?;

        if commit {
            self.step = step.saturating_add(1);
        }
        Ok(())
    }

    /// Flush the run log to disk. The step counter is untouched.
    ///
    /// # Errors
    ///
    /// Returns the IO error from flushing.
    pub fn commit(&mut self) -> Result<()> {
        match &mut self.phase {
            Phase::Active(active) => active.log.flush(),
            _ => Ok(()),
        }
    }

    /// Close the run, releasing the log file and registry connection.
    ///
    /// Safe to call in any state and more than once.
    ///
    /// # Errors
    ///
    /// Returns the error from the final flush or from closing the registry.
    pub fn close(&mut self) -> Result<()> {
        if let Phase::Active(mut active) = std::mem::replace(&mut self.phase, Phase::Closed) {
            active.log.close()?;
            active.registry.close()?;
            tracing::debug!(run = ?self.run_id, "Closed run");
        }
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TrackerState {
        match self.phase {
            Phase::Uninitialized => TrackerState::Uninitialized,
            Phase::Active(_) => TrackerState::Active,
            Phase::Closed => TrackerState::Closed,
        }
    }

    /// Identifier of the run, once started.
    #[must_use]
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Path of the run log, once started.
    #[must_use]
    pub fn log_path(&self) -> Option<&Path> {
        self.log_path.as_deref()
    }

    /// Step the next record will get when logged without an explicit step.
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(run = ?self.run_id, error = %e, "failed to close tracker");
        }
    }
}
