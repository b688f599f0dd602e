//! Process-wide session: one shared [`Tracker`] behind init / finish
//!
//! For scripts that do not want to thread a tracker through their code.
//! Logging before [`init`] or after [`finish`] is silently ignored, the same
//! as on an inactive tracker.
//!
//! ```rust,no_run
//! use runlog::{global, Record, RunConfig};
//!
//! global::init(RunConfig::new())?;
//! for step in 0..10 {
//!     global::log(Record::new().with("loss", 1.0 / f64::from(step + 1)))?;
//! }
//! global::finish()?;
//! # Ok::<(), runlog::Error>(())
//! ```

use crate::settings::Settings;
use crate::tracker::Tracker;
use crate::value::{Record, RunConfig};
use crate::Result;
use std::sync::{Mutex, MutexGuard, PoisonError};

static SESSION: Mutex<Option<Tracker>> = Mutex::new(None);

fn session() -> MutexGuard<'static, Option<Tracker>> {
    // A panic while logging leaves the tracker itself usable
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start the session run with settings from the environment.
///
/// Returns the run identifier. If a session run is already active, its
/// identifier is returned and `config` is ignored.
///
/// # Errors
///
/// Same as [`Tracker::start`].
pub fn init(config: RunConfig) -> Result<String> {
    init_with(Settings::from_env(), config)
}

/// Start the session run with explicit settings.
///
/// # Errors
///
/// Same as [`Tracker::start`].
pub fn init_with(settings: Settings, config: RunConfig) -> Result<String> {
    let mut guard = session();
    if let Some(run_id) = guard.as_ref().and_then(Tracker::run_id) {
        return Ok(run_id.to_string());
    }
    let tracker = Tracker::start_with(settings, config)?;
    let run_id = tracker.run_id().unwrap_or_default().to_string();
    *guard = Some(tracker);
    Ok(run_id)
}

/// Log a record at the current step and advance the step.
///
/// # Errors
///
/// Returns the run log's write or schema error.
pub fn log(record: impl Into<Record>) -> Result<()> {
    log_at(record, None, true)
}

/// Log a record with an explicit step and commit flag.
///
/// # Errors
///
/// Same as [`Tracker::log`].
pub fn log_at(record: impl Into<Record>, step: Option<u64>, commit: bool) -> Result<()> {
    match session().as_mut() {
        Some(tracker) => tracker.log(record, step, commit),
        None => Ok(()),
    }
}

/// Flush the session run log.
///
/// # Errors
///
/// Returns the IO error from flushing.
pub fn commit() -> Result<()> {
    match session().as_mut() {
        Some(tracker) => tracker.commit(),
        None => Ok(()),
    }
}

/// Identifier of the session run, if one is active.
#[must_use]
pub fn run_name() -> Option<String> {
    session().as_ref().and_then(Tracker::run_id).map(str::to_string)
}

/// Close the session run. A later [`init`] starts a new run.
///
/// # Errors
///
/// Returns the error from closing the tracker.
pub fn finish() -> Result<()> {
    let tracker = session().take();
    match tracker {
        Some(mut tracker) => tracker.close(),
        None => Ok(()),
    }
}
