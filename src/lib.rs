//! # runlog: Lightweight Experiment-Run Tracker
//!
//! **Version**: 0.1.0
//!
//! runlog records the metrics a long-running process (a training loop, a
//! simulation, a benchmark sweep) produces, one row per step, and lets a
//! later process find and load them again.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Jidoka**: A run-identifier collision stops the run immediately
//! - **Poka-Yoke**: Missing provenance (no git, no repository) never aborts a run
//! - **Genchi Genbutsu**: Run logs are plain CSV with a readable header; no
//!   tool is needed to inspect them
//! - **Muda elimination**: Append-only writes, no rewrite of earlier rows
//!
//! ## Storage Layout
//!
//! ```text
//! <project root>/.runlog/
//!   runs.db                      Run Registry (SQLite): runs + config tables
//!   quiet-amber-falcon-3f9c0a.csv  Run Log: `# key: value` header + CSV body
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use runlog::{Record, RunConfig, RunReader, Settings, Tracker};
//!
//! // Writer side
//! let mut config = RunConfig::new();
//! config.insert("optimizer".into(), serde_json::json!("adam"));
//! let mut tracker = Tracker::start_with(Settings::from_env(), config)?;
//! tracker.log(Record::new().with("loss", 1.0), Some(0), true)?;
//! tracker.log(Record::new().with("loss", 0.5), None, true)?;
//! tracker.close()?;
//!
//! // Reader side
//! let reader = RunReader::new(&Settings::from_env());
//! let table = reader.load_table(None)?;
//! assert_eq!(table.column_f64("loss"), Some(vec![1.0, 0.5]));
//! # Ok::<(), runlog::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod global;
pub mod identity;
pub mod logfile;
pub mod probe;
pub mod reader;
pub mod registry;
pub mod settings;
pub mod table;
pub mod tracker;
pub mod value;

pub use error::{Error, Result};
pub use identity::{generate_run_id, IdGenerator};
pub use logfile::{Metadata, RunLog};
pub use reader::{RunReader, RunSummary};
pub use registry::{Registry, RunEntry};
pub use settings::{SchemaPolicy, Settings, StorageLayout};
pub use table::RunTable;
pub use tracker::{Tracker, TrackerState};
pub use value::{Record, RunConfig, Scalar};
