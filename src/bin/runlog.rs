//! `runlog` - list and inspect tracked runs
//!
//! ```text
//! runlog list -n 5        # five most recent runs
//! runlog show             # most recent run
//! runlog show calm-oak-1  # a specific run
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use runlog::reader::{describe_metadata, display_time, read_metadata, read_table};
use runlog::{RunReader, Settings};
use std::path::PathBuf;

const RULE_WIDTH: usize = 80;

#[derive(Parser, Debug)]
#[command(author, version, about = "List and inspect tracked runs", long_about = None)]
struct Cli {
    /// Storage directory (defaults to $RUNLOG_DIR, then .runlog under the project root)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the most recent runs
    List {
        /// Number of runs to display
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Describe one run (the most recent by default)
    Show {
        /// Run identifier
        run: Option<String>,
    },
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}

fn list(reader: &RunReader, limit: usize) -> Result<()> {
    let layout = reader.layout();
    if !layout.dir().exists() {
        println!("No run storage directory found at {}", layout.dir().display());
        return Ok(());
    }
    if !layout.registry_path().exists() {
        println!("No run registry found at {}", layout.registry_path().display());
        return Ok(());
    }

    let runs = reader.list_recent(limit).context("reading run registry")?;
    if runs.is_empty() {
        println!("No runs found in the registry.");
        return Ok(());
    }

    println!("Last {} runs:", runs.len());
    println!("{}", "=".repeat(RULE_WIDTH));
    for summary in runs {
        let entry = &summary.entry;
        println!("Run: {}", entry.run_id());
        println!("Time: {}", entry.started_at().format("%Y-%m-%d %H:%M:%S"));
        println!("Command: {}", entry.command());
        println!("Logs: {}", summary.rows);
        println!("{}", "-".repeat(RULE_WIDTH));
    }
    Ok(())
}

fn show(reader: &RunReader, run: Option<&str>) -> Result<()> {
    let (run_id, path) = reader.find(run)?;
    let metadata = read_metadata(&path)?;
    println!("{}", describe_metadata(&run_id, &metadata)?);

    for (key, value) in metadata.iter() {
        match key {
            "run" | "command" | "git_commit" => {}
            "time" => println!("  time: {}", display_time(value)),
            _ => println!("  {key}: {value}"),
        }
    }

    let table = read_table(&path)?;
    println!("  columns: {}", table.columns().join(", "));
    println!("  rows: {}", table.num_rows());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let settings = match cli.dir {
        Some(dir) => Settings::builder().storage_dir(dir).build(),
        None => Settings::from_env(),
    };
    let reader = RunReader::new(&settings);

    match cli.command {
        Command::List { limit } => list(&reader, limit),
        Command::Show { run } => show(&reader, run.as_deref()),
    }
}
