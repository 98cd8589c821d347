//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "taskqueued", version, about = "Run a queue of observatory automation tasks")]
pub struct Args {
    /// Configuration file (defaults to `taskqueue.toml`).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Add the tasks of a collection file to the queue.
    #[arg(long, value_name = "FILE")]
    pub collection: Option<PathBuf>,

    /// Restore a saved queue before running.
    #[arg(long, value_name = "FILE")]
    pub queue: Option<PathBuf>,

    /// Save the queue once the run is over.
    #[arg(long, value_name = "FILE")]
    pub save: Option<PathBuf>,

    /// Print the template catalog by category and exit.
    #[arg(long)]
    pub list_templates: bool,
}
