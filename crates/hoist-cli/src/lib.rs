//! Command-line driver for the hoist scope analyzer.

pub mod args;
pub mod driver;
pub mod tracing_config;

use anyhow::Result;
use args::{CliArgs, Command};

/// Run one parsed command line, returning what to print on stdout.
pub fn run(args: &CliArgs) -> Result<String> {
    match &args.command {
        Command::Analyze(analyze) => driver::analyze(analyze),
        Command::Replay(replay) => driver::replay(replay),
    }
}
