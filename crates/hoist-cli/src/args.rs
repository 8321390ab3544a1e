use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the hoist binary.
#[derive(Parser, Debug)]
#[command(
    name = "hoist",
    version,
    about = "Lexical scope analysis for function-scoped scripts"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a file and print its scope tree.
    Analyze(AnalyzeArgs),
    /// Open a session on a file, replay an edit script, and print the
    /// resulting scope tree.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Source file to analyze.
    pub file: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Keep parsing after syntax errors and report them as diagnostics.
    #[arg(long)]
    pub tolerant: bool,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Initial contents of the document.
    pub file: PathBuf,

    /// JSON array of edit descriptors, applied in order.
    pub edits: PathBuf,

    /// JSON engine configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
