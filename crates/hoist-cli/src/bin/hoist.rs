use anyhow::Result;
use clap::Parser;
use hoist_cli::args::CliArgs;

fn main() -> Result<()> {
    // Only installs a subscriber when HOIST_LOG or RUST_LOG is set.
    hoist_cli::tracing_config::init_tracing();

    let args = CliArgs::parse();
    let output = hoist_cli::run(&args)?;
    print!("{output}");
    Ok(())
}
