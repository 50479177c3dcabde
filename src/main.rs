use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = placement::cli::Cli::parse();
    placement::run_blocking(cli)
}
