pub mod cli;
pub mod commands;
pub mod config;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

pub use placement_core as core;
pub use placement_core::AppConfig;

use crate::cli::Cli;
use crate::core::PlacementService;

/// Execute the parsed command on an internal Tokio runtime, writing to stdout.
pub fn run_blocking(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.clone())?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(cli))
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = config::from_cli(&cli)?;
    tracing::debug!(
        api = %config.api_base_url(),
        data_dir = %config.data_dir().display(),
        "resolved configuration"
    );
    let service = PlacementService::new(config)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    commands::execute(&service, cli.command, &mut handle).await
}

fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "info".to_string());
    let directive: Directive = filter
        .parse()
        .with_context(|| format!("Invalid log directive '{filter}'"))?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
