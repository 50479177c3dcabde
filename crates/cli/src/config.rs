pub use placement_core::config::*;

use crate::cli::Cli;

pub fn from_cli(cli: &Cli) -> anyhow::Result<AppConfig> {
    let config = AppConfig::discover(cli.api_url.clone(), cli.data_dir.clone())?;
    Ok(match cli.rows {
        Some(rows) => config.with_rows_per_page(rows),
        None => config,
    })
}
