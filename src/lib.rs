pub use placement_cli::cli;
pub use placement_cli::commands;
pub use placement_cli::config;
pub use placement_cli::{run, run_blocking};

pub use placement_core as core;
pub use placement_core::{driver, model, query, session, view};
pub use placement_core::{AppConfig, PlacementService};
