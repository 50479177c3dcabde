use std::path::PathBuf;

use clap::{value_parser, ArgAction, Args, Parser, Subcommand};

use crate::core::Resource;

const EXAMPLES: &str = "Examples:\n  \
    placement login --email tpo@college.edu --password ****\n  \
    placement list drives --tab upcoming\n  \
    placement list audit-logs --filter action=create --page 2\n  \
    placement delete companies 64f0c2 64f0c3";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "placement",
    version,
    about = "Administer companies, students and recruitment drives from the terminal.",
    after_help = EXAMPLES
)]
pub struct Cli {
    /// Base URL of the placement API (defaults to $PLACEMENT_API_URL or http://localhost:5000/api)
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the data directory holding the saved session
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Default rows per page for list views
    #[arg(long, value_name = "N", global = true, value_parser = value_parser!(usize))]
    pub rows: Option<usize>,

    /// Tracing filter directive (e.g. "info", "debug", "placement_core=trace")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Sign in and remember the session token
    Login(LoginArgs),
    /// Forget the saved session
    Logout,
    /// List a resource with filters, tabs and pagination
    List(ListArgs),
    /// Show one record
    Show(ShowArgs),
    /// Create a record from a JSON payload
    Create(CreateArgs),
    /// Update a record from a JSON payload
    Update(UpdateArgs),
    /// Delete one or more records by id
    Delete(DeleteArgs),
    /// Show dashboard statistics
    Dashboard(DashboardArgs),
    /// Show the unread notification count
    Notifications(NotificationsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(value_enum)]
    pub resource: Resource,

    /// Filter as key=value (repeatable; "all" or empty means unconstrained)
    #[arg(long = "filter", short = 'f', value_name = "KEY=VALUE", action = ArgAction::Append)]
    pub filters: Vec<String>,

    /// Tab label, e.g. "upcoming" for drives
    #[arg(long)]
    pub tab: Option<String>,

    /// One-based page number
    #[arg(long, default_value_t = 1, value_parser = value_parser!(usize))]
    pub page: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[arg(value_enum)]
    pub resource: Resource,

    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[arg(value_enum)]
    pub resource: Resource,

    /// JSON object describing the record
    #[arg(long, value_name = "JSON")]
    pub data: String,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[arg(value_enum)]
    pub resource: Resource,

    #[arg(value_name = "ID")]
    pub id: String,

    /// JSON object with the fields to change
    #[arg(long, value_name = "JSON")]
    pub data: String,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(value_enum)]
    pub resource: Resource,

    /// One or more record ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    /// Filter as key=value (period, department)
    #[arg(long = "filter", short = 'f', value_name = "KEY=VALUE", action = ArgAction::Append)]
    pub filters: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NotificationsArgs {
    /// Keep polling and print this many updates before exiting
    #[arg(long, value_name = "COUNT", value_parser = value_parser!(u32))]
    pub watch: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_filters_and_global_flags() {
        let cli = Cli::try_parse_from([
            "placement",
            "list",
            "audit-logs",
            "-f",
            "action=create",
            "--filter",
            "entityType=company",
            "--page",
            "2",
            "--api-url",
            "http://api.test/api",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://api.test/api"));
        let CliCommand::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.resource, Resource::AuditLogs);
        assert_eq!(args.filters, vec!["action=create", "entityType=company"]);
        assert_eq!(args.page, 2);
    }
}
