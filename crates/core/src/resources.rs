//! The list-backed resources of the admin client and the views they start with.

use std::fmt;

use clap::ValueEnum;

use crate::model::Entity;
use crate::query::{FilterState, ALL};
use crate::view::{TabSpec, ViewStore};

pub const DASHBOARD_ENDPOINT: &str = "/dashboard/stats";
pub const UNREAD_COUNT_ENDPOINT: &str = "/notifications/unread-count";
pub const LOGIN_ENDPOINT: &str = "/auth/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Resource {
    Companies,
    Students,
    Drives,
    AuditLogs,
}

impl Resource {
    pub fn endpoint(&self) -> &'static str {
        match self {
            Resource::Companies => "/companies",
            Resource::Students => "/students",
            Resource::Drives => "/drives",
            Resource::AuditLogs => "/audit-logs",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Resource::Companies => "Companies",
            Resource::Students => "Students",
            Resource::Drives => "Drives",
            Resource::AuditLogs => "Audit Logs",
        }
    }

    /// Filter keys a view exposes, all starting unconstrained.
    pub fn default_filters(&self) -> FilterState {
        let keys: &[&str] = match self {
            Resource::Companies => &["search", "status", "industry"],
            Resource::Students => &["search", "department", "batch", "status"],
            Resource::Drives => &["search", "status"],
            Resource::AuditLogs => &["action", "entityType", "from", "to"],
        };
        keys.iter()
            .map(|key| {
                let value = if *key == "search" { "" } else { ALL };
                (*key, value)
            })
            .collect()
    }

    pub fn tabs(&self) -> Vec<TabSpec> {
        let endpoint = self.endpoint();
        match self {
            Resource::Drives => vec![
                TabSpec::new("All", endpoint),
                TabSpec::new("Upcoming", endpoint).with_filter("status", "upcoming"),
                TabSpec::new("Ongoing", endpoint).with_filter("status", "ongoing"),
                TabSpec::new("Completed", endpoint).with_filter("status", "completed"),
            ],
            Resource::Students => vec![
                TabSpec::new("All", endpoint),
                TabSpec::new("Placed", endpoint).with_filter("status", "placed"),
                TabSpec::new("Unplaced", endpoint).with_filter("status", "unplaced"),
            ],
            Resource::Companies | Resource::AuditLogs => vec![TabSpec::new("All", endpoint)],
        }
    }

    pub fn view_store<T: Entity + Clone>(&self, rows_per_page: usize) -> ViewStore<T> {
        ViewStore::new(self.endpoint(), self.default_filters(), rows_per_page)
            .with_tabs(self.tabs())
    }

    /// Audit logs are read-only.
    pub fn is_mutable(&self) -> bool {
        !matches!(self, Resource::AuditLogs)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint().trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Drive;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(Resource::Companies, "/companies")]
    #[case(Resource::Students, "/students")]
    #[case(Resource::Drives, "/drives")]
    #[case(Resource::AuditLogs, "/audit-logs")]
    fn default_view_issues_no_filter_params(#[case] resource: Resource, #[case] endpoint: &str) {
        let mut store = resource.view_store::<Drive>(10);
        let command = store.load();
        assert_eq!(command.descriptor.endpoint(), endpoint);
        assert_eq!(command.descriptor.to_query_string(), "page=1&limit=10");
    }

    #[test]
    fn drive_tabs_constrain_status() {
        let mut store = Resource::Drives.view_store::<Drive>(10);
        store.load();
        let index = store.tab_index("ongoing").unwrap();
        let command = store.set_tab(index).unwrap();
        assert_eq!(command.descriptor.param("status"), Some("ongoing"));
    }

    #[test]
    fn cli_names_are_kebab_case() {
        let value = Resource::AuditLogs.to_possible_value().unwrap();
        assert_eq!(value.get_name(), "audit-logs");
        assert_eq!(Resource::AuditLogs.to_string(), "audit-logs");
    }
}
