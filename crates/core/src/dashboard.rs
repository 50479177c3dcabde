//! Filterable dashboard statistics.

use crate::error::ApiError;
use crate::fetch::{FetchController, FetchState, RequestId, Resolution};
use crate::model::DashboardStats;
use crate::query::{FilterState, QueryBuilder, ALL};
use crate::resources::DASHBOARD_ENDPOINT;
use crate::view::FetchCommand;

#[derive(Debug, Clone)]
pub struct Dashboard {
    query: QueryBuilder,
    filters: FilterState,
    stats: FetchController<DashboardStats>,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            query: QueryBuilder::new(DASHBOARD_ENDPOINT),
            filters: FilterState::new().with("period", ALL).with("department", ALL),
            stats: FetchController::new(),
        }
    }

    pub fn load(&mut self) -> FetchCommand {
        self.issue()
    }

    pub fn set_filter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<FetchCommand> {
        if self.filters.set(key, value) {
            Some(self.issue())
        } else {
            None
        }
    }

    pub fn apply(&mut self, id: RequestId, result: Result<DashboardStats, ApiError>) -> Resolution {
        self.stats.resolve(id, result)
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn state(&self) -> &FetchState<DashboardStats> {
        self.stats.state()
    }

    fn issue(&mut self) -> FetchCommand {
        FetchCommand {
            id: self.stats.begin(),
            descriptor: self.query.build(&self.filters),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchStatus;
    use pretty_assertions::assert_eq;

    #[test]
    fn period_filter_refetches_and_drops_stale_stats() {
        let mut dashboard = Dashboard::new();
        let first = dashboard.load();
        assert_eq!(first.descriptor.path_and_query(), "/dashboard/stats");

        let second = dashboard.set_filter("period", "30d").unwrap();
        assert_eq!(second.descriptor.path_and_query(), "/dashboard/stats?period=30d");
        assert!(dashboard.set_filter("period", "30d").is_none());

        let fresh = DashboardStats {
            total_students: 10,
            placed_students: 4,
            ..DashboardStats::default()
        };
        assert_eq!(dashboard.apply(second.id, Ok(fresh.clone())), Resolution::Applied);
        assert_eq!(
            dashboard.apply(first.id, Ok(DashboardStats::default())),
            Resolution::Stale
        );
        assert_eq!(dashboard.state().status, FetchStatus::Success);
        assert_eq!(dashboard.state().data.as_ref(), Some(&fresh));
    }
}
