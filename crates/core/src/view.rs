//! Paginated, tabbed list state that keeps itself in sync with the backend.
//!
//! All mutation goes through the setters below. A setter that changes anything
//! the query depends on hands back exactly one [`FetchCommand`]; the caller is
//! expected to execute it and later feed the completion into
//! [`ViewStore::apply_list`].

use crate::error::ApiError;
use crate::fetch::{FetchController, FetchState, FetchStatus, RequestId, Resolution};
use crate::model::{Entity, ListPage};
use crate::query::{self, is_constraint, FilterState, RequestDescriptor};

pub const DEFAULT_ROWS_PER_PAGE: usize = 10;

/// Query parameter names used for pagination on the wire.
pub const PAGE_PARAM: &str = "page";
pub const LIMIT_PARAM: &str = "limit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    /// Zero-based page index.
    pub page: usize,
    pub rows_per_page: usize,
    pub total_count: u64,
}

impl PaginationState {
    pub fn new(rows_per_page: usize) -> Self {
        Self {
            page: 0,
            rows_per_page: rows_per_page.max(1),
            total_count: 0,
        }
    }

    pub fn page_count(&self) -> usize {
        let total = self.total_count as usize;
        total.div_ceil(self.rows_per_page).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    View,
    Edit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState<T> {
    pub selected: Option<T>,
    pub mode: Option<SelectionMode>,
}

impl<T> Default for SelectionState<T> {
    fn default() -> Self {
        Self {
            selected: None,
            mode: None,
        }
    }
}

impl<T> SelectionState<T> {
    pub fn is_open(&self) -> bool {
        self.selected.is_some()
    }
}

/// One tab of a list view: its endpoint and the filters it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSpec {
    pub label: String,
    pub endpoint: String,
    pub implicit: Vec<(String, String)>,
}

impl TabSpec {
    pub fn new(label: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            endpoint: endpoint.into(),
            implicit: Vec::new(),
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.implicit.push((key.into(), value.into()));
        self
    }
}

/// A request the owner of the store must issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCommand {
    pub id: RequestId,
    pub descriptor: RequestDescriptor,
}

/// The three mutually exclusive non-data states plus the rows themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayState<'a, T> {
    Loading,
    Error(&'a str),
    Empty,
    Rows(&'a [T]),
}

#[derive(Debug, Clone)]
pub struct ViewStore<T> {
    base_endpoint: String,
    tabs: Vec<TabSpec>,
    tab: usize,
    filters: FilterState,
    pagination: PaginationState,
    selection: SelectionState<T>,
    list: FetchController<ListPage<T>>,
    detail: FetchController<T>,
    detail_key: Option<String>,
}

impl<T: Entity + Clone> ViewStore<T> {
    /// A single-tab view over `base_endpoint`.
    pub fn new(
        base_endpoint: impl Into<String>,
        filters: FilterState,
        rows_per_page: usize,
    ) -> Self {
        let base_endpoint = base_endpoint.into();
        Self {
            tabs: vec![TabSpec::new("All", base_endpoint.clone())],
            base_endpoint,
            tab: 0,
            filters,
            pagination: PaginationState::new(rows_per_page),
            selection: SelectionState::default(),
            list: FetchController::new(),
            detail: FetchController::new(),
            detail_key: None,
        }
    }

    /// Replace the tab strip. An empty list keeps the default tab.
    pub fn with_tabs(mut self, tabs: Vec<TabSpec>) -> Self {
        if !tabs.is_empty() {
            self.tabs = tabs;
            self.tab = 0;
        }
        self
    }

    /// Start on `index` instead of the first tab. Out-of-range indexes are ignored.
    pub fn with_tab(mut self, index: usize) -> Self {
        if index < self.tabs.len() {
            self.tab = index;
        }
        self
    }

    /// Start with `filters` applied on top of the defaults.
    pub fn with_filters(mut self, filters: &FilterState) -> Self {
        for (key, value) in filters.iter() {
            self.filters.set(key, value);
        }
        self
    }

    /// Start on a zero-based `page`.
    pub fn with_page(mut self, page: usize) -> Self {
        self.pagination.page = page;
        self
    }

    /// Initial fetch issued when the view is mounted.
    pub fn load(&mut self) -> FetchCommand {
        self.issue()
    }

    /// Reissue the current query without touching any state.
    pub fn refresh(&mut self) -> FetchCommand {
        self.issue()
    }

    pub fn set_filter(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<FetchCommand> {
        if !self.filters.set(key, value) {
            return None;
        }
        self.pagination.page = 0;
        Some(self.issue())
    }

    /// Apply several filter values at once, issuing at most one fetch.
    pub fn set_filters(&mut self, filters: &FilterState) -> Option<FetchCommand> {
        let mut changed = false;
        for (key, value) in filters.iter() {
            changed |= self.filters.set(key, value);
        }
        if !changed {
            return None;
        }
        self.pagination.page = 0;
        Some(self.issue())
    }

    pub fn clear_filters(&mut self) -> Option<FetchCommand> {
        if !self.filters.clear() {
            return None;
        }
        self.pagination.page = 0;
        Some(self.issue())
    }

    pub fn set_tab(&mut self, index: usize) -> Option<FetchCommand> {
        if index == self.tab || index >= self.tabs.len() {
            return None;
        }
        self.tab = index;
        self.pagination.page = 0;
        Some(self.issue())
    }

    pub fn set_page(&mut self, page: usize) -> Option<FetchCommand> {
        if page == self.pagination.page {
            return None;
        }
        self.pagination.page = page;
        Some(self.issue())
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) -> Option<FetchCommand> {
        let rows_per_page = rows_per_page.max(1);
        if rows_per_page == self.pagination.rows_per_page {
            return None;
        }
        self.pagination.rows_per_page = rows_per_page;
        self.pagination.page = 0;
        Some(self.issue())
    }

    /// Open the dialog for `entity`. Never refetches the list; a newly selected
    /// entity gets its own detail fetch.
    pub fn select(&mut self, entity: T, mode: SelectionMode) -> Option<FetchCommand> {
        let key = entity.id().to_string();
        self.selection = SelectionState {
            selected: Some(entity),
            mode: Some(mode),
        };
        if self.detail_key.as_deref() == Some(key.as_str()) {
            return None;
        }

        let id = self.detail.begin();
        let descriptor = RequestDescriptor::new(self.entity_endpoint(&key));
        self.detail_key = Some(key);
        Some(FetchCommand { id, descriptor })
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        if self.selection.is_open() {
            self.selection.mode = Some(mode);
        }
    }

    pub fn close_selection(&mut self) {
        self.selection = SelectionState::default();
        self.detail_key = None;
        self.detail.reset();
    }

    pub fn apply_list(
        &mut self,
        id: RequestId,
        result: Result<ListPage<T>, ApiError>,
    ) -> Resolution {
        let resolution = self.list.resolve(id, result);
        if resolution == Resolution::Applied {
            if let Some(page) = self.list.data() {
                self.pagination.total_count = page.total;
            }
        }
        resolution
    }

    pub fn apply_detail(&mut self, id: RequestId, result: Result<T, ApiError>) -> Resolution {
        let resolution = self.detail.resolve(id, result);
        if resolution == Resolution::Applied {
            let fresh = self.detail.data();
            if let (Some(fresh), Some(selected)) = (fresh, self.selection.selected.as_mut()) {
                if fresh.id() == selected.id() {
                    *selected = fresh.clone();
                }
            }
        }
        resolution
    }

    /// The request the current state maps to, pagination included.
    pub fn descriptor(&self) -> RequestDescriptor {
        let tab = self.active_tab();
        let mut merged = FilterState::new();
        for (key, value) in &tab.implicit {
            merged.set(key.as_str(), value.as_str());
        }
        for (key, value) in self.filters.iter() {
            if is_constraint(value) || !merged.contains(key) {
                merged.set(key, value);
            }
        }

        query::build(&tab.endpoint, &merged)
            .with_param(PAGE_PARAM, self.pagination.page + 1)
            .with_param(LIMIT_PARAM, self.pagination.rows_per_page)
    }

    pub fn entity_endpoint(&self, id: &str) -> String {
        format!("{}/{}", self.base_endpoint.trim_end_matches('/'), id)
    }

    pub fn display(&self) -> DisplayState<'_, T> {
        let state = self.list.state();
        match state.status {
            FetchStatus::Idle | FetchStatus::Loading => DisplayState::Loading,
            FetchStatus::Error => DisplayState::Error(
                state
                    .error
                    .as_deref()
                    .unwrap_or(crate::error::GENERIC_FAILURE),
            ),
            FetchStatus::Success => match state.data.as_ref() {
                Some(page) if !page.is_empty() => DisplayState::Rows(&page.rows),
                _ => DisplayState::Empty,
            },
        }
    }

    pub fn rows(&self) -> &[T] {
        self.list
            .data()
            .map(|page| page.rows.as_slice())
            .unwrap_or_default()
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.rows().iter().find(|row| row.id() == id)
    }

    pub fn base_endpoint(&self) -> &str {
        &self.base_endpoint
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn pagination(&self) -> PaginationState {
        self.pagination
    }

    pub fn selection(&self) -> &SelectionState<T> {
        &self.selection
    }

    pub fn tabs(&self) -> &[TabSpec] {
        &self.tabs
    }

    pub fn tab(&self) -> usize {
        self.tab
    }

    pub fn active_tab(&self) -> &TabSpec {
        &self.tabs[self.tab]
    }

    pub fn tab_index(&self, label: &str) -> Option<usize> {
        self.tabs
            .iter()
            .position(|tab| tab.label.eq_ignore_ascii_case(label))
    }

    pub fn list_state(&self) -> &FetchState<ListPage<T>> {
        self.list.state()
    }

    pub fn detail_state(&self) -> &FetchState<T> {
        self.detail.state()
    }

    fn issue(&mut self) -> FetchCommand {
        let id = self.list.begin();
        FetchCommand {
            id,
            descriptor: self.descriptor(),
        }
    }
}
