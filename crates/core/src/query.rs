//! Filter state and the request descriptors derived from it.

use indexmap::IndexMap;
use url::form_urlencoded;

/// Filter value meaning "apply no constraint for this field".
pub const ALL: &str = "all";

/// Whether a filter value constrains the query at all.
pub fn is_constraint(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed != ALL
}

/// Ordered mapping of filter keys to selected values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    entries: IndexMap<String, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used when declaring a view's default filters.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Set `key` to `value`, keeping its original position. Returns whether anything changed.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        match self.entries.get_mut(&key) {
            Some(existing) if *existing == value => false,
            Some(existing) => {
                *existing = value;
                true
            }
            None => {
                self.entries.insert(key, value);
                true
            }
        }
    }

    /// Reset every constrained entry back to the sentinel.
    pub fn clear(&mut self) -> bool {
        let mut changed = false;
        for value in self.entries.values_mut() {
            if value.as_str() != ALL {
                *value = ALL.to_string();
                changed = true;
            }
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_unconstrained(&self) -> bool {
        !self.entries.values().any(|value| is_constraint(value))
    }

    pub fn summary(&self) -> Option<String> {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, value)| is_constraint(value))
            .map(|(key, value)| format!("{key}:{}", value.trim()))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" | "))
        }
    }
}

impl<K, V> FromIterator<(K, V)> for FilterState
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut state = FilterState::new();
        for (key, value) in iter {
            state.set(key, value);
        }
        state
    }
}

/// Endpoint plus flat query parameters for one fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }

    /// Append a parameter after the filter-derived ones.
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.params {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    pub fn path_and_query(&self) -> String {
        if self.params.is_empty() {
            self.endpoint.clone()
        } else {
            format!("{}?{}", self.endpoint, self.to_query_string())
        }
    }
}

/// Turns filter state into request descriptors for a fixed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    endpoint: String,
}

impl QueryBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build(&self, filters: &FilterState) -> RequestDescriptor {
        build(&self.endpoint, filters)
    }
}

/// Derive a descriptor, keeping only constraining values in insertion order.
pub fn build(endpoint: &str, filters: &FilterState) -> RequestDescriptor {
    let params = filters
        .iter()
        .filter(|(_, value)| is_constraint(value))
        .map(|(key, value)| (key.to_string(), value.trim().to_string()))
        .collect();
    RequestDescriptor {
        endpoint: endpoint.to_string(),
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn drops_all_sentinel_and_keeps_action() {
        let filters = FilterState::new()
            .with("status", "all")
            .with("action", "create");
        let descriptor = QueryBuilder::new("/audit-logs").build(&filters);

        assert_eq!(
            descriptor.params(),
            &[("action".to_string(), "create".to_string())]
        );
        assert_eq!(descriptor.path_and_query(), "/audit-logs?action=create");
    }

    #[rstest]
    #[case("all")]
    #[case("")]
    #[case("   ")]
    fn never_emits_unconstrained_values(#[case] value: &str) {
        let filters = FilterState::new()
            .with("department", value)
            .with("batch", "2026");
        let descriptor = build("/students", &filters);

        assert!(descriptor.param("department").is_none());
        assert_eq!(descriptor.param("batch"), Some("2026"));
    }

    #[test]
    fn default_filters_yield_no_params() {
        let filters = FilterState::new()
            .with("status", ALL)
            .with("industry", ALL)
            .with("search", "");
        let descriptor = build("/companies", &filters);

        assert!(descriptor.params().is_empty());
        assert_eq!(descriptor.path_and_query(), "/companies");
        assert!(filters.is_unconstrained());
    }

    #[test]
    fn preserves_insertion_order_across_updates() {
        let mut filters = FilterState::new()
            .with("b", "2")
            .with("a", "1")
            .with("c", "all");
        filters.set("c", "3");
        filters.set("b", "22");

        let descriptor = build("/x", &filters);
        let keys: Vec<&str> = descriptor
            .params()
            .iter()
            .map(|(key, _)| key.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn set_reports_changes_only() {
        let mut filters = FilterState::new().with("status", "all");
        assert!(!filters.set("status", "all"));
        assert!(filters.set("status", "active"));
        assert!(filters.clear());
        assert!(!filters.clear());
        assert_eq!(filters.get("status"), Some(ALL));
    }

    #[test]
    fn query_string_is_encoded() {
        let descriptor = build("/companies", &FilterState::new().with("search", "R&D labs"))
            .with_param("page", 1)
            .with_param("limit", 10);
        assert_eq!(
            descriptor.to_query_string(),
            "search=R%26D+labs&page=1&limit=10"
        );
    }

    #[test]
    fn summary_lists_constraints() {
        let filters = FilterState::new()
            .with("status", "active")
            .with("industry", "all")
            .with("search", "acme");
        assert_eq!(
            filters.summary().as_deref(),
            Some("status:active | search:acme")
        );
        assert_eq!(FilterState::new().with("x", "all").summary(), None);
    }
}
