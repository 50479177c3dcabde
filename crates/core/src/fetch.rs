//! Request lifecycle tracking with stale-response suppression.
//!
//! Every fetch is tagged with a generation number taken from a monotonically
//! increasing counter. Completions carrying anything but the latest generation
//! are dropped, so a slow early request can never overwrite a faster later one.

use std::fmt;

use crate::error::ApiError;

/// Generation number identifying one issued request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<T> {
    pub status: FetchStatus,
    pub data: Option<T>,
    pub error: Option<String>,
    pub request_id: RequestId,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            status: FetchStatus::Idle,
            data: None,
            error: None,
            request_id: RequestId::default(),
        }
    }
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

/// Outcome of delivering a completion to a [`FetchController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Stale,
}

#[derive(Debug, Clone)]
pub struct FetchController<T> {
    latest: RequestId,
    state: FetchState<T>,
}

impl<T> Default for FetchController<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FetchController<T> {
    pub fn new() -> Self {
        Self {
            latest: RequestId::default(),
            state: FetchState::default(),
        }
    }

    /// Start a new request generation and return the id its completion must carry.
    pub fn begin(&mut self) -> RequestId {
        self.latest = self.latest.next();
        self.state.status = FetchStatus::Loading;
        self.state.request_id = self.latest;
        self.latest
    }

    /// Deliver a completion. Only the most recently issued id is applied.
    pub fn resolve(&mut self, id: RequestId, result: Result<T, ApiError>) -> Resolution {
        if id != self.latest {
            tracing::debug!(
                request = id.get(),
                latest = self.latest.get(),
                "discarding stale response"
            );
            return Resolution::Stale;
        }

        match result {
            Ok(data) => {
                self.state.status = FetchStatus::Success;
                self.state.data = Some(data);
                self.state.error = None;
            }
            Err(err) => {
                self.state.status = FetchStatus::Error;
                self.state.error = Some(err.user_message());
            }
        }
        Resolution::Applied
    }

    /// Return to `Idle` without rewinding the counter, so in-flight requests stay stale.
    pub fn reset(&mut self) {
        self.latest = self.latest.next();
        self.state = FetchState {
            request_id: self.latest,
            ..FetchState::default()
        };
    }

    pub fn state(&self) -> &FetchState<T> {
        &self.state
    }

    pub fn data(&self) -> Option<&T> {
        self.state.data.as_ref()
    }
}
