//! Records view lifecycle events so refresh and mutation behaviour can be inspected in logs.

#[cfg(feature = "telemetry")]
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RefreshRequested(String),
    RefreshCompleted { view: String, count: usize },
    RefreshFailed { view: String, error: String },
    StaleDiscarded { view: String, request: u64 },
    MutationApplied(String),
    MutationFailed { action: String, error: String },
}

#[derive(Debug, Default)]
pub struct Handle {
    #[cfg(feature = "telemetry")]
    events: Mutex<Vec<Event>>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        #[cfg(feature = "telemetry")]
        {
            match &event {
                Event::RefreshRequested(view) => {
                    tracing::debug!(view = view.as_str(), "view telemetry refresh requested")
                }
                Event::RefreshCompleted { view, count } => {
                    tracing::debug!(
                        view = view.as_str(),
                        count,
                        "view telemetry refresh completed"
                    );
                }
                Event::RefreshFailed { view, error } => {
                    tracing::debug!(
                        view = view.as_str(),
                        error = %error,
                        "view telemetry refresh failed"
                    );
                }
                Event::StaleDiscarded { view, request } => tracing::debug!(
                    view = view.as_str(),
                    request,
                    "view telemetry stale response discarded"
                ),
                Event::MutationApplied(action) => {
                    tracing::debug!(action = action.as_str(), "view telemetry mutation applied")
                }
                Event::MutationFailed { action, error } => tracing::debug!(
                    action = action.as_str(),
                    error = %error,
                    "view telemetry mutation failed"
                ),
            }
            self.events.lock().push(event);
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = event;
        }
    }

    /// Snapshot of everything recorded so far. Always empty without the `telemetry` feature.
    pub fn events(&self) -> Vec<Event> {
        #[cfg(feature = "telemetry")]
        {
            self.events.lock().clone()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            Vec::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "telemetry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_events_when_enabled() {
        let handle = Handle::new();
        handle.record(Event::RefreshCompleted {
            view: "Companies".into(),
            count: 2,
        });
        handle.record(Event::StaleDiscarded {
            view: "Companies".into(),
            request: 1,
        });
        if handle.is_enabled() {
            assert_eq!(handle.events().len(), 2);
        } else {
            assert!(handle.events().is_empty());
        }
    }
}
