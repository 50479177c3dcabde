//! Runs a [`ViewStore`] against a [`Backend`].
//!
//! The driver owns the store and is the only thing that touches it. Requests
//! run as tokio tasks and are joined in whatever order they finish; the store's
//! generation check decides what is kept.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::task::JoinSet;

use crate::actions::{ActionDispatcher, Mutation, MutationCommand, MutationOutcome};
use crate::backend::Backend;
use crate::error::ApiError;
use crate::fetch::{FetchStatus, RequestId, Resolution};
use crate::model::{Entity, ListPage};
use crate::query::FilterState;
use crate::telemetry::{self, Event};
use crate::view::{FetchCommand, SelectionMode, ViewStore};

/// Completions delivered back to the driver.
#[derive(Debug)]
pub enum Message<T> {
    ListLoaded(RequestId, Result<ListPage<T>, ApiError>),
    DetailLoaded(RequestId, Result<T, ApiError>),
    MutationFinished(Mutation, Result<Value, ApiError>),
}

/// What handling one completion did to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    List(Resolution),
    Detail(Resolution),
    Mutation(MutationOutcome),
}

pub struct ViewDriver<T> {
    name: String,
    store: ViewStore<T>,
    actions: ActionDispatcher,
    backend: Arc<dyn Backend>,
    telemetry: Arc<telemetry::Handle>,
    tasks: JoinSet<Message<T>>,
}

impl<T> ViewDriver<T>
where
    T: Entity + Clone + DeserializeOwned + Send + 'static,
{
    pub fn new(
        name: impl Into<String>,
        store: ViewStore<T>,
        backend: Arc<dyn Backend>,
        telemetry: Arc<telemetry::Handle>,
    ) -> Self {
        let actions = ActionDispatcher::new(store.base_endpoint());
        Self {
            name: name.into(),
            store,
            actions,
            backend,
            telemetry,
            tasks: JoinSet::new(),
        }
    }

    pub fn load(&mut self) {
        let command = self.store.load();
        self.spawn_list(command);
    }

    pub fn refresh(&mut self) {
        let command = self.store.refresh();
        self.spawn_list(command);
    }

    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(command) = self.store.set_filter(key, value) {
            self.spawn_list(command);
        }
    }

    /// Apply several filter changes with a single fetch.
    pub fn apply_filters(&mut self, filters: &FilterState) {
        if let Some(command) = self.store.set_filters(filters) {
            self.spawn_list(command);
        }
    }

    pub fn clear_filters(&mut self) {
        if let Some(command) = self.store.clear_filters() {
            self.spawn_list(command);
        }
    }

    pub fn set_tab(&mut self, index: usize) {
        if let Some(command) = self.store.set_tab(index) {
            self.spawn_list(command);
        }
    }

    pub fn set_page(&mut self, page: usize) {
        if let Some(command) = self.store.set_page(page) {
            self.spawn_list(command);
        }
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        if let Some(command) = self.store.set_rows_per_page(rows_per_page) {
            self.spawn_list(command);
        }
    }

    pub fn select(&mut self, entity: T, mode: SelectionMode) {
        if let Some(command) = self.store.select(entity, mode) {
            self.spawn_detail(command);
        }
    }

    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.store.set_selection_mode(mode);
    }

    pub fn close_selection(&mut self) {
        self.store.close_selection();
        self.actions.dismiss_error();
    }

    pub fn create(&mut self, payload: Value) {
        let command = self.actions.create(payload);
        self.spawn_mutation(command);
    }

    pub fn update(&mut self, id: impl Into<String>, payload: Value) {
        let command = self.actions.update(id, payload);
        self.spawn_mutation(command);
    }

    pub fn delete(&mut self, id: impl Into<String>) {
        let command = self.actions.delete(id);
        self.spawn_mutation(command);
    }

    /// Wait for the next completion and reconcile it. `None` when nothing is in flight.
    ///
    /// A request task that panicked is logged and skipped.
    pub async fn next(&mut self) -> Option<Update> {
        loop {
            match self.tasks.join_next().await? {
                Ok(message) => return Some(self.handle(message)),
                Err(err) => {
                    tracing::warn!(view = self.name.as_str(), error = %err, "request task failed")
                }
            }
        }
    }

    /// Process completions until every issued request has finished.
    pub async fn settle(&mut self) {
        while self.next().await.is_some() {}
    }

    pub fn handle(&mut self, message: Message<T>) -> Update {
        match message {
            Message::ListLoaded(id, result) => {
                let resolution = self.store.apply_list(id, result);
                self.record_list(id, resolution);
                Update::List(resolution)
            }
            Message::DetailLoaded(id, result) => {
                Update::Detail(self.store.apply_detail(id, result))
            }
            Message::MutationFinished(mutation, result) => {
                let outcome = self.actions.finish(&mutation, result, &mut self.store);
                match &outcome {
                    MutationOutcome::Applied { refetch } => {
                        self.telemetry
                            .record(Event::MutationApplied(mutation.label().to_string()));
                        self.spawn_list(refetch.clone());
                    }
                    MutationOutcome::Failed { message } => {
                        self.telemetry.record(Event::MutationFailed {
                            action: mutation.label().to_string(),
                            error: message.clone(),
                        });
                    }
                }
                Update::Mutation(outcome)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &ViewStore<T> {
        &self.store
    }

    pub fn actions(&self) -> &ActionDispatcher {
        &self.actions
    }

    pub fn telemetry(&self) -> &telemetry::Handle {
        &self.telemetry
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    fn record_list(&self, id: RequestId, resolution: Resolution) {
        let view = self.name.clone();
        let event = match resolution {
            Resolution::Stale => Event::StaleDiscarded {
                view,
                request: id.get(),
            },
            Resolution::Applied => {
                let state = self.store.list_state();
                match state.status {
                    FetchStatus::Error => Event::RefreshFailed {
                        view,
                        error: state.error.clone().unwrap_or_default(),
                    },
                    _ => Event::RefreshCompleted {
                        view,
                        count: self.store.rows().len(),
                    },
                }
            }
        };
        self.telemetry.record(event);
    }

    fn spawn_list(&mut self, command: FetchCommand) {
        self.telemetry
            .record(Event::RefreshRequested(self.name.clone()));
        let backend = self.backend.clone();
        self.tasks.spawn(async move {
            let result = match backend.get(&command.descriptor).await {
                Ok(payload) => {
                    serde_json::from_value::<ListPage<T>>(payload).map_err(ApiError::from)
                }
                Err(err) => Err(err),
            };
            Message::ListLoaded(command.id, result)
        });
    }

    fn spawn_detail(&mut self, command: FetchCommand) {
        let backend = self.backend.clone();
        self.tasks.spawn(async move {
            let result = match backend.get(&command.descriptor).await {
                Ok(payload) => serde_json::from_value::<T>(payload).map_err(ApiError::from),
                Err(err) => Err(err),
            };
            Message::DetailLoaded(command.id, result)
        });
    }

    fn spawn_mutation(&mut self, command: MutationCommand) {
        let backend = self.backend.clone();
        self.tasks.spawn(async move {
            let MutationCommand { mutation, request } = command;
            let result = backend.send(&request).await;
            Message::MutationFinished(mutation, result)
        });
    }
}
