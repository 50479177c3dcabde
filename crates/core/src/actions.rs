//! Create/update/delete operations and their effect on a list view.

use serde_json::Value;

use crate::error::ApiError;
use crate::model::Entity;
use crate::view::{FetchCommand, ViewStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { payload: Value },
    Update { id: String, payload: Value },
    Delete { id: String },
}

impl Mutation {
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Mutation::Create { .. } => None,
            Mutation::Update { id, .. } | Mutation::Delete { id } => Some(id.as_str()),
        }
    }
}

/// Wire-level form of a [`Mutation`].
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<Value>,
}

/// A mutation the owner must send, paired with its request.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationCommand {
    pub mutation: Mutation,
    pub request: MutationRequest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The dialog closed and the list must be refetched.
    Applied { refetch: FetchCommand },
    /// The dialog stays open showing `message`.
    Failed { message: String },
}

#[derive(Debug, Clone, Default)]
pub struct ActionDispatcher {
    base_endpoint: String,
    pending: usize,
    error: Option<String>,
}

impl ActionDispatcher {
    pub fn new(base_endpoint: impl Into<String>) -> Self {
        Self {
            base_endpoint: base_endpoint.into(),
            pending: 0,
            error: None,
        }
    }

    pub fn create(&mut self, payload: Value) -> MutationCommand {
        self.start(Mutation::Create { payload })
    }

    pub fn update(&mut self, id: impl Into<String>, payload: Value) -> MutationCommand {
        self.start(Mutation::Update {
            id: id.into(),
            payload,
        })
    }

    pub fn delete(&mut self, id: impl Into<String>) -> MutationCommand {
        self.start(Mutation::Delete { id: id.into() })
    }

    /// Reconcile a finished mutation with the view it acted on.
    ///
    /// Success closes the selection and refetches without leaving the current
    /// page. Failure leaves the store untouched and keeps the message for the
    /// dialog.
    pub fn finish<T: Entity + Clone>(
        &mut self,
        mutation: &Mutation,
        result: Result<Value, ApiError>,
        store: &mut ViewStore<T>,
    ) -> MutationOutcome {
        self.pending = self.pending.saturating_sub(1);
        match result {
            Ok(_) => {
                self.error = None;
                store.close_selection();
                tracing::debug!(
                    action = mutation.label(),
                    target = mutation.target(),
                    "mutation applied"
                );
                MutationOutcome::Applied {
                    refetch: store.refresh(),
                }
            }
            Err(err) => {
                let message = err.user_message();
                tracing::warn!(
                    action = mutation.label(),
                    target = mutation.target(),
                    error = %err,
                    "mutation failed"
                );
                self.error = Some(message.clone());
                MutationOutcome::Failed { message }
            }
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    fn start(&mut self, mutation: Mutation) -> MutationCommand {
        self.pending += 1;
        self.error = None;
        let request = self.request_for(&mutation);
        MutationCommand { mutation, request }
    }

    fn request_for(&self, mutation: &Mutation) -> MutationRequest {
        let base = self.base_endpoint.trim_end_matches('/');
        match mutation {
            Mutation::Create { payload } => MutationRequest {
                method: Method::Post,
                endpoint: base.to_string(),
                body: Some(payload.clone()),
            },
            Mutation::Update { id, payload } => MutationRequest {
                method: Method::Put,
                endpoint: format!("{base}/{id}"),
                body: Some(payload.clone()),
            },
            Mutation::Delete { id } => MutationRequest {
                method: Method::Delete,
                endpoint: format!("{base}/{id}"),
                body: None,
            },
        }
    }
}
