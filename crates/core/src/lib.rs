pub mod actions;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod driver;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod model;
pub mod poller;
pub mod query;
pub mod resources;
pub mod services;
pub mod session;
pub mod telemetry;
pub mod view;

pub use actions::{ActionDispatcher, Mutation, MutationCommand, MutationOutcome, MutationRequest};
pub use backend::{Backend, HttpBackend};
pub use config::AppConfig;
pub use dashboard::Dashboard;
pub use driver::{Message, Update, ViewDriver};
pub use error::ApiError;
pub use fetch::{FetchController, FetchState, FetchStatus, RequestId, Resolution};
pub use model::*;
pub use poller::Poller;
pub use query::{FilterState, QueryBuilder, RequestDescriptor};
pub use resources::Resource;
pub use services::{parse_filters, PlacementService};
pub use session::{AuthState, SessionContext};
pub use view::{
    DisplayState, FetchCommand, PaginationState, SelectionMode, SelectionState, TabSpec, ViewStore,
};
