use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::actions::{Method, MutationRequest};
use crate::backend::{Backend, HttpBackend};
use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::driver::ViewDriver;
use crate::error::ApiError;
use crate::model::{AuditLogEntry, Company, DashboardStats, Drive, Entity, Student, UnreadCount};
use crate::poller::Poller;
use crate::query::{FilterState, RequestDescriptor};
use crate::resources::{Resource, LOGIN_ENDPOINT, UNREAD_COUNT_ENDPOINT};
use crate::session::SessionContext;
use crate::telemetry;
use crate::view::ViewStore;

/// Entry point wiring configuration, session and backend together.
#[derive(Clone)]
pub struct PlacementService {
    config: AppConfig,
    session: SessionContext,
    backend: Arc<dyn Backend>,
    telemetry: Arc<telemetry::Handle>,
}

impl PlacementService {
    pub fn new(config: AppConfig) -> Result<Self> {
        let session = SessionContext::load(config.session_path())?;
        let backend = HttpBackend::new(&config, session.clone())
            .context("Failed to initialise the HTTP backend")?;
        Ok(Self::with_backend(config, session, Arc::new(backend)))
    }

    pub fn with_backend(
        config: AppConfig,
        session: SessionContext,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            config,
            session,
            backend,
            telemetry: Arc::new(telemetry::Handle::new()),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn telemetry(&self) -> &telemetry::Handle {
        &self.telemetry
    }

    /// The unmounted default store for `resource`, ready to be preset before loading.
    pub fn list_store<T: Entity + Clone>(&self, resource: Resource) -> ViewStore<T> {
        resource.view_store(self.config.rows_per_page())
    }

    /// Drive `store` against this service's backend.
    pub fn drive<T>(&self, resource: Resource, store: ViewStore<T>) -> ViewDriver<T>
    where
        T: Entity + Clone + DeserializeOwned + Send + 'static,
    {
        ViewDriver::new(
            resource.title(),
            store,
            self.backend.clone(),
            self.telemetry.clone(),
        )
    }

    /// A list view over `resource`, decoded as `T`.
    pub fn list_view<T>(&self, resource: Resource) -> ViewDriver<T>
    where
        T: Entity + Clone + DeserializeOwned + Send + 'static,
    {
        self.drive(resource, self.list_store(resource))
    }

    pub fn companies(&self) -> ViewDriver<Company> {
        self.list_view(Resource::Companies)
    }

    pub fn students(&self) -> ViewDriver<Student> {
        self.list_view(Resource::Students)
    }

    pub fn drives(&self) -> ViewDriver<Drive> {
        self.list_view(Resource::Drives)
    }

    pub fn audit_logs(&self) -> ViewDriver<AuditLogEntry> {
        self.list_view(Resource::AuditLogs)
    }

    pub async fn fetch_entity<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: &str,
    ) -> Result<T, ApiError> {
        let endpoint = format!("{}/{}", resource.endpoint(), id);
        let payload = self.backend.get(&RequestDescriptor::new(endpoint)).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Load statistics for the dashboard's current filters.
    pub async fn load_dashboard(&self, dashboard: &mut Dashboard) {
        let command = dashboard.load();
        let result = self.dashboard_stats(&command.descriptor).await;
        dashboard.apply(command.id, result);
    }

    pub async fn dashboard_stats(
        &self,
        descriptor: &RequestDescriptor,
    ) -> Result<DashboardStats, ApiError> {
        let payload = self.backend.get(descriptor).await?;
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn unread_count(&self) -> Result<u64, ApiError> {
        fetch_unread(self.backend.as_ref()).await
    }

    /// Poll the unread count on the configured interval. The latest known value
    /// is published on the returned receiver; polling ends with the [`Poller`].
    pub fn watch_unread(&self) -> (Poller, watch::Receiver<Option<u64>>) {
        let (sender, receiver) = watch::channel(None);
        let backend = self.backend.clone();
        let poller = Poller::start(self.config.poll_interval(), move || {
            let backend = backend.clone();
            let sender = sender.clone();
            async move {
                match fetch_unread(backend.as_ref()).await {
                    Ok(count) => {
                        sender.send_replace(Some(count));
                    }
                    Err(err) => tracing::warn!(
                        error = %err,
                        retryable = err.is_retryable(),
                        "failed to refresh unread count"
                    ),
                }
            }
        });
        (poller, receiver)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let request = MutationRequest {
            method: Method::Post,
            endpoint: LOGIN_ENDPOINT.to_string(),
            body: Some(json!({ "email": email, "password": password })),
        };
        let payload = self
            .backend
            .send(&request)
            .await
            .map_err(|err| anyhow!(err.user_message()))?;
        let token = extract_token(&payload)
            .ok_or_else(|| anyhow!("Login response did not include a token"))?;
        self.session.set_token(token)?;
        tracing::info!(email, "signed in");
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.session.clear()
    }
}

async fn fetch_unread(backend: &dyn Backend) -> Result<u64, ApiError> {
    let payload = backend
        .get(&RequestDescriptor::new(UNREAD_COUNT_ENDPOINT))
        .await?;
    if let Some(count) = payload.as_u64() {
        return Ok(count);
    }
    let unread: UnreadCount = serde_json::from_value(payload)?;
    Ok(unread.count)
}

fn extract_token(payload: &Value) -> Option<String> {
    ["token", "accessToken"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Parse `key=value` pairs as given on the command line.
pub fn parse_filters<I, S>(pairs: I) -> Result<FilterState>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut filters = FilterState::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Invalid filter '{pair}': expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("Invalid filter '{pair}': key is empty"));
        }
        filters.set(key, value.trim());
    }
    Ok(filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthState;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn service(server: &MockServer, dir: &TempDir) -> PlacementService {
        let base = format!("{}/api", server.uri());
        let config = AppConfig::from_parts(&base, dir.path().to_path_buf())
            .unwrap()
            .with_poll_interval(Duration::from_millis(50));
        PlacementService::new(config).unwrap()
    }

    #[tokio::test]
    async fn login_persists_token_and_logout_clears_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(json!({ "email": "tpo@college.edu", "password": "secret" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "token": "jwt-1" }
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let service = service(&server, &dir);
        service.login("tpo@college.edu", "secret").await.unwrap();
        assert_eq!(service.session().state(), AuthState::Authenticated);

        let reloaded = SessionContext::load(service.config().session_path()).unwrap();
        assert_eq!(reloaded.token().as_deref(), Some("jwt-1"));

        service.logout().unwrap();
        assert_eq!(service.session().token(), None);
    }

    #[tokio::test]
    async fn rejected_login_reports_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "message": "Invalid credentials"
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = service(&server, &dir)
            .login("tpo@college.edu", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
    }

    #[tokio::test]
    async fn unread_count_accepts_number_or_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/unread-count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "unreadCount": 4 }
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/unread-count"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": 2 })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let service = service(&server, &dir);
        assert_eq!(service.unread_count().await.unwrap(), 4);
        assert_eq!(service.unread_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn watch_unread_publishes_latest_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/unread-count"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "count": 7 } })),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let service = service(&server, &dir);
        let (poller, mut receiver) = service.watch_unread();

        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), Some(7));
        poller.shutdown().await;
    }

    #[tokio::test]
    async fn dashboard_sends_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/dashboard/stats"))
            .and(query_param("department", "CSE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "totalStudents": 120, "placedStudents": 90 }
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let service = service(&server, &dir);
        let mut dashboard = Dashboard::new();
        dashboard.set_filter("department", "CSE");
        service.load_dashboard(&mut dashboard).await;

        let stats = dashboard.state().data.clone().unwrap();
        assert_eq!(stats.total_students, 120);
        assert_eq!(stats.placement_rate(), Some(75.0));
    }

    #[test]
    fn filter_pairs_are_parsed_in_order() {
        let filters = parse_filters(["status=active", "search = acme "]).unwrap();
        assert_eq!(
            filters.iter().collect::<Vec<_>>(),
            vec![("status", "active"), ("search", "acme")]
        );
        assert!(parse_filters(["broken"]).is_err());
        assert!(parse_filters(["=x"]).is_err());
    }
}
