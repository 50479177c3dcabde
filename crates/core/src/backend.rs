//! The seam between view state and the remote placement API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;

use crate::actions::{Method, MutationRequest};
use crate::config::AppConfig;
use crate::envelope::{failure_message, ResponseEnvelope};
use crate::error::{ApiError, Result};
use crate::query::RequestDescriptor;
use crate::session::SessionContext;

const USER_AGENT_VALUE: &str = concat!("placement-admin/", env!("CARGO_PKG_VERSION"));

/// Anything that can answer reads and mutations with validated payloads.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get(&self, descriptor: &RequestDescriptor) -> Result<Value>;

    async fn send(&self, request: &MutationRequest) -> Result<Value>;
}

/// HTTP implementation injecting the session's bearer token.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    session: SessionContext,
}

impl HttpBackend {
    pub fn new(config: &AppConfig, session: SessionContext) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url().as_str().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    /// Send `builder` with the current token, returning the response and the token it carried.
    async fn dispatch(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<(reqwest::Response, Option<String>)> {
        let token = self.session.token();
        let builder = match &token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        Ok((builder.send().await?, token))
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
        sent_token: Option<String>,
    ) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("backend rejected the session token");
            self.session.expire(sent_token.as_deref());
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let message = failure_message(&body)
                .unwrap_or_else(|| "Request was rejected by the server".to_string());
            return Err(ApiError::Validation(message));
        }

        if !status.is_success() {
            let message = failure_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string()
            });
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        ResponseEnvelope::from_value(body)?.into_payload()
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get(&self, descriptor: &RequestDescriptor) -> Result<Value> {
        let url = self.url(descriptor.endpoint());
        tracing::debug!(url = %url, query = %descriptor.to_query_string(), "GET");

        let request = self.client.get(&url).query(descriptor.params());
        let (response, token) = self.dispatch(request).await?;
        self.handle_response(response, token).await
    }

    async fn send(&self, request: &MutationRequest) -> Result<Value> {
        let url = self.url(&request.endpoint);
        tracing::debug!(method = request.method.as_str(), url = %url, "sending mutation");

        let builder = match request.method {
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };
        let (response, token) = self.dispatch(builder).await?;
        self.handle_response(response, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Company, ListPage};
    use crate::session::AuthState;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, dir: &TempDir) -> AppConfig {
        AppConfig::from_parts(&format!("{}/api", server.uri()), dir.path().to_path_buf()).unwrap()
    }

    fn backend(server: &MockServer, session: SessionContext) -> (HttpBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = HttpBackend::new(&config(server, &dir), session).unwrap();
        (backend, dir)
    }

    #[tokio::test]
    async fn get_sends_params_and_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/audit-logs"))
            .and(query_param("action", "create"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "rows": [], "total": 0 }
            })))
            .mount(&server)
            .await;

        let session = SessionContext::in_memory();
        session.set_token("tok-1").unwrap();
        let (backend, _dir) = backend(&server, session);

        let descriptor = RequestDescriptor::new("/audit-logs").with_param("action", "create");
        let payload = backend.get(&descriptor).await.unwrap();
        assert_eq!(payload, json!({ "rows": [], "total": 0 }));
    }

    #[tokio::test]
    async fn unauthorized_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/companies"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let session = SessionContext::in_memory();
        session.set_token("expired").unwrap();
        let (backend, _dir) = backend(&server, session.clone());

        let err = backend
            .get(&RequestDescriptor::new("/companies"))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert_eq!(session.token(), None);
    }

    #[tokio::test]
    async fn late_rejection_of_an_old_token_keeps_the_new_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/companies"))
            .and(header("authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let session = SessionContext::in_memory();
        session.set_token("old").unwrap();
        let (backend, _dir) = backend(&server, session.clone());

        let descriptor = RequestDescriptor::new("/companies");
        let relogin = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.set_token("new").unwrap();
        };
        let (result, ()) = tokio::join!(backend.get(&descriptor), relogin);

        assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
        assert_eq!(session.token().as_deref(), Some("new"));
        assert_eq!(session.state(), AuthState::Authenticated);
    }

    #[tokio::test]
    async fn top_level_data_keeps_its_total() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/companies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "_id": "c1", "name": "Acme", "status": "active" }],
                "total": 42
            })))
            .mount(&server)
            .await;

        let (backend, _dir) = backend(&server, SessionContext::in_memory());
        let payload = backend.get(&RequestDescriptor::new("/companies")).await.unwrap();
        let page: ListPage<Company> = serde_json::from_value(payload).unwrap();

        assert_eq!(page.total, 42);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].name, "Acme");
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/drives"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": [] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = config(&server, &dir).with_request_timeout(Duration::from_millis(100));
        let backend = HttpBackend::new(&config, SessionContext::in_memory()).unwrap();

        let err = backend
            .get(&RequestDescriptor::new("/drives"))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Timeout);
        assert_eq!(
            err.user_message(),
            "The placement server took too long to respond."
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn failed_delete_carries_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/companies/c1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "message": "cannot delete"
            })))
            .mount(&server)
            .await;

        let (backend, _dir) = backend(&server, SessionContext::in_memory());
        let request = MutationRequest {
            method: Method::Delete,
            endpoint: "/companies/c1".into(),
            body: None,
        };
        let err = backend.send(&request).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                status: 409,
                message: "cannot delete".into()
            }
        );
        assert_eq!(err.user_message(), "cannot delete");
    }

    #[tokio::test]
    async fn validation_status_maps_to_validation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/students"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "error": "Email already registered"
            })))
            .mount(&server)
            .await;

        let (backend, _dir) = backend(&server, SessionContext::in_memory());
        let request = MutationRequest {
            method: Method::Post,
            endpoint: "students".into(),
            body: Some(json!({ "email": "a@b.c" })),
        };
        assert_eq!(
            backend.send(&request).await.unwrap_err(),
            ApiError::Validation("Email already registered".into())
        );
    }

    #[tokio::test]
    async fn empty_success_body_is_null_payload() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/drives/d1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let (backend, _dir) = backend(&server, SessionContext::in_memory());
        let request = MutationRequest {
            method: Method::Delete,
            endpoint: "/drives/d1".into(),
            body: None,
        };
        assert_eq!(backend.send(&request).await.unwrap(), Value::Null);
    }
}
