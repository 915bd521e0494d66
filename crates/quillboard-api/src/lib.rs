//! Typed HTTP client for the Quillboard admin REST API
//!
//! One [`ApiClient`] serves every resource group: stories, versions,
//! taxonomy, attachments, users, roles and permissions, sessions, dynamic
//! post types and their content. All authenticated traffic flows through a
//! shared pipeline that attaches the bearer token, tracks in-flight
//! requests, and transparently performs a single-flight token refresh when
//! the API answers 401.
//!
//! # Example
//!
//! ```no_run
//! use quillboard_api::ApiClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ApiClient::new("http://localhost:4040/api");
//!     client.login("admin@example.com", "hunter2").await?;
//!
//!     let page = client.list_stories(1, 10, None).await?;
//!     for story in page.data {
//!         println!("{}", story.title);
//!     }
//!     Ok(())
//! }
//! ```

pub mod acl;
pub mod activity;
pub mod attachments;
pub mod auth;
pub mod content;
pub mod error;
pub mod post_types;
pub mod sessions;
pub mod stories;
pub mod system;
pub mod taxonomy;
pub mod users;
pub mod versions;

pub use acl::{Permission, RoleDto, UserRole, UserRolesResponse};
pub use activity::{RequestGauge, RequestGuard};
pub use attachments::Attachment;
pub use auth::{AuthState, CredentialStore, LoginSession, MemoryCredentials, StoredCredentials};
pub use content::{ContentStatus, PostContent};
pub use error::{ApiError, Result};
pub use post_types::{FieldDefinition, FieldType, PostType};
pub use sessions::Session;
pub use stories::Story;
pub use taxonomy::{Category, Tag};
pub use users::UserProfile;
pub use versions::{StoryVersion, VersionComparison};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "http://localhost:4040/api";

/// Paginated list payload, `{ data: [...], total }`
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

// Success payloads arrive as { success, data } envelopes; some endpoints
// return the payload bare. Error payloads carry the message either at the
// top level or nested under `error`.
#[derive(Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    success: Option<bool>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<ErrorDetail>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Pull the human-readable message out of an error response body
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.error.and_then(|e| e.message) {
            return message;
        }
        if let Some(message) = parsed.message {
            return message;
        }
    }
    if body.is_empty() {
        "Unknown error".to_string()
    } else {
        body.to_string()
    }
}

/// HTTP client for the Quillboard admin API
///
/// Cheap to clone; every clone shares the auth state, the in-flight gauge
/// and the credential store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<AuthState>,
    gauge: Arc<RequestGauge>,
    credentials: Arc<dyn CredentialStore>,
    on_session_expired: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl ApiClient {
    /// Create a client with in-memory credentials
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_credentials(base_url, Arc::new(MemoryCredentials::new()))
    }

    /// Create a client against the default local API
    pub fn local() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }

    /// Create a client with an injected credential store
    ///
    /// Tokens found in the store seed the auth state, so a persisted
    /// session survives process restarts.
    pub fn with_credentials(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self::with_options(base_url, credentials, None)
    }

    /// Create a client with a credential store and an overall request timeout
    pub fn with_options(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
        timeout: Option<std::time::Duration>,
    ) -> Self {
        let base_url = base_url.into();
        let stored = credentials.load();

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("Quillboard/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth: Arc::new(AuthState::new(stored.access_token, stored.refresh_token)),
            gauge: Arc::new(RequestGauge::new()),
            credentials,
            on_session_expired: None,
        }
    }

    /// Register a hook fired when a refresh fails and the session dies
    ///
    /// Hosts use this to drop to their login entry point.
    pub fn on_session_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared auth state (tokens + refresh coordination)
    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// In-flight request gauge, for loading indicators
    pub fn gauge(&self) -> &Arc<RequestGauge> {
        &self.gauge
    }

    /// True when any token is held
    pub fn is_authenticated(&self) -> bool {
        self.auth.access_token().is_some()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    pub(crate) fn notify_session_expired(&self) {
        if let Some(hook) = &self.on_session_expired {
            hook();
        }
    }

    // =========================================================================
    // Request pipeline
    // =========================================================================

    /// Send an authenticated request with 401-triggered refresh-and-replay
    ///
    /// `build` is invoked once per attempt so a replay gets a fresh request
    /// (and a fresh body, which matters for multipart uploads).
    pub(crate) async fn dispatch<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        self.dispatch_inner(build, true).await
    }

    /// Send a request that must never enter the refresh flow on 401
    ///
    /// Used for login (a 401 there means bad credentials) and logout.
    pub(crate) async fn dispatch_no_refresh<F>(&self, build: F) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        self.dispatch_inner(build, false).await
    }

    async fn dispatch_inner<F>(&self, build: F, allow_refresh: bool) -> Result<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        // Held across the whole attempt sequence; dropping it on any exit
        // path keeps the gauge balanced.
        let _guard = self.gauge.start();
        let mut retried = false;

        loop {
            let mut request = build();
            if let Some(token) = self.auth.access_token() {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;

            if response.status() == StatusCode::UNAUTHORIZED && allow_refresh && !retried {
                // One replay per request, enforced here; a second 401 falls
                // through to the caller.
                retried = true;
                debug!("Got 401, entering refresh flow");
                self.refresh_access_token().await?;
                continue;
            }

            return Ok(response);
        }
    }

    // =========================================================================
    // Response handling
    // =========================================================================

    /// Check the status and unwrap the `{ success, data }` envelope
    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::api(status, extract_error_message(&body)));
        }

        if let Ok(envelope) = serde_json::from_str::<Envelope<T>>(&body) {
            if let Some(data) = envelope.data {
                return Ok(data);
            }
        }

        // Some endpoints skip the envelope and return the payload directly
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("Unexpected response body: {}", e)))
    }

    /// Check the status for operations with no meaningful body (deletes etc.)
    pub(crate) async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::api(status, extract_error_message(&body)));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}


#[cfg(test)]
mod pipeline_tests {
    //! End-to-end pipeline behavior against a fake API server

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn envelope(body: &str) -> String {
        format!(r#"{{"success":true,"data":{}}}"#, body)
    }

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        let store = Arc::new(MemoryCredentials::with_tokens(
            Some("stale".into()),
            Some("refresh-token".into()),
        ));
        ApiClient::with_credentials(server.url(), store)
    }

    #[tokio::test]
    async fn test_concurrent_401s_issue_exactly_one_refresh() {
        let mut server = mockito::Server::new_async().await;

        let stale = server
            .mock("GET", "/v1/tags")
            .match_header("authorization", "Bearer stale")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"Token expired"}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let fresh = server
            .mock("GET", "/v1/tags")
            .match_header("authorization", "Bearer fresh")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(envelope(r#"{"data":[],"total":0}"#))
            .expect(2)
            .create_async()
            .await;

        let refresh = server
            .mock("POST", "/v1/auth/refresh")
            .with_status(200)
            .with_body(envelope(r#"{"accessToken":"fresh"}"#))
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let (a, b) = tokio::join!(client.list_tags(1, 100), client.list_tags(1, 100));

        assert!(a.is_ok(), "first request failed: {:?}", a.err());
        assert!(b.is_ok(), "second request failed: {:?}", b.err());
        assert_eq!(client.auth().access_token(), Some("fresh".to_string()));

        stale.assert_async().await;
        fresh.assert_async().await;
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_persists_new_access_token() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/v1/tags")
            .match_header("authorization", "Bearer stale")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;
        server
            .mock("GET", "/v1/tags")
            .match_header("authorization", "Bearer fresh")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(envelope(r#"{"data":[],"total":0}"#))
            .create_async()
            .await;
        server
            .mock("POST", "/v1/auth/refresh")
            .with_status(200)
            // bare shape, no envelope
            .with_body(r#"{"accessToken":"fresh"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentials::with_tokens(
            Some("stale".into()),
            Some("refresh-token".into()),
        ));
        let client = ApiClient::with_credentials(server.url(), Arc::clone(&store) as Arc<dyn CredentialStore>);

        client.list_tags(1, 100).await.unwrap();

        // The replayed token must also have been written through the store
        let persisted = store.load();
        assert_eq!(persisted.access_token, Some("fresh".to_string()));
        assert_eq!(persisted.refresh_token, Some("refresh-token".to_string()));
    }

    #[tokio::test]
    async fn test_failed_refresh_rejects_all_and_clears_credentials() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/v1/tags")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/v1/auth/refresh")
            .with_status(401)
            .with_body(r#"{"message":"Refresh token revoked"}"#)
            .expect(1)
            .create_async()
            .await;

        let expired = Arc::new(AtomicUsize::new(0));
        let expired_hook = Arc::clone(&expired);

        let store = Arc::new(MemoryCredentials::with_tokens(
            Some("stale".into()),
            Some("refresh-token".into()),
        ));
        let client = ApiClient::with_credentials(
            server.url(),
            Arc::clone(&store) as Arc<dyn CredentialStore>,
        )
        .on_session_expired(move || {
            expired_hook.fetch_add(1, Ordering::SeqCst);
        });

        let (a, b) = tokio::join!(client.list_tags(1, 100), client.list_tags(1, 100));
        assert!(a.is_err());
        assert!(b.is_err());

        // Both tokens gone, in state and in the store
        assert_eq!(client.auth().access_token(), None);
        assert_eq!(client.auth().refresh_token(), None);
        assert!(store.load().access_token.is_none());
        assert!(store.load().refresh_token.is_none());
        assert_eq!(expired.load(Ordering::SeqCst), 1);

        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_refresh_token_is_treated_as_refresh_failure() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/v1/tags")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/v1/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let store = Arc::new(MemoryCredentials::with_tokens(Some("stale".into()), None));
        let client = ApiClient::with_credentials(server.url(), store);

        let result = client.list_tags(1, 100).await;
        assert!(matches!(result, Err(ApiError::SessionExpired(_))));
        assert_eq!(client.auth().access_token(), None);

        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_401_never_triggers_refresh() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("POST", "/v1/auth/login")
            .with_status(401)
            .with_body(r#"{"success":false,"error":{"message":"Invalid credentials"}}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/v1/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.login("admin@example.com", "wrong").await;

        match result {
            Err(ApiError::Api { status: 401, message }) => {
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("expected 401 api error, got {:?}", other),
        }

        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_second_401_after_replay_is_not_retried_again() {
        let mut server = mockito::Server::new_async().await;

        // Endpoint keeps rejecting even with the fresh token
        let tags = server
            .mock("GET", "/v1/tags")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body(r#"{"message":"Still no"}"#)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/v1/auth/refresh")
            .with_status(200)
            .with_body(r#"{"accessToken":"fresh"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.list_tags(1, 100).await;

        match result {
            Err(ApiError::Api { status: 401, .. }) => {}
            other => panic!("expected second 401 to pass through, got {:?}", other),
        }

        tags.assert_async().await;
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_401_errors_pass_through_untouched() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/v1/tags")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body(r#"{"message":"Database is on fire"}"#)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/v1/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.list_tags(1, 100).await;

        match result {
            Err(ApiError::Api { status: 500, message }) => {
                assert_eq!(message, "Database is on fire");
            }
            other => panic!("expected 500 passthrough, got {:?}", other),
        }

        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn test_configured_timeout_aborts_stalled_requests() {
        // Accepts the connection but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = ApiClient::with_options(
            format!("http://{}", addr),
            Arc::new(MemoryCredentials::new()),
            Some(std::time::Duration::from_millis(100)),
        );

        match client.health().await {
            Err(ApiError::Network(e)) => assert!(e.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_gauge_returns_to_zero_after_mixed_outcomes() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/v1/tags")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(envelope(r#"{"data":[],"total":0}"#))
            .create_async()
            .await;
        server
            .mock("GET", "/v1/categories")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server);

        let ok = client.list_tags(1, 100).await;
        let err = client.list_categories(1, 100, false).await;
        assert!(ok.is_ok());
        assert!(err.is_err());

        assert_eq!(client.gauge().in_flight(), 0);
        assert!(!client.gauge().is_busy());
    }
}
