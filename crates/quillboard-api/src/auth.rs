//! Authentication state and the single-flight token refresh flow
//!
//! Every authenticated request goes through [`crate::ApiClient::dispatch`],
//! which attaches the bearer token and, on a 401, funnels into
//! [`crate::ApiClient::refresh_access_token`]. Only one refresh runs at a
//! time: concurrent 401s park a continuation on [`AuthState`] and resume
//! when the in-flight refresh settles.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{ApiError, Result};
use crate::users::UserProfile;
use crate::ApiClient;

/// How a refresh settled: the new access token, or the failure message
/// propagated to every parked continuation.
pub type RefreshOutcome = std::result::Result<String, String>;

/// Snapshot of persisted credentials
#[derive(Debug, Clone, Default)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Persistence seam for the two credential strings
///
/// The client calls into this whenever tokens change: after login, after a
/// successful refresh (access token only), and on logout or refresh failure
/// (clear). Implementations are expected to be lenient; persistence errors
/// should be logged, not surfaced.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> StoredCredentials;
    fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>);
    fn store_access_token(&self, access_token: &str);
    fn clear(&self);
}

/// In-memory credential store, the default when nothing is injected
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    inner: Mutex<StoredCredentials>,
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            inner: Mutex::new(StoredCredentials {
                access_token,
                refresh_token,
            }),
        }
    }
}

impl CredentialStore for MemoryCredentials {
    fn load(&self) -> StoredCredentials {
        self.inner.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.access_token = Some(access_token.to_string());
            if let Some(refresh) = refresh_token {
                inner.refresh_token = Some(refresh.to_string());
            }
        }
    }

    fn store_access_token(&self, access_token: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.access_token = Some(access_token.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            *inner = StoredCredentials::default();
        }
    }
}

struct AuthInner {
    access_token: Option<String>,
    refresh_token: Option<String>,
    refreshing: bool,
    // Continuations of requests that hit a 401 while a refresh was in
    // flight, drained in insertion order when it settles.
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Owned, injectable auth state: current tokens plus the refresh
/// coordination flag and its continuation queue
pub struct AuthState {
    inner: Mutex<AuthInner>,
}

impl AuthState {
    pub fn new(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            inner: Mutex::new(AuthInner {
                access_token,
                refresh_token,
                refreshing: false,
                waiters: Vec::new(),
            }),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|i| i.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.lock().ok().and_then(|i| i.refresh_token.clone())
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.lock().map(|i| i.refreshing).unwrap_or(false)
    }

    pub fn waiter_count(&self) -> usize {
        self.inner.lock().map(|i| i.waiters.len()).unwrap_or(0)
    }

    pub fn set_tokens(&self, access_token: Option<String>, refresh_token: Option<String>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.access_token = access_token;
            inner.refresh_token = refresh_token;
        }
    }

    /// Join an in-flight refresh, or become its leader
    ///
    /// Returns `None` when the caller won the flag and must perform the
    /// refresh itself, otherwise a receiver resolving when the refresh
    /// settles. The check and the flag set happen inside one lock
    /// acquisition, so exactly one caller can lead.
    pub fn join_refresh(&self) -> Option<oneshot::Receiver<RefreshOutcome>> {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            // A poisoned lock means a panic mid-refresh; treat it as no
            // refresh running rather than deadlocking every caller.
            Err(poisoned) => poisoned.into_inner(),
        };

        if inner.refreshing {
            let (tx, rx) = oneshot::channel();
            inner.waiters.push(tx);
            Some(rx)
        } else {
            inner.refreshing = true;
            None
        }
    }

    /// Settle the in-flight refresh and drain the continuation queue
    ///
    /// On success the new access token is stored and every waiter resumes
    /// with it; on failure both tokens are dropped and every waiter gets
    /// the error. Waiters are resumed in the order they were enqueued.
    /// Returns the number of continuations drained.
    pub fn settle_refresh(&self, outcome: RefreshOutcome) -> usize {
        let waiters = {
            let mut inner = match self.inner.lock() {
                Ok(inner) => inner,
                Err(poisoned) => poisoned.into_inner(),
            };
            match &outcome {
                Ok(token) => inner.access_token = Some(token.clone()),
                Err(_) => {
                    inner.access_token = None;
                    inner.refresh_token = None;
                }
            }
            inner.refreshing = false;
            std::mem::take(&mut inner.waiters)
        };

        let drained = waiters.len();
        for waiter in waiters {
            // A dropped receiver just means that caller went away
            let _ = waiter.send(outcome.clone());
        }
        drained
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest {
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
    confirm_password: &'a str,
    invalidate_all_sessions: bool,
}

// Refresh responses come back as { data: { accessToken } } or a bare
// { accessToken }, depending on the endpoint version.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    data: Option<RefreshPayload>,
    access_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshPayload {
    access_token: Option<String>,
}

impl RefreshResponse {
    fn into_access_token(self) -> Option<String> {
        self.data
            .and_then(|payload| payload.access_token)
            .or(self.access_token)
    }
}

/// Tokens and user returned by a successful login
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl ApiClient {
    /// Authenticate and persist the returned token pair
    ///
    /// A 401 here means bad credentials, never a refresh trigger.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession> {
        let url = format!("{}/v1/auth/login", self.base_url());
        let response = self
            .dispatch_no_refresh(|| {
                self.http()
                    .post(&url)
                    .json(&LoginRequest { email, password })
            })
            .await?;

        let session: LoginSession = self.handle_response(response).await?;

        self.auth()
            .set_tokens(Some(session.access_token.clone()), session.refresh_token.clone());
        self.credentials()
            .store_tokens(&session.access_token, session.refresh_token.as_deref());

        debug!("Logged in as {}", email);
        Ok(session)
    }

    /// Revoke the session server-side and clear local credentials
    ///
    /// The server call is best effort; local state is cleared even when
    /// the revocation request fails.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh_token) = self.auth().refresh_token() {
            let url = format!("{}/v1/auth/logout", self.base_url());
            let result = self
                .dispatch_no_refresh(|| {
                    self.http().post(&url).json(&LogoutRequest {
                        refresh_token: refresh_token.clone(),
                    })
                })
                .await;

            if let Err(e) = result {
                warn!("Server-side logout failed: {}", e);
            }
        }

        self.auth().set_tokens(None, None);
        self.credentials().clear();
        Ok(())
    }

    /// Change the current user's password
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
        invalidate_all_sessions: bool,
    ) -> Result<()> {
        let url = format!("{}/v1/auth/change-password", self.base_url());
        let response = self
            .dispatch(|| {
                self.http().post(&url).json(&ChangePasswordRequest {
                    current_password,
                    new_password,
                    confirm_password,
                    invalidate_all_sessions,
                })
            })
            .await?;

        self.handle_empty_response(response).await
    }

    /// Exchange the stored refresh token for a new access token, single-flight
    ///
    /// If a refresh is already running this suspends until it settles and
    /// reuses its outcome. The leader performs the exchange on a bare,
    /// non-intercepted request, persists the new token on success, and on
    /// failure clears all credentials and fires the session-expired hook.
    pub(crate) async fn refresh_access_token(&self) -> Result<String> {
        if let Some(receiver) = self.auth().join_refresh() {
            debug!("Refresh already in flight, queueing request for replay");
            return match receiver.await {
                Ok(Ok(token)) => Ok(token),
                Ok(Err(message)) => Err(ApiError::SessionExpired(message)),
                Err(_) => Err(ApiError::SessionExpired(
                    "token refresh was abandoned".to_string(),
                )),
            };
        }

        debug!("Starting token refresh");
        match self.perform_refresh().await {
            Ok(token) => {
                self.credentials().store_access_token(&token);
                let drained = self.auth().settle_refresh(Ok(token.clone()));
                if drained > 0 {
                    debug!("Refresh succeeded, resuming {} queued requests", drained);
                }
                Ok(token)
            }
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                let message = e.to_string();
                self.credentials().clear();
                self.auth().settle_refresh(Err(message.clone()));
                self.notify_session_expired();
                Err(ApiError::SessionExpired(message))
            }
        }
    }

    /// The actual refresh exchange
    ///
    /// Goes straight through the reqwest client: routing it through
    /// `dispatch` would re-enter the 401 handling on its own failure.
    /// A missing refresh token is the same as a failed refresh.
    async fn perform_refresh(&self) -> Result<String> {
        let refresh_token = self.auth().refresh_token().ok_or(ApiError::AuthRequired)?;

        let url = format!("{}/v1/auth/refresh", self.base_url());
        let response = self
            .http()
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::api(status, crate::extract_error_message(&body)));
        }

        let parsed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Bad refresh response: {}", e)))?;

        parsed
            .into_access_token()
            .ok_or_else(|| ApiError::Parse("No access token in refresh response".to_string()))
    }
}
