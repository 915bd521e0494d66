use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can come out of the admin API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API returned a non-success status code
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response payload
        message: String,
    },

    /// No refresh token is available for the refresh flow
    #[error("Authentication required")]
    AuthRequired,

    /// The token refresh failed; local credentials have been cleared
    #[error("Session expired: {0}")]
    SessionExpired(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    pub(crate) fn api(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        Self::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" response
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }

    /// Check if this error is an authentication failure
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
            || matches!(self, Self::AuthRequired | Self::SessionExpired(_))
    }

    /// Check if this error is a server-side failure (5xx)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status >= 500)
    }
}
