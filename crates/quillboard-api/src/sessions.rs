//! Session administration endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{ApiClient, Page};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub is_current: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiClient {
    /// Sessions belonging to the authenticated user
    pub async fn my_sessions(&self, page: u32, limit: u32) -> Result<Page<Session>> {
        let url = format!("{}/v1/sessions/me", self.base_url());
        let response = self
            .dispatch(|| {
                self.http()
                    .get(&url)
                    .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            })
            .await?;

        self.handle_response(response).await
    }

    /// Sessions for any user (admin only)
    pub async fn user_sessions(&self, user_id: &str) -> Result<Vec<Session>> {
        let url = format!("{}/v1/sessions/users/{}/", self.base_url(), user_id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn revoke_session(&self, session_id: &str) -> Result<()> {
        let url = format!("{}/v1/sessions/{}", self.base_url(), session_id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    /// Revoke every session except the current one
    pub async fn revoke_other_sessions(&self) -> Result<()> {
        let url = format!("{}/v1/sessions/revoke-others", self.base_url());
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_my_sessions_parse() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/sessions/me")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"success":true,"data":{"data":[{"id":"s1","ipAddress":"10.0.0.1","isCurrent":true}],"total":1}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let page = client.my_sessions(1, 10).await.unwrap();

        assert_eq!(page.data[0].id, "s1");
        assert_eq!(page.data[0].is_current, Some(true));
    }
}
