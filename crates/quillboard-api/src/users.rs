//! User profile and administration endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::acl::RoleDto;
use crate::error::Result;
use crate::{ApiClient, Page};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Legacy single-role field, superseded by `role_info`
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub role_info: Option<RoleDto>,
    #[serde(default)]
    pub additional_roles: Option<Vec<RoleDto>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_role_id: Option<i64>,
}

/// Optional filters for the user list
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ApiClient {
    /// Profile of the authenticated user
    pub async fn profile(&self) -> Result<UserProfile> {
        let url = format!("{}/v1/users/me", self.base_url());
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    /// Update the authenticated user's own profile
    pub async fn update_profile(&self, draft: &UserDraft) -> Result<UserProfile> {
        let url = format!("{}/v1/users/me", self.base_url());
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    /// Set the authenticated user's profile image to an uploaded attachment
    pub async fn update_profile_image(&self, attachment_id: &str) -> Result<()> {
        let url = format!("{}/v1/users/me/profile-image", self.base_url());
        let response = self
            .dispatch(|| {
                self.http()
                    .put(&url)
                    .json(&serde_json::json!({ "attachmentId": attachment_id }))
            })
            .await?;

        self.handle_empty_response(response).await
    }

    /// List users (admin only)
    pub async fn list_users(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&UserFilters>,
    ) -> Result<Page<UserProfile>> {
        let url = format!("{}/v1/users", self.base_url());
        let response = self
            .dispatch(|| {
                let mut request = self
                    .http()
                    .get(&url)
                    .query(&[("page", page.to_string()), ("limit", limit.to_string())]);
                if let Some(filters) = filters {
                    request = request.query(filters);
                }
                request
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn get_user(&self, id: &str) -> Result<UserProfile> {
        let url = format!("{}/v1/users/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn update_user(&self, id: &str, draft: &UserDraft) -> Result<UserProfile> {
        let url = format!("{}/v1/users/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        let url = format!("{}/v1/users/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    /// Aggregate user counts, shape varies by deployment
    pub async fn user_stats(&self) -> Result<serde_json::Value> {
        let url = format!("{}/v1/users/stats", self.base_url());
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_profile_accepts_bare_payload() {
        let mut server = mockito::Server::new_async().await;
        // No envelope: some deployments return the profile directly
        server
            .mock("GET", "/v1/users/me")
            .with_status(200)
            .with_body(r#"{"id":"u1","email":"admin@example.com","name":"Admin"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let profile = client.profile().await.unwrap();

        assert_eq!(profile.id, "u1");
        assert_eq!(profile.email, "admin@example.com");
    }
}
