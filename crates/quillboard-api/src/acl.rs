//! Role, permission and user-role-assignment endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::ApiClient;

/// A single action/subject grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: i64,
    pub action: String,
    pub subject: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Join row between a role and one of its permissions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RolePermission {
    #[serde(default)]
    pub id: Option<i64>,
    pub permission: Permission,
}

/// Role as the API returns it; permissions arrive nested in join rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDto {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub role_permissions: Option<Vec<RolePermission>>,
}

impl RoleDto {
    /// Flatten the nested join rows into plain permissions
    pub fn permissions(&self) -> Vec<Permission> {
        self.role_permissions
            .as_ref()
            .map(|rows| rows.iter().map(|row| row.permission.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A role as attached to a user, active flag included
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRole {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRolesResponse {
    pub primary_role: UserRole,
    #[serde(default)]
    pub additional_roles: Option<Vec<UserRole>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionIds<'a> {
    permission_ids: &'a [i64],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignment {
    role_id: i64,
}

impl ApiClient {
    // =========================================================================
    // Roles
    // =========================================================================

    pub async fn list_roles(&self, include_permissions: bool) -> Result<Vec<RoleDto>> {
        let url = format!("{}/v1/roles", self.base_url());
        let response = self
            .dispatch(|| {
                self.http()
                    .get(&url)
                    .query(&[("includePermissions", include_permissions.to_string())])
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn get_role(&self, id: i64) -> Result<RoleDto> {
        let url = format!("{}/v1/roles/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_role(&self, draft: &RoleDraft) -> Result<RoleDto> {
        let url = format!("{}/v1/roles", self.base_url());
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_role(&self, id: i64, draft: &RoleDraft) -> Result<RoleDto> {
        let url = format!("{}/v1/roles/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().put(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn delete_role(&self, id: i64) -> Result<()> {
        let url = format!("{}/v1/roles/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    pub async fn role_permissions(&self, id: i64) -> Result<Vec<Permission>> {
        let url = format!("{}/v1/roles/{}/permissions", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn assign_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> Result<()> {
        let url = format!("{}/v1/roles/{}/permissions", self.base_url(), role_id);
        let response = self
            .dispatch(|| self.http().post(&url).json(&PermissionIds { permission_ids }))
            .await?;

        self.handle_empty_response(response).await
    }

    pub async fn remove_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> Result<()> {
        let url = format!("{}/v1/roles/{}/permissions", self.base_url(), role_id);
        let response = self
            .dispatch(|| self.http().delete(&url).json(&PermissionIds { permission_ids }))
            .await?;

        self.handle_empty_response(response).await
    }

    // =========================================================================
    // Permissions
    // =========================================================================

    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        let url = format!("{}/v1/permissions", self.base_url());
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn get_permission(&self, id: i64) -> Result<Permission> {
        let url = format!("{}/v1/permissions/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_permission(&self, draft: &PermissionDraft) -> Result<Permission> {
        let url = format!("{}/v1/permissions", self.base_url());
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_permission(&self, id: i64, draft: &PermissionDraft) -> Result<Permission> {
        let url = format!("{}/v1/permissions/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().put(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn delete_permission(&self, id: i64) -> Result<()> {
        let url = format!("{}/v1/permissions/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    // =========================================================================
    // User role assignment
    // =========================================================================

    pub async fn user_roles(&self, user_id: &str) -> Result<UserRolesResponse> {
        let url = format!("{}/v1/users/{}/roles", self.base_url(), user_id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn assign_user_role(&self, user_id: &str, role_id: i64) -> Result<()> {
        let url = format!("{}/v1/users/{}/roles", self.base_url(), user_id);
        let response = self
            .dispatch(|| self.http().post(&url).json(&RoleAssignment { role_id }))
            .await?;

        self.handle_empty_response(response).await
    }

    pub async fn remove_user_role(&self, user_id: &str, role_id: i64) -> Result<()> {
        let url = format!("{}/v1/users/{}/roles/{}", self.base_url(), user_id, role_id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    pub async fn activate_user_role(&self, user_id: &str, role_id: i64) -> Result<()> {
        let url = format!(
            "{}/v1/users/{}/roles/{}/activate",
            self.base_url(),
            user_id,
            role_id
        );
        let response = self
            .dispatch(|| self.http().post(&url).json(&serde_json::json!({})))
            .await?;

        self.handle_empty_response(response).await
    }

    pub async fn deactivate_user_role(&self, user_id: &str, role_id: i64) -> Result<()> {
        let url = format!(
            "{}/v1/users/{}/roles/{}/deactivate",
            self.base_url(),
            user_id,
            role_id
        );
        let response = self
            .dispatch(|| self.http().post(&url).json(&serde_json::json!({})))
            .await?;

        self.handle_empty_response(response).await
    }

    /// Change which role is the user's primary one
    pub async fn set_user_primary_role(&self, user_id: &str, role_id: i64) -> Result<()> {
        let url = format!("{}/v1/users/{}", self.base_url(), user_id);
        let response = self
            .dispatch(|| {
                self.http()
                    .patch(&url)
                    .json(&serde_json::json!({ "primaryRoleId": role_id }))
            })
            .await?;

        self.handle_empty_response(response).await
    }

    /// Every permission the user currently holds
    ///
    /// Aggregated client-side from the primary role plus any *active*
    /// additional roles, matching how the dashboard evaluates access.
    pub async fn effective_permissions(&self, user_id: &str) -> Result<Vec<Permission>> {
        let roles = self.user_roles(user_id).await?;

        let mut permissions = Vec::new();
        if let Some(primary) = roles.primary_role.permissions {
            permissions.extend(primary);
        }
        if let Some(additional) = roles.additional_roles {
            for role in additional {
                if role.is_active.unwrap_or(false) {
                    if let Some(role_permissions) = role.permissions {
                        permissions.extend(role_permissions);
                    }
                }
            }
        }

        debug!(
            "Aggregated {} effective permissions for user {}",
            permissions.len(),
            user_id
        );
        Ok(permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(id: i64, action: &str, subject: &str) -> serde_json::Value {
        serde_json::json!({ "id": id, "action": action, "subject": subject })
    }

    #[tokio::test]
    async fn test_effective_permissions_skip_inactive_roles() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/users/u1/roles")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "success": true,
                    "data": {
                        "primaryRole": {
                            "id": 1, "name": "editor",
                            "permissions": [permission(1, "update", "Story")]
                        },
                        "additionalRoles": [
                            {
                                "id": 2, "name": "moderator", "isActive": true,
                                "permissions": [permission(2, "moderate", "Story")]
                            },
                            {
                                "id": 3, "name": "admin", "isActive": false,
                                "permissions": [permission(3, "manage", "all")]
                            }
                        ]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let permissions = client.effective_permissions("u1").await.unwrap();

        let actions: Vec<_> = permissions.iter().map(|p| p.action.as_str()).collect();
        assert_eq!(actions, vec!["update", "moderate"]);
    }

    #[test]
    fn test_role_dto_flattens_join_rows() {
        let role: RoleDto = serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "editor",
            "isSystem": false,
            "isActive": true,
            "priority": 70,
            "rolePermissions": [
                { "id": 10, "permission": permission(1, "read", "Story") },
                { "id": 11, "permission": permission(2, "update", "Story") }
            ]
        }))
        .unwrap();

        let permissions = role.permissions();
        assert_eq!(permissions.len(), 2);
        assert_eq!(permissions[1].action, "update");
    }
}
