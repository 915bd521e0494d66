//! Client-side access checks against a user's effective permissions

use crate::config::CacheConfig;
use crate::Result;
use quillboard_api::acl::Permission;
use quillboard_api::ApiClient;
use quillboard_cache::MemoryCache;
use std::time::Duration;
use tracing::debug;

/// The permissions a user holds, with the checks the dashboard runs
/// before showing an action
///
/// A `manage`/`all` grant short-circuits everything.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    permissions: Vec<Permission>,
}

impl PermissionSet {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self { permissions }
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Holder of `manage`/`all` passes every check
    pub fn is_super_admin(&self) -> bool {
        self.permissions
            .iter()
            .any(|p| p.action == "manage" && p.subject == "all")
    }

    /// Can the user perform `action` on `subject`?
    pub fn can(&self, action: &str, subject: &str) -> bool {
        if self.is_super_admin() {
            return true;
        }
        self.permissions
            .iter()
            .any(|p| p.action == action && p.subject == subject)
    }

    /// True when at least one of the pairs is granted
    pub fn can_any(&self, checks: &[(&str, &str)]) -> bool {
        checks.iter().any(|(action, subject)| self.can(action, subject))
    }

    /// True only when every pair is granted
    pub fn can_all(&self, checks: &[(&str, &str)]) -> bool {
        checks.iter().all(|(action, subject)| self.can(action, subject))
    }
}

/// Effective-permission lookups with caching
///
/// Access checks run on every screen transition, so the aggregated
/// permissions are cached briefly and dropped whenever a role
/// assignment changes.
pub struct PermissionChecker {
    client: ApiClient,
    cache: MemoryCache,
    ttl: Duration,
}

impl PermissionChecker {
    pub fn new(client: ApiClient, config: &CacheConfig) -> Self {
        Self {
            client,
            cache: MemoryCache::new(),
            ttl: config.permissions_ttl(),
        }
    }

    /// The user's effective permissions, cache-first
    pub async fn for_user(&self, user_id: &str) -> Result<PermissionSet> {
        let key = format!("permissions_{}", user_id);

        if let Some(cached) = self.cache.get::<Vec<Permission>>(&key) {
            debug!("Cache hit for permissions of {}", user_id);
            return Ok(PermissionSet::new(cached));
        }

        let permissions = self.client.effective_permissions(user_id).await?;
        self.cache.insert(&key, &permissions, self.ttl)?;

        Ok(PermissionSet::new(permissions))
    }

    /// Drop the cached permissions after a role change
    pub fn invalidate(&self, user_id: &str) {
        self.cache.remove(&format!("permissions_{}", user_id));
    }

    /// Drop everything, e.g. on logout
    pub fn clear(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(action: &str, subject: &str) -> Permission {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "action": action,
            "subject": subject,
        }))
        .unwrap()
    }

    #[test]
    fn test_exact_match_checks() {
        let set = PermissionSet::new(vec![
            permission("read", "Story"),
            permission("update", "Story"),
        ]);

        assert!(set.can("read", "Story"));
        assert!(!set.can("delete", "Story"));
        assert!(!set.can("read", "User"));
    }

    #[test]
    fn test_super_admin_short_circuits() {
        let set = PermissionSet::new(vec![permission("manage", "all")]);

        assert!(set.is_super_admin());
        assert!(set.can("delete", "User"));
        assert!(set.can_all(&[("read", "Story"), ("update", "Settings")]));
    }

    #[test]
    fn test_any_and_all() {
        let set = PermissionSet::new(vec![permission("read", "Story")]);

        assert!(set.can_any(&[("read", "Story"), ("delete", "Story")]));
        assert!(!set.can_all(&[("read", "Story"), ("delete", "Story")]));
        assert!(!set.can_any(&[("delete", "Story"), ("delete", "User")]));
    }

    #[test]
    fn test_empty_set_denies_everything() {
        let set = PermissionSet::default();
        assert!(!set.can("read", "Story"));
        assert!(!set.is_super_admin());
    }

    #[tokio::test]
    async fn test_checker_caches_effective_permissions() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/users/u1/roles")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "success": true,
                    "data": {
                        "primaryRole": {
                            "id": 1, "name": "editor",
                            "permissions": [{ "id": 1, "action": "read", "subject": "Story" }]
                        }
                    }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let checker = PermissionChecker::new(ApiClient::new(server.url()), &CacheConfig::default());

        let first = checker.for_user("u1").await.unwrap();
        let second = checker.for_user("u1").await.unwrap();
        assert!(first.can("read", "Story"));
        assert!(second.can("read", "Story"));

        mock.assert_async().await;
    }
}
