//! UI-facing models derived from raw API payloads

use quillboard_api::acl::{Permission, RoleDto};
use serde::{Deserialize, Serialize};

/// Role shaped for display: readable name and a coarse level bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    /// "content-editor" rendered as "Content Editor"
    pub display_name: String,
    /// Priority collapsed into buckets of ten. Priorities below ten (and
    /// roles with no priority) land in bucket 1, never 0, so every role
    /// passes a `meets_level(1)` gate.
    pub level: u32,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_active: bool,
    pub permissions: Vec<Permission>,
}

impl From<RoleDto> for Role {
    fn from(dto: RoleDto) -> Self {
        let display_name = title_case(&dto.name);
        let level = dto.priority.map(|p| (p / 10).max(1)).unwrap_or(1);
        let permissions = dto.permissions();

        Self {
            id: dto.id,
            name: dto.name,
            display_name,
            level,
            description: dto.description,
            is_system: dto.is_system,
            is_active: dto.is_active,
            permissions,
        }
    }
}

impl Role {
    /// Level gate used for hierarchy-sensitive screens
    pub fn meets_level(&self, min_level: u32) -> bool {
        self.level >= min_level
    }
}

/// "content-editor" / "content_editor" -> "Content Editor"
fn title_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dto(name: &str, priority: Option<u32>) -> RoleDto {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": name,
            "priority": priority,
            "isSystem": false,
            "isActive": true,
        }))
        .unwrap()
    }

    #[test]
    fn test_display_name_title_cases_separators() {
        assert_eq!(Role::from(dto("content-editor", Some(50))).display_name, "Content Editor");
        assert_eq!(Role::from(dto("site_admin", Some(90))).display_name, "Site Admin");
        assert_eq!(Role::from(dto("viewer", Some(10))).display_name, "Viewer");
    }

    #[test]
    fn test_level_buckets_priority_by_ten() {
        assert_eq!(Role::from(dto("admin", Some(90))).level, 9);
        assert_eq!(Role::from(dto("editor", Some(55))).level, 5);
        // Below 10 still lands in the bottom bucket, never zero
        assert_eq!(Role::from(dto("guest", Some(3))).level, 1);
        assert_eq!(Role::from(dto("unranked", None)).level, 1);
    }

    #[test]
    fn test_meets_level() {
        let admin = Role::from(dto("admin", Some(90)));
        assert!(admin.meets_level(5));
        assert!(!admin.meets_level(10));
    }
}
