//! Dynamic post type modeling: post types and their field definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ApiClient;

/// The 25 field types the content modeler supports, wire values lowercase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    // Text
    Text,
    Textarea,
    Wysiwyg,
    Email,
    Url,
    Tel,
    Code,
    // Number
    Number,
    Currency,
    // Date/time
    Date,
    Datetime,
    Time,
    // Choice
    Checkbox,
    Radio,
    Select,
    Multiselect,
    Toggle,
    // Media
    File,
    Image,
    Gallery,
    Video,
    // Relational
    Relation,
    User,
    Taxonomy,
    // Advanced
    Color,
    Json,
    Repeater,
    Group,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: String,
    pub post_type_id: String,
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_searchable: bool,
    #[serde(default)]
    pub is_filterable: bool,
    #[serde(default)]
    pub is_sortable: bool,
    #[serde(default)]
    pub display_order: u32,
    #[serde(default)]
    pub field_group: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    // Type-specific JSONB blobs; their inner shape depends on field_type
    #[serde(default)]
    pub validation_rules: Option<serde_json::Value>,
    #[serde(default)]
    pub field_options: Option<serde_json::Value>,
    #[serde(default)]
    pub conditional_logic: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostType {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub singular_label: Option<String>,
    #[serde(default)]
    pub plural_label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub menu_position: Option<u32>,
    #[serde(default)]
    pub is_hierarchical: bool,
    #[serde(default)]
    pub supports_comments: bool,
    #[serde(default)]
    pub supports_revisions: bool,
    #[serde(default)]
    pub is_active: bool,
    /// System post types cannot be deleted
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub settings: Option<serde_json::Value>,
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub field_definitions: Option<Vec<FieldDefinition>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTypeDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub singular_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plural_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_hierarchical: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_unique: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_searchable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_filterable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_sortable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_rules: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_options: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_logic: Option<serde_json::Value>,
}

impl ApiClient {
    pub async fn list_post_types(&self, include_inactive: bool) -> Result<Vec<PostType>> {
        let url = format!("{}/v1/post-types", self.base_url());
        let response = self
            .dispatch(|| {
                self.http()
                    .get(&url)
                    .query(&[("includeInactive", include_inactive.to_string())])
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn get_post_type(&self, id: &str) -> Result<PostType> {
        let url = format!("{}/v1/post-types/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn post_type_by_slug(&self, slug: &str) -> Result<PostType> {
        let url = format!(
            "{}/v1/post-types/slug/{}",
            self.base_url(),
            urlencoding::encode(slug)
        );
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_post_type(&self, draft: &PostTypeDraft) -> Result<PostType> {
        let url = format!("{}/v1/post-types", self.base_url());
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_post_type(&self, id: &str, draft: &PostTypeDraft) -> Result<PostType> {
        let url = format!("{}/v1/post-types/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    /// Delete a post type; the server rejects this for system types
    pub async fn delete_post_type(&self, id: &str) -> Result<()> {
        let url = format!("{}/v1/post-types/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    // =========================================================================
    // Field definitions
    // =========================================================================

    pub async fn list_fields(&self, post_type_id: &str) -> Result<Vec<FieldDefinition>> {
        let url = format!("{}/v1/post-types/{}/fields", self.base_url(), post_type_id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_field(
        &self,
        post_type_id: &str,
        draft: &FieldDraft,
    ) -> Result<FieldDefinition> {
        let url = format!("{}/v1/post-types/{}/fields", self.base_url(), post_type_id);
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_field(
        &self,
        post_type_id: &str,
        field_id: &str,
        draft: &FieldDraft,
    ) -> Result<FieldDefinition> {
        let url = format!(
            "{}/v1/post-types/{}/fields/{}",
            self.base_url(),
            post_type_id,
            field_id
        );
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    /// Reapply display order from the given field id sequence
    pub async fn reorder_fields(
        &self,
        post_type_id: &str,
        field_ids: &[String],
    ) -> Result<Vec<FieldDefinition>> {
        let url = format!(
            "{}/v1/post-types/{}/fields/reorder",
            self.base_url(),
            post_type_id
        );
        let response = self
            .dispatch(|| {
                self.http()
                    .post(&url)
                    .json(&serde_json::json!({ "fieldIds": field_ids }))
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn delete_field(&self, post_type_id: &str, field_id: &str) -> Result<()> {
        let url = format!(
            "{}/v1/post-types/{}/fields/{}",
            self.base_url(),
            post_type_id,
            field_id
        );
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&FieldType::Multiselect).unwrap(),
            r#""multiselect""#
        );
        let parsed: FieldType = serde_json::from_str(r#""wysiwyg""#).unwrap();
        assert_eq!(parsed, FieldType::Wysiwyg);
    }

    #[tokio::test]
    async fn test_post_type_by_slug_parses_nested_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/post-types/slug/events")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "success": true,
                    "data": {
                        "id": "pt1",
                        "name": "Events",
                        "slug": "events",
                        "isActive": true,
                        "fieldDefinitions": [{
                            "id": "f1",
                            "postTypeId": "pt1",
                            "name": "event_date",
                            "label": "Event date",
                            "fieldType": "date",
                            "isRequired": true,
                            "displayOrder": 1
                        }]
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let post_type = client.post_type_by_slug("events").await.unwrap();

        assert_eq!(post_type.slug, "events");
        let fields = post_type.field_definitions.unwrap();
        assert_eq!(fields[0].field_type, FieldType::Date);
        assert!(fields[0].is_required);
    }
}
