//! Dynamic content entries, addressed by post type slug

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{ApiClient, Page};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    PendingReview,
    Published,
    Scheduled,
    Archived,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostContent {
    pub id: String,
    pub post_type_id: String,
    pub title: String,
    pub slug: String,
    pub status: ContentStatus,
    /// Custom field values keyed by field name; shape is defined by the
    /// post type's field definitions
    #[serde(rename = "field_data", default)]
    pub field_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
    #[serde(rename = "field_data", skip_serializing_if = "Option::is_none")]
    pub field_data: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Listing filters; `fields` narrows by custom field values and is sent as
/// a JSON object serialized into a single query parameter
#[derive(Debug, Clone, Default)]
pub struct ContentQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ContentStatus>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub fields: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ContentQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(status) = &self.status {
            if let Ok(serde_json::Value::String(s)) = serde_json::to_value(status) {
                params.push(("status", s));
            }
        }
        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(sort_by) = &self.sort_by {
            params.push(("sortBy", sort_by.clone()));
        }
        if let Some(sort_order) = &self.sort_order {
            params.push(("sortOrder", sort_order.clone()));
        }
        if let Some(fields) = &self.fields {
            if let Ok(encoded) = serde_json::to_string(fields) {
                params.push(("fields", encoded));
            }
        }
        params
    }
}

impl ApiClient {
    fn content_url(&self, post_type_slug: &str) -> String {
        format!(
            "{}/v1/content/{}",
            self.base_url(),
            urlencoding::encode(post_type_slug)
        )
    }

    pub async fn list_content(
        &self,
        post_type_slug: &str,
        query: &ContentQuery,
    ) -> Result<Page<PostContent>> {
        let url = self.content_url(post_type_slug);
        let params = query.to_params();
        let response = self.dispatch(|| self.http().get(&url).query(&params)).await?;

        self.handle_response(response).await
    }

    pub async fn get_content(&self, post_type_slug: &str, id: &str) -> Result<PostContent> {
        let url = format!("{}/{}", self.content_url(post_type_slug), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn content_by_slug(&self, post_type_slug: &str, slug: &str) -> Result<PostContent> {
        let url = format!(
            "{}/slug/{}",
            self.content_url(post_type_slug),
            urlencoding::encode(slug)
        );
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_content(
        &self,
        post_type_slug: &str,
        draft: &ContentDraft,
    ) -> Result<PostContent> {
        let url = self.content_url(post_type_slug);
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_content(
        &self,
        post_type_slug: &str,
        id: &str,
        draft: &ContentDraft,
    ) -> Result<PostContent> {
        let url = format!("{}/{}", self.content_url(post_type_slug), id);
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn publish_content(&self, post_type_slug: &str, id: &str) -> Result<PostContent> {
        let url = format!("{}/{}/publish", self.content_url(post_type_slug), id);
        let response = self.dispatch(|| self.http().post(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn schedule_content(
        &self,
        post_type_slug: &str,
        id: &str,
        scheduled_for: DateTime<Utc>,
    ) -> Result<PostContent> {
        let url = format!("{}/{}/schedule", self.content_url(post_type_slug), id);
        let response = self
            .dispatch(|| {
                self.http()
                    .post(&url)
                    .json(&serde_json::json!({ "scheduledFor": scheduled_for }))
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn archive_content(&self, post_type_slug: &str, id: &str) -> Result<PostContent> {
        let draft = ContentDraft {
            status: Some(ContentStatus::Archived),
            ..Default::default()
        };
        self.update_content(post_type_slug, id, &draft).await
    }

    pub async fn delete_content(&self, post_type_slug: &str, id: &str) -> Result<()> {
        let url = format!("{}/{}", self.content_url(post_type_slug), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    pub async fn search_content(
        &self,
        post_type_slug: &str,
        term: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<PostContent>> {
        let query = ContentQuery {
            page,
            limit,
            search: Some(term.to_owned()),
            ..Default::default()
        };
        self.list_content(post_type_slug, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ContentStatus::PendingReview).unwrap(),
            r#""pending_review""#
        );
    }

    #[test]
    fn test_field_data_key_stays_snake_case() {
        let draft = ContentDraft {
            title: Some("Launch day".into()),
            field_data: Some(
                serde_json::json!({ "venue": "Main hall" })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            ),
            ..Default::default()
        };
        let encoded = serde_json::to_value(&draft).unwrap();
        assert!(encoded.get("field_data").is_some());
        assert!(encoded.get("fieldData").is_none());
    }

    #[tokio::test]
    async fn test_list_content_encodes_field_filter_as_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/content/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("status".into(), "published".into()),
                Matcher::UrlEncoded("fields".into(), r#"{"venue":"Main hall"}"#.into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "success": true,
                    "data": {
                        "data": [{
                            "id": "c1",
                            "postTypeId": "pt1",
                            "title": "Launch day",
                            "slug": "launch-day",
                            "status": "published",
                            "field_data": { "venue": "Main hall" }
                        }],
                        "total": 1,
                        "page": 1,
                        "limit": 20
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let query = ContentQuery {
            status: Some(ContentStatus::Published),
            fields: serde_json::json!({ "venue": "Main hall" }).as_object().cloned(),
            ..Default::default()
        };
        let page = client.list_content("events", &query).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].field_data["venue"], "Main hall");
    }
}
