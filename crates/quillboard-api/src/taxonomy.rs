//! Category and tag endpoints
//!
//! The two resources share the same shape and the same CRUD surface, so
//! they share the draft DTO too.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{ApiClient, Page};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub story_count: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub story_count: Option<u64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields accepted when creating or updating a category or tag
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl TaxonomyDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl ApiClient {
    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(
        &self,
        page: u32,
        limit: u32,
        include_counts: bool,
    ) -> Result<Page<Category>> {
        let url = format!("{}/v1/categories", self.base_url());
        let response = self
            .dispatch(|| {
                self.http().get(&url).query(&[
                    ("page", page.to_string()),
                    ("limit", limit.to_string()),
                    ("includeCounts", include_counts.to_string()),
                ])
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn get_category(&self, id: &str) -> Result<Category> {
        let url = format!("{}/v1/categories/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_category(&self, draft: &TaxonomyDraft) -> Result<Category> {
        let url = format!("{}/v1/categories", self.base_url());
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_category(&self, id: &str, draft: &TaxonomyDraft) -> Result<Category> {
        let url = format!("{}/v1/categories/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn delete_category(&self, id: &str) -> Result<()> {
        let url = format!("{}/v1/categories/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    pub async fn search_categories(&self, query: &str) -> Result<Vec<Category>> {
        let url = format!("{}/v1/categories/search", self.base_url());
        let response = self
            .dispatch(|| self.http().get(&url).query(&[("q", query)]))
            .await?;

        self.handle_response(response).await
    }

    /// Usage statistics for one category
    pub async fn category_stats(&self, id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/v1/categories/{}/stats", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub async fn list_tags(&self, page: u32, limit: u32) -> Result<Page<Tag>> {
        let url = format!("{}/v1/tags", self.base_url());
        let response = self
            .dispatch(|| {
                self.http()
                    .get(&url)
                    .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn get_tag(&self, id: &str) -> Result<Tag> {
        let url = format!("{}/v1/tags/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_tag(&self, draft: &TaxonomyDraft) -> Result<Tag> {
        let url = format!("{}/v1/tags", self.base_url());
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_tag(&self, id: &str, draft: &TaxonomyDraft) -> Result<Tag> {
        let url = format!("{}/v1/tags/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn delete_tag(&self, id: &str) -> Result<()> {
        let url = format!("{}/v1/tags/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    pub async fn search_tags(&self, query: &str) -> Result<Vec<Tag>> {
        let url = format!("{}/v1/tags/search", self.base_url());
        let response = self
            .dispatch(|| self.http().get(&url).query(&[("q", query)]))
            .await?;

        self.handle_response(response).await
    }

    /// Usage statistics for one tag
    pub async fn tag_stats(&self, id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/v1/tags/{}/stats", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    /// The most used tags, for suggestion widgets
    pub async fn popular_tags(&self, limit: u32) -> Result<Vec<Tag>> {
        let url = format!("{}/v1/tags/popular", self.base_url());
        let response = self
            .dispatch(|| self.http().get(&url).query(&[("limit", limit.to_string())]))
            .await?;

        self.handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_tags_parses_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/tags")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("page".into(), "1".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"success":true,"data":{"data":[{"id":"t1","name":"rust","slug":"rust"}],"total":1}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let page = client.list_tags(1, 100).await.unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].name, "rust");
    }

    #[tokio::test]
    async fn test_create_category_skips_unset_fields() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/categories")
            .match_body(mockito::Matcher::Json(serde_json::json!({"name": "News"})))
            .with_status(201)
            .with_body(r#"{"success":true,"data":{"id":"c1","name":"News"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let category = client
            .create_category(&TaxonomyDraft::named("News"))
            .await
            .unwrap();

        assert_eq!(category.id, "c1");
    }
}
