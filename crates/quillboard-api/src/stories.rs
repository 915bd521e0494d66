//! Story CRUD, search and main-image endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachments::Attachment;
use crate::error::Result;
use crate::{ApiClient, Page};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Option<Vec<String>>,
    #[serde(default)]
    pub main_image: Option<Attachment>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<String>>,
}

/// Optional filters for the story list
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
}

impl ApiClient {
    pub async fn list_stories(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&StoryFilters>,
    ) -> Result<Page<Story>> {
        let url = format!("{}/v1/stories", self.base_url());
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

    pub async fn get_story(&self, id: i64) -> Result<Story> {
        let url = format!("{}/v1/stories/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn create_story(&self, draft: &StoryDraft) -> Result<Story> {
        let url = format!("{}/v1/stories", self.base_url());
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn update_story(&self, id: i64, draft: &StoryDraft) -> Result<Story> {
        let url = format!("{}/v1/stories/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().patch(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    pub async fn delete_story(&self, id: i64) -> Result<()> {
        let url = format!("{}/v1/stories/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    pub async fn search_stories(&self, query: &str) -> Result<Vec<Story>> {
        let url = format!("{}/v1/stories/search", self.base_url());
        let response = self
            .dispatch(|| self.http().get(&url).query(&[("q", query)]))
            .await?;

        self.handle_response(response).await
    }

    pub async fn stories_by_category(
        &self,
        category_id: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<Story>> {
        let url = format!("{}/v1/stories/category/{}", self.base_url(), category_id);
        let response = self
            .dispatch(|| {
                self.http()
                    .get(&url)
                    .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn stories_by_tag(&self, tag_id: &str, page: u32, limit: u32) -> Result<Page<Story>> {
        let url = format!("{}/v1/stories/tag/{}", self.base_url(), tag_id);
        let response = self
            .dispatch(|| {
                self.http()
                    .get(&url)
                    .query(&[("page", page.to_string()), ("limit", limit.to_string())])
            })
            .await?;

        self.handle_response(response).await
    }

    /// Aggregate story counts by status, shape varies by deployment
    pub async fn story_stats(&self) -> Result<serde_json::Value> {
        let url = format!("{}/v1/stories/stats", self.base_url());
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    /// Point the story's main image at an uploaded attachment
    pub async fn set_story_main_image(&self, id: i64, attachment_id: &str) -> Result<()> {
        let url = format!("{}/v1/stories/{}/main-image", self.base_url(), id);
        let response = self
            .dispatch(|| {
                self.http()
                    .put(&url)
                    .json(&serde_json::json!({ "attachmentId": attachment_id }))
            })
            .await?;

        self.handle_empty_response(response).await
    }

    pub async fn remove_story_main_image(&self, id: i64) -> Result<()> {
        let url = format!("{}/v1/stories/{}/main-image", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_stories_with_filters() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/stories")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("page".into(), "2".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "10".into()),
                mockito::Matcher::UrlEncoded("status".into(), "published".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"success":true,"data":{"data":[{"id":7,"title":"Launch day"}],"total":21}}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let filters = StoryFilters {
            status: Some("published".into()),
            ..StoryFilters::default()
        };
        let page = client.list_stories(2, 10, Some(&filters)).await.unwrap();

        assert_eq!(page.total, 21);
        assert_eq!(page.data[0].title, "Launch day");
    }

    #[tokio::test]
    async fn test_get_story_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/stories/99")
            .with_status(404)
            .with_body(r#"{"success":false,"error":{"message":"Story not found"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let result = client.get_story(99).await;

        assert!(result.unwrap_err().is_not_found());
    }
}
