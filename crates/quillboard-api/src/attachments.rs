//! Media attachment endpoints, including multipart upload

use chrono::{DateTime, Utc};
use reqwest::multipart;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{ApiClient, Page};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Attachment {
    /// Best displayable URL for this attachment
    ///
    /// Prefers the preview rendition, then the canonical URL, then the
    /// thumbnail, and falls back to the raw storage path.
    pub fn preferred_url(&self) -> Option<&str> {
        self.preview_url
            .as_deref()
            .or(self.url.as_deref())
            .or(self.thumbnail_url.as_deref())
            .or(self.path.as_deref())
    }
}

/// Optional filters for the attachment list
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ApiClient {
    pub async fn list_attachments(
        &self,
        page: u32,
        limit: u32,
        filters: Option<&AttachmentFilters>,
    ) -> Result<Page<Attachment>> {
        let url = format!("{}/v1/attachments", self.base_url());
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

    pub async fn get_attachment(&self, id: &str) -> Result<Attachment> {
        let url = format!("{}/v1/attachments/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    /// Upload a single file
    ///
    /// The form is rebuilt from the owned bytes on every attempt, so the
    /// upload survives a refresh-and-replay cycle.
    pub async fn upload_attachment(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Result<Attachment> {
        let url = format!("{}/v1/attachments", self.base_url());
        let response = self
            .dispatch(|| {
                let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.to_string());
                let mut form = multipart::Form::new().part("file", part);
                if let Some(metadata) = &metadata {
                    form = form.text("metadata", metadata.to_string());
                }
                self.http().post(&url).multipart(form)
            })
            .await?;

        self.handle_response(response).await
    }

    /// Upload several files in one request
    pub async fn upload_attachments(
        &self,
        files: &[(String, Vec<u8>)],
        metadata: Option<serde_json::Value>,
    ) -> Result<Vec<Attachment>> {
        let url = format!("{}/v1/attachments/bulk", self.base_url());
        let response = self
            .dispatch(|| {
                let mut form = multipart::Form::new();
                for (file_name, bytes) in files {
                    let part = multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    form = form.part("files", part);
                }
                if let Some(metadata) = &metadata {
                    form = form.text("metadata", metadata.to_string());
                }
                self.http().post(&url).multipart(form)
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn update_attachment(&self, id: &str, update: &AttachmentUpdate) -> Result<Attachment> {
        let url = format!("{}/v1/attachments/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().patch(&url).json(update)).await?;

        self.handle_response(response).await
    }

    pub async fn delete_attachment(&self, id: &str) -> Result<()> {
        let url = format!("{}/v1/attachments/{}", self.base_url(), id);
        let response = self.dispatch(|| self.http().delete(&url)).await?;

        self.handle_empty_response(response).await
    }

    pub async fn delete_attachments(&self, ids: &[String]) -> Result<()> {
        let url = format!("{}/v1/attachments/bulk-delete", self.base_url());
        let response = self
            .dispatch(|| self.http().post(&url).json(&serde_json::json!({ "ids": ids })))
            .await?;

        self.handle_empty_response(response).await
    }

    pub async fn search_attachments(
        &self,
        query: &str,
        page: u32,
        limit: u32,
    ) -> Result<Page<Attachment>> {
        let url = format!("{}/v1/attachments/search", self.base_url());
        let response = self
            .dispatch(|| {
                self.http().get(&url).query(&[
                    ("q", query.to_string()),
                    ("page", page.to_string()),
                    ("limit", limit.to_string()),
                ])
            })
            .await?;

        self.handle_response(response).await
    }

    /// Absolute download URL for an attachment
    pub fn attachment_download_url(&self, id: &str) -> String {
        format!("{}/v1/attachments/{}/download", self.base_url(), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(preview: Option<&str>, url: Option<&str>, path: Option<&str>) -> Attachment {
        Attachment {
            id: "a1".into(),
            file_name: None,
            original_name: None,
            mime_type: None,
            size: None,
            url: url.map(String::from),
            preview_url: preview.map(String::from),
            thumbnail_url: None,
            path: path.map(String::from),
            metadata: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_preferred_url_fallback_chain() {
        let full = attachment(Some("/p.jpg"), Some("/u.jpg"), Some("/raw"));
        assert_eq!(full.preferred_url(), Some("/p.jpg"));

        let no_preview = attachment(None, Some("/u.jpg"), Some("/raw"));
        assert_eq!(no_preview.preferred_url(), Some("/u.jpg"));

        let path_only = attachment(None, None, Some("/raw"));
        assert_eq!(path_only.preferred_url(), Some("/raw"));

        let bare = attachment(None, None, None);
        assert_eq!(bare.preferred_url(), None);
    }

    #[tokio::test]
    async fn test_upload_attachment_sends_multipart() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/attachments")
            .match_header(
                "content-type",
                mockito::Matcher::Regex("multipart/form-data.*".into()),
            )
            .with_status(201)
            .with_body(r#"{"success":true,"data":{"id":"a9","fileName":"cover.png"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url());
        let uploaded = client
            .upload_attachment("cover.png", vec![0x89, 0x50, 0x4e, 0x47], None)
            .await
            .unwrap();

        assert_eq!(uploaded.id, "a9");
        assert_eq!(uploaded.file_name, Some("cover.png".to_string()));
    }

    #[test]
    fn test_download_url() {
        let client = ApiClient::new("http://localhost:4040/api");
        assert_eq!(
            client.attachment_download_url("a1"),
            "http://localhost:4040/api/v1/attachments/a1/download"
        );
    }
}
