//! Story version history: snapshots, rollback, branching and comparison

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionType {
    Auto,
    Manual,
    Rollback,
    Branch,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    Active,
    Archived,
    Draft,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionAuthor {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryVersion {
    pub id: String,
    pub story_id: i64,
    pub version_number: u32,
    #[serde(default)]
    pub version_label: Option<String>,
    pub version_type: VersionType,
    pub status: VersionStatus,
    pub branch_name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub changes_count: u32,
    #[serde(default)]
    pub change_summary: Option<String>,
    #[serde(default)]
    pub created_by: Option<VersionAuthor>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Per-field before/after pair in a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDiff {
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionDiff {
    #[serde(default)]
    pub added: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub modified: Option<HashMap<String, FieldDiff>>,
    #[serde(default)]
    pub removed: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionComparison {
    pub version_a: StoryVersion,
    pub version_b: StoryVersion,
    pub diff: VersionDiff,
    #[serde(default)]
    pub changes_count: u32,
    #[serde(default)]
    pub changed_fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchInfo {
    pub name: String,
    pub version_count: u32,
    pub latest_version: u32,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_main: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_type: Option<VersionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackVersion {
    pub version_number: u32,
    pub commit_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_branch: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranch {
    pub branch_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_version_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeBranches {
    pub from_branch: String,
    pub from_version_number: u32,
    pub target_branch: String,
    pub commit_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolve_conflicts: Option<HashMap<String, serde_json::Value>>,
}

/// Optional paging and branch filter for the history listing
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
}

impl ApiClient {
    pub async fn version_history(
        &self,
        story_id: i64,
        query: Option<&VersionQuery>,
    ) -> Result<Vec<StoryVersion>> {
        let url = format!("{}/v1/stories/{}/versions", self.base_url(), story_id);
        let response = self
            .dispatch(|| {
                let mut request = self.http().get(&url);
                if let Some(query) = query {
                    request = request.query(query);
                }
                request
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn get_version(&self, story_id: i64, version_number: u32) -> Result<StoryVersion> {
        let url = format!(
            "{}/v1/stories/{}/versions/{}",
            self.base_url(),
            story_id,
            version_number
        );
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    /// Take a manual snapshot of the story's current state
    pub async fn create_version(&self, story_id: i64, draft: &CreateVersion) -> Result<StoryVersion> {
        let url = format!("{}/v1/stories/{}/versions", self.base_url(), story_id);
        let response = self.dispatch(|| self.http().post(&url).json(draft)).await?;

        self.handle_response(response).await
    }

    /// Restore the story to an earlier version, recorded as a new version
    pub async fn rollback_version(
        &self,
        story_id: i64,
        request: &RollbackVersion,
    ) -> Result<StoryVersion> {
        let url = format!("{}/v1/stories/{}/versions/rollback", self.base_url(), story_id);
        let response = self.dispatch(|| self.http().post(&url).json(request)).await?;

        self.handle_response(response).await
    }

    pub async fn create_branch(&self, story_id: i64, request: &CreateBranch) -> Result<StoryVersion> {
        let url = format!("{}/v1/stories/{}/versions/branch", self.base_url(), story_id);
        let response = self.dispatch(|| self.http().post(&url).json(request)).await?;

        self.handle_response(response).await
    }

    pub async fn merge_branches(
        &self,
        story_id: i64,
        request: &MergeBranches,
    ) -> Result<StoryVersion> {
        let url = format!("{}/v1/stories/{}/versions/merge", self.base_url(), story_id);
        let response = self.dispatch(|| self.http().post(&url).json(request)).await?;

        self.handle_response(response).await
    }

    pub async fn compare_versions(
        &self,
        story_id: i64,
        version_a: u32,
        version_b: u32,
    ) -> Result<VersionComparison> {
        let url = format!("{}/v1/stories/{}/versions/compare", self.base_url(), story_id);
        let response = self
            .dispatch(|| {
                self.http().post(&url).json(&serde_json::json!({
                    "versionA": version_a,
                    "versionB": version_b,
                }))
            })
            .await?;

        self.handle_response(response).await
    }

    pub async fn branch_info(&self, story_id: i64) -> Result<Vec<BranchInfo>> {
        let url = format!(
            "{}/v1/stories/{}/versions/branches/info",
            self.base_url(),
            story_id
        );
        let response = self.dispatch(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn tag_version(
        &self,
        story_id: i64,
        version_number: u32,
        tag: &str,
    ) -> Result<StoryVersion> {
        let url = format!(
            "{}/v1/stories/{}/versions/{}/tag",
            self.base_url(),
            story_id,
            version_number
        );
        let response = self
            .dispatch(|| self.http().post(&url).json(&serde_json::json!({ "tag": tag })))
            .await?;

        self.handle_response(response).await
    }
}
