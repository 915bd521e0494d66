//! Server health probes, mounted outside the versioned API surface

use crate::error::Result;
use crate::ApiClient;

impl ApiClient {
    /// Root health check; responds even when dependencies are degraded
    pub async fn health(&self) -> Result<serde_json::Value> {
        let url = format!("{}/health", self.base_url());
        let response = self.dispatch_no_refresh(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn readiness(&self) -> Result<serde_json::Value> {
        let url = format!("{}/health/ready", self.base_url());
        let response = self.dispatch_no_refresh(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }

    pub async fn liveness(&self) -> Result<serde_json::Value> {
        let url = format!("{}/health/live", self.base_url());
        let response = self.dispatch_no_refresh(|| self.http().get(&url)).await?;

        self.handle_response(response).await
    }
}
