//! Thin wrappers over the generation service's REST endpoints.

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use shared::{
    domain::{FinalSlide, Provider},
    protocol::{
        HealthResponse, PdfExportRequest, PdfExportSlide, SaveKeyRequest, SaveKeyResponse,
    },
};
use tracing::{info, warn};

pub struct ServiceApi {
    http: Client,
    server_url: String,
}

impl ServiceApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let res = self
            .http
            .get(format!("{}/api/health", self.server_url))
            .send()
            .await
            .context("failed to reach generation server")?
            .error_for_status()?;
        let health: HealthResponse = res.json().await.context("invalid health response")?;
        Ok(health)
    }

    /// Submits a provider key for validation and storage on the server. A
    /// rejected key comes back as `success: false` with the server's reason.
    pub async fn save_key(&self, provider: Provider, api_key: &str) -> Result<SaveKeyResponse> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            bail!("API key must not be empty");
        }
        let res = self
            .http
            .post(format!("{}/api/providers/save-key", self.server_url))
            .json(&SaveKeyRequest {
                provider,
                api_key: api_key.to_string(),
            })
            .send()
            .await
            .context("failed to reach generation server")?
            .error_for_status()?;
        let body: SaveKeyResponse = res.json().await.context("invalid save-key response")?;
        if body.success {
            info!(provider = provider.as_str(), "provider key saved on server");
        } else {
            warn!(
                provider = provider.as_str(),
                "server rejected provider key: {}",
                body.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(body)
    }

    /// Server-side alternative to the local export pipeline.
    pub async fn export_pdf(&self, slides: &[FinalSlide], title: &str) -> Result<Vec<u8>> {
        let request = PdfExportRequest {
            slides: slides.iter().map(PdfExportSlide::from).collect(),
            title: title.to_string(),
        };
        let res = self
            .http
            .post(format!("{}/api/export/pdf", self.server_url))
            .json(&request)
            .send()
            .await
            .context("failed to reach generation server")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            if text.trim().is_empty() {
                return Err(anyhow!("PDF export failed with status {status}"));
            }
            return Err(anyhow!("PDF export failed with status {status}: {text}"));
        }

        let bytes = res.bytes().await.context("failed to read PDF body")?;
        info!(pages = slides.len(), bytes = bytes.len(), "server PDF export finished");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
