//! HTTP-based template source

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::application::{FetchResponse, TemplateSource};
use crate::core::config::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::core::{Error, Result};

/// Fetches template indexes and bodies over HTTP(S)
pub struct HttpTemplateSource {
    client: Client,
}

impl HttpTemplateSource {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    /// Every request, including reading the body, must finish within `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| Error::http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl TemplateSource for HttpTemplateSource {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::http(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            Error::http(format!("Failed to read response body from {}: {}", url, e))
        })?;

        Ok(FetchResponse { status, body })
    }
}
