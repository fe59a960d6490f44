use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::RefreshError;
use crate::types::NowPlaying;

/// Something that can be polled for the current track.
pub trait NowPlayingSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<NowPlaying, RefreshError>> + Send;
}

/// Loads cover artwork bytes for the exporter.
pub trait ArtworkSource: Send + Sync {
    fn fetch_artwork(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Polls the now-playing HTTP endpoint.
#[derive(Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl NowPlayingSource for HttpSource {
    async fn fetch(&self) -> Result<NowPlaying, RefreshError> {
        log::debug!("GET {}", self.endpoint);

        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Status(status));
        }

        let body = response.bytes().await?;
        log::debug!("Received {} bytes from {}", body.len(), self.endpoint);

        NowPlaying::from_json(&body)
    }
}

impl ArtworkSource for HttpSource {
    async fn fetch_artwork(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request artwork {}", url))?
            .error_for_status()
            .context("Artwork request was rejected")?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read artwork body")?;

        Ok(bytes.to_vec())
    }
}
