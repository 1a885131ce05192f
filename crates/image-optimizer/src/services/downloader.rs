//! Source image downloads over HTTP(S).

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONTENT_TYPE, ORIGIN, REFERER},
};
use std::time::Duration;
use tracing::debug;

use crate::{
    config::defaults::DEFAULT_DOWNLOAD_TIMEOUT_SECS,
    errors::{AppError, AppResult, DownloadError, DownloadResult},
    services::traits::ImageFetcher,
    utils::url::UrlUtils,
};

pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS);

/// Some image hosts refuse requests that do not look like a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

/// [`ImageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpImageDownloader {
    client: Client,
    timeout: Duration,
}

impl HttpImageDownloader {
    /// Downloader with the default 30 second timeout.
    ///
    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new() -> AppResult<Self> {
        Self::with_timeout(DEFAULT_DOWNLOAD_TIMEOUT)
    }

    /// # Errors
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| AppError::configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, err: &reqwest::Error) -> DownloadError {
        if err.is_timeout() {
            DownloadError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if err.is_builder() {
            DownloadError::InvalidUrl {
                message: err.to_string(),
            }
        } else {
            DownloadError::Transport {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageDownloader {
    async fn fetch(&self, url: &str, origin: &str) -> DownloadResult<Bytes> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, IMAGE_ACCEPT)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .header(CACHE_CONTROL, "no-cache");

        if !origin.is_empty() {
            request = request.header(REFERER, origin).header(ORIGIN, origin);
        }

        debug!(
            url = %UrlUtils::obfuscate_credentials(url),
            origin = %origin,
            "Fetching source image"
        );

        let response = request.send().await.map_err(|e| self.classify(&e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(DownloadError::Status {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(DownloadError::NotAnImage { content_type });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(&e))?;

        debug!(
            url = %UrlUtils::obfuscate_credentials(url),
            content_type = %content_type,
            bytes = bytes.len(),
            "Fetched source image"
        );

        Ok(bytes)
    }
}
