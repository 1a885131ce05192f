//! Service seams

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::DownloadResult;

/// Fetches raw source image bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Download `url`, sending `origin` as `Referer`/`Origin` when it is non-empty.
    async fn fetch(&self, url: &str, origin: &str) -> DownloadResult<Bytes>;
}
