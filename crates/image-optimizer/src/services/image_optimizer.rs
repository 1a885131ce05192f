//! Request orchestration: parse, cache lookup, fetch, transform, store.

use bytes::Bytes;
use disk_cache_store::DiskCacheStore;
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

use crate::{
    errors::{AppError, AppResult},
    models::{CacheStats, CacheStatus, ImageInfo, OUTPUT_CONTENT_TYPE, OptimizedImage, RequestParams},
    services::{
        cache_key::CacheKey, in_flight::InFlightRegistry, params::ParamsParser,
        traits::ImageFetcher, transform::TransformPipeline,
    },
    utils::{UrlUtils, format_duration, format_megabytes, format_memory},
};

const UNKNOWN_CACHE_SIZE: &str = "unknown";

/// Serves optimized images, fetching and transforming on cache misses.
///
/// Concurrent misses for the same (url, width, quality) share one fetch and
/// one transform. Failures are never cached.
pub struct ImageOptimizer {
    store: DiskCacheStore,
    fetcher: Arc<dyn ImageFetcher>,
    in_flight: InFlightRegistry<CacheKey, AppResult<Bytes>>,
}

impl ImageOptimizer {
    pub fn new(store: DiskCacheStore, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Parse a raw image path and serve it.
    ///
    /// Parameter errors are returned before any cache or network activity.
    ///
    /// # Errors
    /// See [`ImageOptimizer::optimize`]; additionally [`AppError::Parameter`].
    pub async fn optimize_request(&self, raw_path: &str, origin: &str) -> AppResult<OptimizedImage> {
        let params = ParamsParser::parse(raw_path, origin)?;
        self.optimize(&params).await
    }

    /// Serve the image described by `params` from cache, or produce and cache it.
    ///
    /// A failure to write the cache is logged and does not fail the request.
    ///
    /// # Errors
    /// [`AppError::Download`], [`AppError::Decode`], [`AppError::Encode`], or
    /// [`AppError::Internal`] if the transform task panics.
    pub async fn optimize(&self, params: &RequestParams) -> AppResult<OptimizedImage> {
        let key = CacheKey::derive(&params.url, params.width, params.quality);

        if let Some(bytes) = self.cached(&key).await {
            debug!(key = %key, width = params.width, quality = params.quality, "Cache hit");
            return Ok(OptimizedImage {
                bytes,
                content_type: OUTPUT_CONTENT_TYPE,
                cache_status: CacheStatus::Hit,
            });
        }

        let bytes = self
            .in_flight
            .run(key.clone(), || self.produce(&key, params))
            .await?;

        Ok(OptimizedImage {
            bytes,
            content_type: OUTPUT_CONTENT_TYPE,
            cache_status: CacheStatus::Miss,
        })
    }

    /// Fetch a source image and report its dimensions and format. Nothing is cached.
    ///
    /// `url` goes through the same decoding and scheme defaulting as image paths.
    ///
    /// # Errors
    /// [`AppError::Parameter`], [`AppError::Download`] or [`AppError::Decode`].
    pub async fn info(&self, url: &str) -> AppResult<ImageInfo> {
        let url = ParamsParser::resolve_url(url)?;
        let bytes = self.fetcher.fetch(&url, "").await?;
        Ok(TransformPipeline::inspect(&bytes)?)
    }

    /// Current cache size and directory.
    ///
    /// The size reads `unknown` when the cache directory cannot be listed.
    pub async fn stats(&self) -> CacheStats {
        let cache_size = match self.store.size().await {
            Ok(size) => format_megabytes(size),
            Err(e) => {
                warn!("Failed to compute cache size: {}", e);
                UNKNOWN_CACHE_SIZE.to_string()
            }
        };
        CacheStats {
            cache_size,
            cache_dir: self.store.base_dir().display().to_string(),
        }
    }

    /// Run an expiry sweep now. Returns the number of entries removed.
    ///
    /// # Errors
    /// [`AppError::Cache`] when the cache directory cannot be listed.
    pub async fn cleanup_now(&self) -> AppResult<usize> {
        Ok(self.store.sweep_expired().await?)
    }

    /// Cache lookup where any store error counts as a miss.
    async fn cached(&self, key: &CacheKey) -> Option<Bytes> {
        match self.store.lookup(key.as_str()).await {
            Ok(found) => found.map(Bytes::from),
            Err(e) => {
                warn!(key = %key, "Cache lookup failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Body of a single flight. Re-checks the cache first since another flight
    /// for this key may have completed between our lookup and joining.
    async fn produce(&self, key: &CacheKey, params: &RequestParams) -> AppResult<Bytes> {
        if let Some(bytes) = self.cached(key).await {
            return Ok(bytes);
        }

        let started = Instant::now();
        let source = self.fetcher.fetch(&params.url, &params.origin).await?;

        let (width, quality) = (params.width, params.quality);
        let source_len = source.len();
        let encoded = tokio::task::spawn_blocking(move || {
            TransformPipeline::transform(&source, width, quality)
        })
        .await
        .map_err(|e| AppError::internal(format!("transform task failed: {e}")))??;

        if let Err(e) = self.store.store(key.as_str(), &encoded).await {
            warn!(key = %key, "Failed to save optimized image to cache: {}", e);
        }

        #[allow(clippy::cast_precision_loss)]
        let (source_size, output_size) = (source_len as f64, encoded.len() as f64);
        info!(
            url = %UrlUtils::obfuscate_credentials(&params.url),
            width,
            quality,
            source_size = %format_memory(source_size),
            output_size = %format_memory(output_size),
            elapsed = %format_duration(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)),
            "Optimized image"
        );

        Ok(Bytes::from(encoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        errors::{DownloadError, ParamsError},
        services::traits::MockImageFetcher,
    };
    use async_trait::async_trait;
    use disk_cache_store::RetentionPolicy;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::{
        io::Cursor,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };
    use tracing_test::traced_test;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn png_bytes(width: u32, height: u32) -> Bytes {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200])));
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, ImageFormat::Png).unwrap();
        Bytes::from(buf.into_inner())
    }

    async fn store_in(dir: &std::path::Path) -> disk_cache_store::Result<DiskCacheStore> {
        DiskCacheStore::builder()
            .base_directory(dir)
            .retention(RetentionPolicy::new())
            .build()
            .await
    }

    /// Serves one PNG after a delay and counts calls.
    struct CountingFetcher {
        calls: AtomicUsize,
        delay: Duration,
        body: Bytes,
    }

    #[async_trait]
    impl ImageFetcher for CountingFetcher {
        async fn fetch(&self, _url: &str, _origin: &str) -> Result<Bytes, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.body.clone())
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let store = store_in(temp_dir.path()).await?;

        let mut fetcher = MockImageFetcher::new();
        let body = png_bytes(800, 600);
        fetcher
            .expect_fetch()
            .withf(|url, origin| url == "https://example.com/pic.png" && origin == "foo.com")
            .times(1)
            .returning(move |_, _| Ok(body.clone()));

        let optimizer = ImageOptimizer::new(store.clone(), Arc::new(fetcher));

        let first = optimizer
            .optimize_request("/w_200,q_70/example.com/pic.png", "foo.com")
            .await?;
        assert_eq!(first.cache_status, CacheStatus::Miss);
        assert_eq!(first.content_type, "image/jpeg");
        let decoded = image::load_from_memory(&first.bytes)?;
        assert_eq!((decoded.width(), decoded.height()), (200, 150));

        let second = optimizer
            .optimize_request("/w_200,q_70/example.com/pic.png", "foo.com")
            .await?;
        assert_eq!(second.cache_status, CacheStatus::Hit);
        assert_eq!(second.bytes, first.bytes);

        let key = CacheKey::derive("https://example.com/pic.png", 200, 70);
        assert_eq!(store.list_by_age().await?.len(), 1);
        assert_eq!(store.list_by_age().await?[0].key, key.as_str());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_params_never_fetch_or_store() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let store = store_in(temp_dir.path()).await?;

        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_fetch().never();
        let optimizer = ImageOptimizer::new(store.clone(), Arc::new(fetcher));

        let width = optimizer.optimize_request("/w_2001/example.com/a.png", "").await;
        assert!(matches!(
            width,
            Err(AppError::Parameter(ParamsError::WidthOutOfRange { .. }))
        ));

        let quality = optimizer.optimize_request("/w_100,q_0/example.com/a.png", "").await;
        assert!(matches!(
            quality,
            Err(AppError::Parameter(ParamsError::QualityOutOfRange { .. }))
        ));

        assert!(store.list_by_age().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_non_image_response_creates_no_entry() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let store = store_in(temp_dir.path()).await?;

        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_fetch().times(1).returning(|_, _| {
            Err(DownloadError::NotAnImage {
                content_type: "text/html".to_string(),
            })
        });
        let optimizer = ImageOptimizer::new(store.clone(), Arc::new(fetcher));

        let result = optimizer
            .optimize(&RequestParams::new("https://example.com/page", 300, 80))
            .await;
        assert!(matches!(
            result,
            Err(AppError::Download(DownloadError::NotAnImage { .. }))
        ));
        assert!(store.list_by_age().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_undecodable_source_is_a_decode_error() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let store = store_in(temp_dir.path()).await?;

        let mut fetcher = MockImageFetcher::new();
        fetcher
            .expect_fetch()
            .returning(|_, _| Ok(Bytes::from_static(b"GIF89a but not really")));
        let optimizer = ImageOptimizer::new(store.clone(), Arc::new(fetcher));

        let result = optimizer
            .optimize(&RequestParams::new("https://example.com/a.gif", 100, 80))
            .await;
        assert!(matches!(result, Err(AppError::Decode(_))));
        assert!(store.list_by_age().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_misses_fetch_once() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let store = store_in(temp_dir.path()).await?;

        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(100),
            body: png_bytes(320, 240),
        });
        let optimizer = Arc::new(ImageOptimizer::new(store, fetcher.clone()));
        let params = RequestParams::new("https://example.com/pic.png", 160, 85);

        let (a, b) = tokio::join!(optimizer.optimize(&params), optimizer.optimize(&params));
        let (a, b) = (a?, b?);

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(a.bytes, b.bytes);
        Ok(())
    }

    #[tokio::test]
    #[traced_test]
    async fn test_cache_write_failure_still_serves_image() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let cache_dir = temp_dir.path().join("cache");
        let store = store_in(&cache_dir).await?;
        std::fs::remove_dir_all(&cache_dir)?;

        let mut fetcher = MockImageFetcher::new();
        let body = png_bytes(100, 100);
        fetcher
            .expect_fetch()
            .times(1)
            .returning(move |_, _| Ok(body.clone()));
        let optimizer = ImageOptimizer::new(store, Arc::new(fetcher));

        let served = optimizer
            .optimize(&RequestParams::new("https://example.com/a.png", 50, 80))
            .await?;
        assert_eq!(served.cache_status, CacheStatus::Miss);
        assert!(!served.bytes.is_empty());
        assert!(logs_contain("Failed to save optimized image to cache"));
        Ok(())
    }

    #[tokio::test]
    async fn test_info_reports_dimensions() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let store = store_in(temp_dir.path()).await?;

        let mut fetcher = MockImageFetcher::new();
        let body = png_bytes(640, 360);
        fetcher
            .expect_fetch()
            .withf(|url, origin| url == "https://example.com/a.png" && origin.is_empty())
            .returning(move |_, _| Ok(body.clone()));
        let optimizer = ImageOptimizer::new(store.clone(), Arc::new(fetcher));

        let info = optimizer.info("example.com/a.png").await?;
        assert_eq!(
            info,
            ImageInfo {
                width: 640,
                height: 360,
                format: "png".to_string(),
            }
        );
        assert!(store.list_by_age().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_and_cleanup() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let store = store_in(temp_dir.path()).await?;
        store.store("entry", &vec![0u8; 1_048_576]).await?;

        let optimizer = ImageOptimizer::new(store, Arc::new(MockImageFetcher::new()));

        let stats = optimizer.stats().await;
        assert_eq!(stats.cache_size, "1.00 MB");
        assert_eq!(stats.cache_dir, temp_dir.path().display().to_string());

        assert_eq!(optimizer.cleanup_now().await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_stats_with_missing_directory_reports_unknown() -> TestResult {
        let temp_dir = tempfile::tempdir()?;
        let cache_dir = temp_dir.path().join("cache");
        let store = store_in(&cache_dir).await?;
        std::fs::remove_dir_all(&cache_dir)?;

        let optimizer = ImageOptimizer::new(store, Arc::new(MockImageFetcher::new()));

        let stats = optimizer.stats().await;
        assert_eq!(stats.cache_size, "unknown");
        assert_eq!(stats.cache_dir, cache_dir.display().to_string());
        Ok(())
    }
}
