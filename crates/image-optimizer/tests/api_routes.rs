//! HTTP contract tests for the `/api` routes.
//!
//! Runs the real router against a tempdir-backed cache and an in-process
//! fetcher, so no network access is needed.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::Value;
use std::{
    collections::HashMap,
    io::Cursor,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, SystemTime},
};
use tempfile::TempDir;

use disk_cache_store::{DiskCacheStore, RetentionPolicy};
use image_optimizer::{
    errors::{DownloadError, DownloadResult},
    services::{ImageFetcher, ImageOptimizer},
    web::{AppState, create_router},
};

/// Serves canned responses by URL and records what it was asked for.
#[derive(Default)]
struct FakeFetcher {
    responses: HashMap<String, DownloadResult<Bytes>>,
    calls: AtomicUsize,
    origins: Mutex<Vec<String>>,
}

impl FakeFetcher {
    fn with(mut self, url: &str, response: DownloadResult<Bytes>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str, origin: &str) -> DownloadResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.origins.lock().unwrap().push(origin.to_string());
        self.responses
            .get(url)
            .cloned()
            .unwrap_or(Err(DownloadError::Status { status: 404 }))
    }
}

fn png(width: u32, height: u32) -> Bytes {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30])));
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    Bytes::from(buf.into_inner())
}

struct Harness {
    server: TestServer,
    fetcher: Arc<FakeFetcher>,
    store: DiskCacheStore,
    _cache_dir: TempDir,
}

async fn harness(fetcher: FakeFetcher, api_token: Option<&str>) -> Harness {
    let cache_dir = tempfile::tempdir().unwrap();
    let store = DiskCacheStore::builder()
        .base_directory(cache_dir.path())
        .retention(RetentionPolicy::new().ttl(Duration::from_secs(3600)))
        .build()
        .await
        .unwrap();

    let fetcher = Arc::new(fetcher);
    let optimizer = Arc::new(ImageOptimizer::new(store.clone(), fetcher.clone()));
    let app = create_router(AppState::new(optimizer, api_token));

    Harness {
        server: TestServer::new(app).unwrap(),
        fetcher,
        store,
        _cache_dir: cache_dir,
    }
}

#[tokio::test]
async fn test_index_banner() {
    let h = harness(FakeFetcher::default(), None).await;

    let response = h.server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains("/w_400,q_90/"));
}

#[tokio::test]
async fn test_health() {
    let h = harness(FakeFetcher::default(), None).await;

    let response = h.server.get("/api/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "image-optimizer");
}

#[tokio::test]
async fn test_image_miss_then_hit() {
    let fetcher = FakeFetcher::default().with("https://example.com/pic.png", Ok(png(800, 400)));
    let h = harness(fetcher, None).await;

    let first = h
        .server
        .get("/api/image/w_300,q_80/example.com/pic.png")
        .add_query_param("origin", "\"foo.com\"")
        .await;
    first.assert_status_ok();
    assert_eq!(first.header("content-type"), "image/jpeg");
    assert_eq!(first.header("cache-control"), "public, max-age=31536000");
    assert_eq!(first.header("x-cache"), "MISS");

    let decoded = image::load_from_memory(first.as_bytes()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 150));
    assert_eq!(h.fetcher.origins.lock().unwrap().as_slice(), ["foo.com"]);

    let second = h.server.get("/api/image/w_300,q_80/example.com/pic.png").await;
    second.assert_status_ok();
    assert_eq!(second.header("x-cache"), "HIT");
    assert_eq!(second.as_bytes(), first.as_bytes());
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_image_defaults_apply_without_options() {
    let fetcher = FakeFetcher::default().with("https://example.com/wide.png", Ok(png(1000, 500)));
    let h = harness(fetcher, None).await;

    let response = h.server.get("/api/image/example.com/wide.png").await;
    response.assert_status_ok();

    let decoded = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 200));
}

#[tokio::test]
async fn test_image_rejects_out_of_range_options() {
    let h = harness(FakeFetcher::default(), None).await;

    for path in [
        "/api/image/w_2001/example.com/a.png",
        "/api/image/w_0/example.com/a.png",
        "/api/image/w_100,q_0/example.com/a.png",
        "/api/image/w_100,q_101/example.com/a.png",
    ] {
        let response = h.server.get(path).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false, "{path}");
        assert!(body["error"].as_str().is_some(), "{path}");
    }

    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.list_by_age().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_image_missing_url_is_bad_request() {
    let h = harness(FakeFetcher::default(), None).await;

    h.server
        .get("/api/image/w_100,q_80/")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    h.server
        .get("/api/image/w_300,q_80")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    h.server
        .get("/api/image/w_300")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upstream_failures_map_to_bad_gateway() {
    let fetcher = FakeFetcher::default().with(
        "https://example.com/page",
        Err(DownloadError::NotAnImage {
            content_type: "text/html".to_string(),
        }),
    );
    let h = harness(fetcher, None).await;

    h.server
        .get("/api/image/example.com/page")
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    h.server
        .get("/api/image/example.com/missing.png")
        .await
        .assert_status(StatusCode::BAD_GATEWAY);

    assert!(h.store.list_by_age().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_image_is_server_error() {
    let fetcher = FakeFetcher::default().with(
        "https://example.com/broken.png",
        Ok(Bytes::from_static(b"\x89PNG\r\n\x1a\nnot really")),
    );
    let h = harness(fetcher, None).await;

    h.server
        .get("/api/image/example.com/broken.png")
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_extreme_aspect_ratio_is_server_error() {
    let fetcher = FakeFetcher::default().with("https://example.com/tall.png", Ok(png(1, 5000)));
    let h = harness(fetcher, None).await;

    let response = h.server.get("/api/image/w_2000/example.com/tall.png").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(h.store.list_by_age().await.unwrap().is_empty());

    // The same source is fine at a width that keeps the output small
    h.server
        .get("/api/image/w_2/example.com/tall.png")
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_info() {
    let fetcher = FakeFetcher::default().with("https://example.com/pic.png", Ok(png(123, 45)));
    let h = harness(fetcher, None).await;

    let response = h
        .server
        .get("/api/info")
        .add_query_param("url", "https://example.com/pic.png")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["width"], 123);
    assert_eq!(body["height"], 45);
    assert_eq!(body["format"], "png");

    h.server
        .get("/api/info")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert!(h.store.list_by_age().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cache_stats() {
    let fetcher = FakeFetcher::default().with("https://example.com/pic.png", Ok(png(64, 64)));
    let h = harness(fetcher, None).await;

    let empty: Value = h.server.get("/api/cache/stats").await.json();
    assert_eq!(empty["cache_size"], "0.00 MB");
    assert_eq!(
        empty["cache_dir"].as_str(),
        Some(h.store.base_dir().display().to_string().as_str())
    );

    h.server
        .get("/api/image/w_64/example.com/pic.png")
        .await
        .assert_status_ok();
    assert_eq!(h.store.list_by_age().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cleanup_removes_expired_entries() {
    let h = harness(FakeFetcher::default(), None).await;

    h.store.store("stale", b"old bytes").await.unwrap();
    h.store.store("fresh", b"new bytes").await.unwrap();
    let stale = h.store.entry_path("stale").unwrap();
    std::fs::File::options()
        .write(true)
        .open(&stale)
        .unwrap()
        .set_modified(SystemTime::now() - Duration::from_secs(7200))
        .unwrap();

    let response = h.server.post("/api/cache/cleanup").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["removed"], 1);

    let keys: Vec<_> = h
        .store
        .list_by_age()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    assert_eq!(keys, ["fresh"]);
}

#[tokio::test]
async fn test_bearer_auth_when_token_configured() {
    let h = harness(FakeFetcher::default(), Some("s3cret")).await;

    h.server
        .get("/api/health")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    h.server
        .get("/api/health")
        .authorization_bearer("wrong")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let rejected: Value = h.server.get("/api/cache/stats").await.json();
    assert_eq!(rejected["success"], false);

    h.server
        .get("/api/health")
        .authorization_bearer("s3cret")
        .await
        .assert_status_ok();

    // The banner is outside /api
    h.server.get("/").await.assert_status_ok();
}

#[tokio::test]
async fn test_blank_token_disables_auth() {
    let h = harness(FakeFetcher::default(), Some("  ")).await;

    h.server.get("/api/health").await.assert_status_ok();
}
