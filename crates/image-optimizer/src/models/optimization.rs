use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: u32 = 400;
pub const DEFAULT_QUALITY: u32 = 90;
pub const MAX_WIDTH: u32 = 2000;
pub const MAX_QUALITY: u32 = 100;

/// Every optimized image is re-encoded as JPEG.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// A validated optimization request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestParams {
    /// Absolute http(s) URL with a non-empty host
    pub url: String,
    /// Target width in pixels, `1..=MAX_WIDTH`
    pub width: u32,
    /// JPEG quality, `1..=MAX_QUALITY`
    pub quality: u32,
    /// Value sent upstream as `Referer`/`Origin`; empty means "don't send"
    pub origin: String,
}

impl RequestParams {
    pub fn new<U: Into<String>>(url: U, width: u32, quality: u32) -> Self {
        Self {
            url: url.into(),
            width,
            quality,
            origin: String::new(),
        }
    }
}

/// Whether a response was served from the disk cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// Result of a successful optimize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizedImage {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub cache_status: CacheStatus,
}

/// Dimensions and detected format of a source image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

/// Human-readable cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Total entry size formatted as `"<n.nn> MB"`
    pub cache_size: String,
    pub cache_dir: String,
}
