pub mod optimization;

pub use optimization::{
    CacheStats, CacheStatus, ImageInfo, OptimizedImage, RequestParams, DEFAULT_QUALITY,
    DEFAULT_WIDTH, MAX_QUALITY, MAX_WIDTH, OUTPUT_CONTENT_TYPE,
};
