//! Service layer
//!
//! Request parsing, source downloads, the image transform and the
//! orchestration that ties them to the disk cache. The web layer only talks
//! to [`ImageOptimizer`].

pub mod cache_key;
pub mod downloader;
pub mod image_optimizer;
pub mod in_flight;
pub mod params;
pub mod traits;
pub mod transform;

pub use cache_key::CacheKey;
pub use downloader::HttpImageDownloader;
pub use image_optimizer::ImageOptimizer;
pub use in_flight::InFlightRegistry;
pub use params::ParamsParser;
pub use traits::ImageFetcher;
pub use transform::TransformPipeline;
