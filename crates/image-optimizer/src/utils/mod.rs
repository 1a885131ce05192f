//! Utility modules for the image optimizer
//!
//! Reusable helpers shared by the services and the web layer.

pub mod human_format;
pub mod url;

pub use human_format::{format_duration, format_megabytes, format_memory};
pub use self::url::UrlUtils;
