//! Centralized error handling for the image optimizer
//!
//! # Error Categories
//!
//! - **Parameter Errors**: malformed path grammar, out-of-range width or quality, bad URLs
//! - **Download Errors**: timeouts, non-200 upstream status, non-image content
//! - **Transform Errors**: undecodable source bytes, JPEG encoder failures
//! - **Cache Errors**: surfaced only by explicit maintenance calls
//!
//! # Usage
//!
//! ```rust
//! use image_optimizer::errors::{AppError, AppResult, ParamsError};
//!
//! fn example_function(width: u32) -> AppResult<u32> {
//!     if width == 0 {
//!         return Err(AppError::from(ParamsError::MissingPath));
//!     }
//!     Ok(width)
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for parameter parsing Results
pub type ParamsResult<T> = Result<T, ParamsError>;

/// Convenience type alias for download Results
pub type DownloadResult<T> = Result<T, DownloadError>;

/// Convenience type alias for transform Results
pub type TransformResult<T> = Result<T, TransformError>;
