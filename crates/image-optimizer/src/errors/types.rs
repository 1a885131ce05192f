//! Error type definitions for the image optimizer
//!
//! Every error that can come out of an optimize call is `Clone`: when several
//! requests wait on the same in-flight transformation they all receive a copy
//! of the one outcome.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The request path or query could not be turned into valid parameters
    #[error("Invalid request parameters: {0}")]
    Parameter(#[from] ParamsError),

    /// The source image could not be fetched
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// The fetched bytes could not be decoded as an image
    #[error("Decode failed: {0}")]
    Decode(String),

    /// The resized image could not be encoded
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Cache maintenance failed (never raised by the serving path)
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<TransformError> for AppError {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Decode { .. } | TransformError::OutputTooLarge { .. } => {
                Self::Decode(err.to_string())
            }
            TransformError::Encode { .. } => Self::Encode(err.to_string()),
        }
    }
}

impl From<disk_cache_store::CacheError> for AppError {
    fn from(err: disk_cache_store::CacheError) -> Self {
        Self::Cache {
            message: err.to_string(),
        }
    }
}

/// Request path and query parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamsError {
    #[error("no image URL in request path")]
    MissingPath,

    #[error("invalid image URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("width must be between {min} and {max} pixels (got {value})")]
    WidthOutOfRange { value: String, min: u32, max: u32 },

    #[error("quality must be between {min} and {max} (got {value})")]
    QualityOutOfRange { value: String, min: u32, max: u32 },
}

/// Source image fetch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("upstream responded with status {status}")]
    Status { status: u16 },

    #[error("URL does not point to an image (content type {content_type:?})")]
    NotAnImage { content_type: String },

    #[error("invalid source URL: {message}")]
    InvalidUrl { message: String },

    #[error("transport error: {message}")]
    Transport { message: String },
}

/// Image decode/encode errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("cannot decode {format} image: {message}")]
    Decode { format: String, message: String },

    #[error("cannot encode JPEG: {message}")]
    Encode { message: String },

    /// The source aspect ratio would produce an output taller than allowed.
    #[error("output of {width}x{height} exceeds the maximum height of {max_height}")]
    OutputTooLarge {
        width: u32,
        height: u32,
        max_height: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_errors_map_to_app_errors() {
        let decode = TransformError::Decode {
            format: "png".to_string(),
            message: "truncated".to_string(),
        };
        assert!(matches!(AppError::from(decode), AppError::Decode(msg) if msg.contains("png")));

        let encode = TransformError::Encode {
            message: "boom".to_string(),
        };
        assert!(matches!(AppError::from(encode), AppError::Encode(_)));

        let too_tall = TransformError::OutputTooLarge {
            width: 2000,
            height: 40_000_000,
            max_height: 20_000,
        };
        assert!(matches!(AppError::from(too_tall), AppError::Decode(msg) if msg.contains("40000000")));
    }

    #[test]
    fn test_range_errors_name_bound_and_value() {
        let err = ParamsError::WidthOutOfRange {
            value: "2001".to_string(),
            min: 1,
            max: 2000,
        };
        let message = err.to_string();
        assert!(message.contains("2000"));
        assert!(message.contains("2001"));
    }
}
