//! Web handlers module
//!
//! Thin handlers that delegate to [`crate::services::ImageOptimizer`].

pub mod cache;
pub mod health;
pub mod images;
pub mod index;
pub mod info;
