//! On-the-fly image optimization service.
//!
//! Fetches remote images, resizes them to a requested width, re-encodes them
//! as JPEG at a requested quality and keeps the results in a size-bounded,
//! time-expiring disk cache (see the `disk-cache-store` crate).

pub mod config;
pub mod errors;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;
pub mod web;
