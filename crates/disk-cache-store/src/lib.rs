//! # Disk Cache Store
//!
//! A flat-directory cache for opaque byte blobs with a time-to-live and a soft
//! size budget.
//!
//! Each entry is one file named after its key. The file modification time is
//! the only timestamp the store tracks: entries older than the TTL are treated
//! as absent (and removed lazily on lookup or by the background sweep), and
//! when a write would exceed the size budget the oldest entries are evicted
//! first. The budget is best effort: a write is never refused because of it.
//!
//! ## Features
//!
//! - **Atomic writes**: data goes to a hidden temp file and is renamed into place
//! - **Oldest-first eviction**: deterministic ordering by mtime, ties by key
//! - **Lazy expiry**: an expired entry found by `lookup` is deleted on the spot
//! - **Background sweep**: [`CleanupScheduler`] with a stoppable handle
//! - **Serialized writers**: one store-wide lock covers size check, eviction and write
//!
//! ## Basic Usage
//!
//! ```rust
//! use disk_cache_store::{CleanupScheduler, DiskCacheStore, RetentionPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = DiskCacheStore::builder()
//!     .base_directory("/var/cache/images")
//!     .retention(
//!         RetentionPolicy::new()
//!             .ttl(Duration::from_secs(24 * 60 * 60))
//!             .max_size_bytes(500 * 1024 * 1024),
//!     )
//!     .build()
//!     .await?;
//!
//! store.store("3f2a9c", b"jpeg bytes").await?;
//! let cached = store.lookup("3f2a9c").await?;
//!
//! let sweeper = CleanupScheduler::for_store(store.clone()).start();
//! // ...
//! sweeper.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod policy;
pub mod scheduler;
pub mod security;
pub mod store;

pub use error::{CacheError, Result};
pub use policy::RetentionPolicy;
pub use scheduler::{CleanupHandle, CleanupScheduler};
pub use store::{CacheEntry, DiskCacheStore, DiskCacheStoreBuilder, StoreOutcome};
