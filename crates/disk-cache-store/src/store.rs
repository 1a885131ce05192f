//! Flat-directory cache store.
//!
//! Every entry is a single file `<key>.<extension>` directly under the base
//! directory. The file modification time is the only timestamp: it decides
//! expiry and it orders eviction. Writes land in a hidden temp file first and
//! are renamed into place, so readers never see a partially written entry.

use crate::{
    error::{CacheError, Result},
    policy::RetentionPolicy,
    security::{set_secure_permissions, validate_key},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::Mutex};
use uuid::Uuid;

const DEFAULT_EXTENSION: &str = "jpg";
const TEMP_SUFFIX: &str = ".tmp";

/// A file currently held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    pub key: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// What a call to [`DiskCacheStore::store`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    /// Keys removed to make room, oldest first
    pub evicted: Vec<String>,
    pub bytes_written: u64,
}

/// One pass over the cache directory.
#[derive(Debug, Default)]
struct DirectoryScan {
    entries: Vec<CacheEntry>,
    temp_files: Vec<(PathBuf, DateTime<Utc>)>,
}

/// Size- and age-bounded cache of opaque byte blobs keyed by file-name-safe strings.
#[derive(Clone, Debug)]
pub struct DiskCacheStore {
    base_dir: PathBuf,
    extension: String,
    policy: RetentionPolicy,
    write_lock: Arc<Mutex<()>>,
}

impl DiskCacheStore {
    /// Create a new builder for configuring the store.
    #[must_use]
    pub fn builder() -> DiskCacheStoreBuilder {
        DiskCacheStoreBuilder::new()
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[must_use]
    pub const fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Full path of the entry file for `key`.
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidKey`] when the key is not a plain file name.
    pub fn entry_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_dir.join(format!("{key}.{}", self.extension)))
    }

    /// Read the entry for `key` if it exists and has not expired.
    ///
    /// An expired entry is deleted on the spot and reported as a miss, unless a
    /// concurrent [`store`](Self::store) has already replaced it. A file that
    /// disappears between the existence check and the read is also a miss.
    ///
    /// # Errors
    /// Returns an error for invalid keys and for I/O failures other than a missing file.
    pub async fn lookup(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(key)?;

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let modified: DateTime<Utc> = metadata.modified()?.into();
        if self.policy.is_expired(modified) && self.remove_if_still_expired(key, &path).await? {
            return Ok(None);
        }

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `data` under `key`, evicting the oldest entries first if the
    /// write would push the directory over its size budget.
    ///
    /// The write happens even when eviction cannot free enough space.
    ///
    /// # Errors
    /// Returns an error for invalid keys, when the directory cannot be listed,
    /// or when the temp file cannot be written or renamed.
    pub async fn store(&self, key: &str, data: &[u8]) -> Result<StoreOutcome> {
        let path = self.entry_path(key)?;
        let incoming = data.len() as u64;

        let _guard = self.write_lock.lock().await;

        let evicted = self.make_room(key, incoming).await?;
        self.write_atomic(key, &path, data).await?;

        tracing::debug!(
            key = %key,
            bytes = incoming,
            evicted = evicted.len(),
            "Stored cache entry"
        );

        Ok(StoreOutcome {
            evicted,
            bytes_written: incoming,
        })
    }

    /// Summed size of all entries, by full enumeration.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    pub async fn size(&self) -> Result<u64> {
        let scan = self.scan().await?;
        Ok(scan.entries.iter().map(|e| e.size_bytes).sum())
    }

    /// Entries ordered oldest first; ties are ordered by key.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    pub async fn list_by_age(&self) -> Result<Vec<CacheEntry>> {
        let mut entries = self.scan().await?.entries;
        sort_by_age(&mut entries);
        Ok(entries)
    }

    /// Delete every expired entry, plus abandoned temp files older than the TTL.
    ///
    /// Returns the number of entries removed. Individual removal failures are
    /// logged and skipped.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let scan = self.scan().await?;
        let mut removed = 0;

        for entry in scan
            .entries
            .iter()
            .filter(|e| self.policy.is_expired_at(e.modified, now))
        {
            match remove_if_present(&entry.path).await {
                Ok(true) => {
                    tracing::debug!(key = %entry.key, "Removed expired cache entry");
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to remove expired cache entry {:?}: {}", entry.path, e);
                }
            }
        }

        for (path, modified) in &scan.temp_files {
            if self.policy.is_expired_at(*modified, now) {
                if let Err(e) = remove_if_present(path).await {
                    tracing::warn!("Failed to remove stale temp file {:?}: {}", path, e);
                }
            }
        }

        if removed > 0 {
            tracing::info!("Swept {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Delete an entry seen as expired, re-checking its age under the write
    /// lock. Returns `false` when a fresh file has been renamed into place
    /// since, in which case nothing is removed.
    async fn remove_if_still_expired(&self, key: &str, path: &Path) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let modified: DateTime<Utc> = match fs::metadata(path).await {
            Ok(metadata) => metadata.modified()?.into(),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
            Err(e) => return Err(e.into()),
        };
        if !self.policy.is_expired(modified) {
            return Ok(false);
        }

        if remove_if_present(path).await? {
            tracing::debug!(key = %key, modified = %modified, "Removed expired cache entry on lookup");
        }
        Ok(true)
    }

    /// Evict oldest entries (other than `key` itself, which is about to be
    /// replaced) until `incoming` more bytes fit or nothing is left to evict.
    async fn make_room(&self, key: &str, incoming: u64) -> Result<Vec<String>> {
        let mut candidates: Vec<CacheEntry> = self
            .scan()
            .await?
            .entries
            .into_iter()
            .filter(|e| e.key != key)
            .collect();
        sort_by_age(&mut candidates);

        let mut current: u64 = candidates.iter().map(|e| e.size_bytes).sum();
        let mut evicted = Vec::new();

        for entry in &candidates {
            if self.policy.fits(current, incoming) {
                break;
            }
            match remove_if_present(&entry.path).await {
                Ok(_) => {
                    current = current.saturating_sub(entry.size_bytes);
                    evicted.push(entry.key.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to evict cache entry {:?}: {}", entry.path, e);
                }
            }
        }

        if !evicted.is_empty() {
            tracing::info!(
                count = evicted.len(),
                remaining_bytes = current,
                "Evicted oldest cache entries to stay within budget"
            );
        }
        if !self.policy.fits(current, incoming) {
            tracing::warn!(
                key = %key,
                current_bytes = current,
                incoming_bytes = incoming,
                max_bytes = self.policy.max_size_bytes,
                "Cache budget exceeded after eviction, writing anyway"
            );
        }

        Ok(evicted)
    }

    async fn write_atomic(&self, key: &str, path: &Path, data: &[u8]) -> Result<()> {
        let temp_path = self
            .base_dir
            .join(format!(".{key}.{}{TEMP_SUFFIX}", Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = remove_if_present(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = remove_if_present(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn scan(&self) -> Result<DirectoryScan> {
        let mut dir = fs::read_dir(&self.base_dir).await?;
        let suffix = format!(".{}", self.extension);
        let mut scan = DirectoryScan::default();

        while let Some(dir_entry) = dir.next_entry().await? {
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            let metadata = match dir_entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            if !metadata.is_file() {
                continue;
            }
            let modified: DateTime<Utc> = metadata.modified()?.into();

            if name.starts_with('.') {
                if name.ends_with(TEMP_SUFFIX) {
                    scan.temp_files.push((dir_entry.path(), modified));
                }
                continue;
            }

            if let Some(key) = name.strip_suffix(&suffix) {
                scan.entries.push(CacheEntry {
                    key: key.to_string(),
                    path: dir_entry.path(),
                    size_bytes: metadata.len(),
                    modified,
                });
            }
        }

        Ok(scan)
    }
}

fn sort_by_age(entries: &mut [CacheEntry]) {
    entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.key.cmp(&b.key)));
}

/// Remove a file, treating "already gone" as success. Returns whether a file was removed.
async fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(CacheError::Io(e)),
    }
}

/// Builder for configuring a [`DiskCacheStore`].
pub struct DiskCacheStoreBuilder {
    base_directory: Option<PathBuf>,
    policy: RetentionPolicy,
    extension: String,
}

impl DiskCacheStoreBuilder {
    fn new() -> Self {
        Self {
            base_directory: None,
            policy: RetentionPolicy::default(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Set the directory holding the entries.
    #[must_use]
    pub fn base_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.base_directory = Some(path.into());
        self
    }

    /// Set the TTL and size budget.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the file extension used for entries (default `jpg`).
    #[must_use]
    pub fn extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    /// Build the store, creating the base directory if needed.
    ///
    /// # Errors
    /// Returns an error if:
    /// - Base directory is not set or the extension is empty
    /// - Base directory cannot be created or secured
    pub async fn build(self) -> Result<DiskCacheStore> {
        let base_dir = self
            .base_directory
            .ok_or_else(|| CacheError::Configuration {
                message: "Base directory is required".to_string(),
            })?;

        let extension = self.extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            return Err(CacheError::Configuration {
                message: "Entry extension must not be empty".to_string(),
            });
        }

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| CacheError::DirectoryCreation {
                path: base_dir.clone(),
                source: e,
            })?;

        set_secure_permissions(&base_dir).await?;

        let store = DiskCacheStore {
            base_dir,
            extension,
            policy: self.policy,
            write_lock: Arc::new(Mutex::new(())),
        };

        let existing = store.scan().await?.entries;
        tracing::info!(
            "DiskCacheStore initialized - base_dir: {:?}, ttl: {:?}, max_size_bytes: {}, existing_entries: {}",
            store.base_dir,
            store.policy.ttl,
            store.policy.max_size_bytes,
            existing.len()
        );

        Ok(store)
    }
}
