//! Key validation and directory permissions.

use crate::error::{CacheError, Result};
use std::path::Path;

/// Sets owner-only permissions on the cache directory (Unix only).
pub async fn set_secure_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        tokio::fs::set_permissions(path, perms)
            .await
            .map_err(|_e| CacheError::Permission {
                operation: "set secure permissions".to_string(),
                path: path.to_path_buf(),
            })?;
    }

    #[cfg(not(unix))]
    {
        if !path.exists() {
            return Err(CacheError::Configuration {
                message: format!("cache directory {} does not exist", path.display()),
            });
        }
    }

    Ok(())
}

/// Validates that a key can be used verbatim as a file name in the cache directory.
///
/// Keys must be non-empty, must not start with `.` (reserved for temp files),
/// and may not contain path separators or null bytes.
pub fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key.starts_with('.') {
        Some("key starts with '.'")
    } else if key.contains(['/', '\\']) {
        Some("key contains a path separator")
    } else if key.contains('\0') {
        Some("key contains null bytes")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(CacheError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}
