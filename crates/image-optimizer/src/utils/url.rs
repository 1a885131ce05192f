//! URL utilities for source image addresses

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Ensure a URL has an `http://` or `https://` prefix, defaulting to HTTPS.
    ///
    /// The scheme check is case-insensitive.
    ///
    /// ```rust
    /// use image_optimizer::utils::url::UrlUtils;
    ///
    /// assert_eq!(UrlUtils::normalize_scheme("example.com/a.png"), "https://example.com/a.png");
    /// assert_eq!(UrlUtils::normalize_scheme("http://example.com"), "http://example.com");
    /// assert_eq!(UrlUtils::normalize_scheme("HTTPS://example.com"), "HTTPS://example.com");
    /// ```
    pub fn normalize_scheme(url: &str) -> String {
        let trimmed = url.trim();
        let lower = trimmed.to_ascii_lowercase();

        if lower.starts_with("http://") || lower.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }

    /// Parse a URL and require an http(s) scheme with a non-empty host.
    ///
    /// # Errors
    /// Returns a human-readable reason when the URL does not parse, uses
    /// another scheme, or has no host.
    pub fn parse_with_host(url: &str) -> Result<Url, String> {
        let parsed = Url::parse(url).map_err(|e| e.to_string())?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme {:?}", parsed.scheme()));
        }
        match parsed.host_str() {
            Some(host) if !host.is_empty() => Ok(parsed),
            _ => Err("missing host".to_string()),
        }
    }

    /// Mask credentials in a URL before it is written to logs.
    ///
    /// Covers `user:pass@host` userinfo and common credential query parameters.
    pub fn obfuscate_credentials(url: &str) -> String {
        static SENSITIVE_QUERY: OnceLock<Option<Regex>> = OnceLock::new();

        let mut obfuscated = url.to_string();

        if let Ok(parsed) = Url::parse(url) {
            if !parsed.username().is_empty() || parsed.password().is_some() {
                let mut masked = parsed;
                let _ = masked.set_username("****");
                let _ = masked.set_password(Some("****"));
                obfuscated = masked.to_string();
            }
        }

        let pattern = SENSITIVE_QUERY.get_or_init(|| {
            Regex::new(r"(?i)([?&](?:username|password|user|pass|pwd|passwd|token|key|api_key)=)[^&]*")
                .ok()
        });
        if let Some(re) = pattern {
            obfuscated = re.replace_all(&obfuscated, "${1}****").to_string();
        }

        obfuscated
    }
}
