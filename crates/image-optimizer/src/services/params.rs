//! Request path grammar.
//!
//! ```text
//! /[w_<width>[,q_<quality>]/]<url>
//! /[q_<quality>/]<url>
//! ```
//!
//! The URL part may be percent-encoded and may omit its scheme, in which case
//! `https://` is assumed. Examples:
//!
//! - `/w_300,q_80/example.com/pic.jpg`
//! - `/w_1200/https%3A%2F%2Fcdn.example.com%2Fa.png`
//! - `/example.com/pic.jpg` (width 400, quality 90)
//!
//! An options segment with nothing after it (`/w_300,q_80`) has no URL.

use regex::Regex;
use std::sync::OnceLock;

use crate::{
    errors::{ParamsError, ParamsResult},
    models::{DEFAULT_QUALITY, DEFAULT_WIDTH, MAX_QUALITY, MAX_WIDTH, RequestParams},
    utils::url::UrlUtils,
};

fn grammar() -> Option<&'static Regex> {
    static GRAMMAR: OnceLock<Option<Regex>> = OnceLock::new();
    GRAMMAR
        .get_or_init(|| Regex::new(r"^/?(?:(?:w_(\d+)(?:,q_(\d+))?|,?q_(\d+))(?:/|$))?(.*)$").ok())
        .as_ref()
}

/// Turns a raw request path plus origin into validated [`RequestParams`].
pub struct ParamsParser;

impl ParamsParser {
    /// Parse `raw_path` (everything after the image route prefix) and `origin`.
    ///
    /// # Errors
    /// - [`ParamsError::MissingPath`] when no URL follows the options
    /// - [`ParamsError::WidthOutOfRange`] / [`ParamsError::QualityOutOfRange`]
    /// - [`ParamsError::InvalidUrl`] when the URL cannot be decoded or has no host
    pub fn parse(raw_path: &str, origin: &str) -> ParamsResult<RequestParams> {
        let captures = grammar()
            .and_then(|re| re.captures(raw_path))
            .ok_or(ParamsError::MissingPath)?;

        let width = match captures.get(1) {
            Some(m) => bounded(m.as_str(), MAX_WIDTH).ok_or_else(|| {
                ParamsError::WidthOutOfRange {
                    value: m.as_str().to_string(),
                    min: 1,
                    max: MAX_WIDTH,
                }
            })?,
            None => DEFAULT_WIDTH,
        };

        let quality = match captures.get(2).or_else(|| captures.get(3)) {
            Some(m) => bounded(m.as_str(), MAX_QUALITY).ok_or_else(|| {
                ParamsError::QualityOutOfRange {
                    value: m.as_str().to_string(),
                    min: 1,
                    max: MAX_QUALITY,
                }
            })?,
            None => DEFAULT_QUALITY,
        };

        let raw_url = captures.get(4).map_or("", |m| m.as_str());
        let url = Self::resolve_url(raw_url)?;

        Ok(RequestParams {
            url,
            width,
            quality,
            origin: Self::clean_origin(origin),
        })
    }

    /// Percent-decode, add a scheme if missing, and require a host.
    ///
    /// # Errors
    /// Returns [`ParamsError::MissingPath`] for an empty URL and
    /// [`ParamsError::InvalidUrl`] otherwise.
    pub fn resolve_url(raw_url: &str) -> ParamsResult<String> {
        if raw_url.trim_matches('/').trim().is_empty() {
            return Err(ParamsError::MissingPath);
        }

        let decoded = urlencoding::decode(raw_url).map_err(|e| ParamsError::InvalidUrl {
            url: raw_url.to_string(),
            reason: format!("invalid percent-encoding: {e}"),
        })?;

        let candidate = UrlUtils::normalize_scheme(&decoded);
        let parsed = UrlUtils::parse_with_host(&candidate).map_err(|reason| {
            ParamsError::InvalidUrl {
                url: decoded.to_string(),
                reason,
            }
        })?;

        Ok(parsed.to_string())
    }

    /// Strip surrounding quote characters from an origin value.
    pub fn clean_origin(origin: &str) -> String {
        origin.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
    }
}

/// Parse a decimal option value and check it lies in `1..=max`.
fn bounded(digits: &str, max: u32) -> Option<u32> {
    digits
        .parse::<u32>()
        .ok()
        .filter(|value| (1..=max).contains(value))
}
