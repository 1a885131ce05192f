//! Query string parameters

use serde::Deserialize;

/// `?origin=` on the image route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OriginQuery {
    #[serde(default)]
    pub origin: Option<String>,
}

impl OriginQuery {
    pub fn origin(&self) -> &str {
        self.origin.as_deref().unwrap_or_default()
    }
}

/// `?url=` on the info route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfoQuery {
    #[serde(default)]
    pub url: Option<String>,
}

impl InfoQuery {
    /// The requested URL, `None` when absent or blank.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_url_is_missing() {
        let query = InfoQuery {
            url: Some("  ".to_string()),
        };
        assert_eq!(query.url(), None);
        assert_eq!(InfoQuery::default().url(), None);
    }

    #[test]
    fn test_missing_origin_is_empty() {
        assert_eq!(OriginQuery::default().origin(), "");
    }
}
