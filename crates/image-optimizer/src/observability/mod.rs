//! Logging setup
//!
//! Structured logs through `tracing`. The filter defaults to the configured
//! level for this crate and the cache store, and `RUST_LOG` overrides it.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_filter(level: &str) -> String {
    if level == "trace" {
        format!("image_optimizer={level},disk_cache_store={level},tower_http=trace")
    } else {
        format!("image_optimizer={level},disk_cache_store={level}")
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Fails if a global subscriber was already installed.
pub fn init_tracing(level: &str, json: bool) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("debug"),
            "image_optimizer=debug,disk_cache_store=debug"
        );
        assert!(default_filter("trace").contains("tower_http=trace"));
    }
}
