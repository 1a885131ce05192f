/// Configuration default values
///
/// All default values for configuration options, kept in one place.
use std::time::Duration;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 4441;

// Cache defaults
pub const DEFAULT_CACHE_DIR: &str = "./cache/images";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MAX_CACHE_SIZE_MB: u64 = 1000;

// Upstream fetch defaults
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

// Logging defaults
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Config file / environment
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "IMAGE_OPTIMIZER_";
