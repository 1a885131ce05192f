//! Application configuration
//!
//! Values are layered, later sources overriding earlier ones:
//!
//! 1. built-in defaults ([`defaults`])
//! 2. an optional TOML file (`config.toml` unless `--config` says otherwise)
//! 3. `IMAGE_OPTIMIZER_*` environment variables, nested with `__`
//!    (e.g. `IMAGE_OPTIMIZER_CACHE__TTL=12h`)
//! 4. the plain variables `PORT`, `CACHE_DIR`, `TIME_CACHE`, `MAX_CACHE_SIZE`
//!    and `API_TOKEN`
//! 5. command line flags (applied by the binary)

use disk_cache_store::RetentionPolicy;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::{cache_duration, duration, parse_cache_duration};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bearer token required on `/api/*`; unset means the API is open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    /// Entry lifetime, e.g. `30min`, `12h`, `7d`, `2w`, `3m`, `1y`
    #[serde(default = "default_cache_ttl", with = "cache_duration")]
    pub ttl: Duration,
    #[serde(default = "default_max_cache_size_mb")]
    pub max_size_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Overall timeout for one source image fetch
    #[serde(default = "default_download_timeout", with = "duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON log lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(DEFAULT_CACHE_DIR)
}

fn default_cache_ttl() -> Duration {
    DEFAULT_CACHE_TTL
}

fn default_max_cache_size_mb() -> u64 {
    DEFAULT_MAX_CACHE_SIZE_MB
}

fn default_download_timeout() -> Duration {
    Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS)
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_token: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            ttl: default_cache_ttl(),
            max_size_mb: default_max_cache_size_mb(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: default_download_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl WebConfig {
    /// # Errors
    /// Returns a configuration error when `host` is not an IP address.
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        let ip: IpAddr = self.host.parse().map_err(|e| {
            AppError::configuration(format!("invalid listen host '{}': {e}", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl CacheConfig {
    pub const fn max_size_bytes(&self) -> u64 {
        self.max_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new()
            .ttl(self.ttl)
            .max_size_bytes(self.max_size_bytes())
    }
}

impl Config {
    /// Load configuration from defaults, the TOML file, and the environment.
    ///
    /// A missing config file is not an error.
    ///
    /// # Errors
    /// Returns a configuration error when a source cannot be parsed or the
    /// merged result is invalid.
    pub fn load(config_file: Option<&Path>) -> AppResult<Self> {
        let file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if config_file.is_some() && !file.exists() {
            warn!("Config file {:?} not found, using defaults and environment", file);
        }

        let config: Self = Self::figment(file)
            .extract()
            .map_err(|e| AppError::configuration(e.to_string()))?;

        config
            .apply_legacy_env(|name| std::env::var(name).ok())
            .validate()
    }

    /// Provider stack for defaults, the TOML file and prefixed environment variables.
    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Apply the plain environment variable names used by earlier deployments.
    ///
    /// Unparsable `PORT`/`MAX_CACHE_SIZE` values are ignored with a warning;
    /// an unparsable `TIME_CACHE` falls back to one hour.
    #[must_use]
    pub fn apply_legacy_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.web.port = port,
                Err(e) => warn!("Ignoring invalid PORT '{}': {}", port, e),
            }
        }

        if let Some(dir) = lookup("CACHE_DIR") {
            if !dir.trim().is_empty() {
                self.cache.dir = PathBuf::from(dir.trim());
            }
        }

        if let Some(ttl) = lookup("TIME_CACHE") {
            self.cache.ttl = parse_cache_duration(&ttl);
        }

        if let Some(size) = lookup("MAX_CACHE_SIZE") {
            match size.trim().parse::<u64>() {
                Ok(mb) if mb > 0 => self.cache.max_size_mb = mb,
                _ => warn!("Ignoring invalid MAX_CACHE_SIZE '{}'", size),
            }
        }

        if let Some(token) = lookup("API_TOKEN") {
            let token = token.trim().to_string();
            self.web.api_token = if token.is_empty() { None } else { Some(token) };
        }

        self
    }

    /// # Errors
    /// Returns a configuration error describing the first invalid field.
    pub fn validate(self) -> AppResult<Self> {
        if self.cache.dir.as_os_str().is_empty() {
            return Err(AppError::configuration("cache.dir must not be empty"));
        }
        if self.cache.max_size_mb == 0 {
            return Err(AppError::configuration("cache.max_size_mb must be greater than 0"));
        }
        if self.upstream.timeout.is_zero() {
            return Err(AppError::configuration("upstream.timeout must be greater than 0"));
        }
        if let Some(token) = &self.web.api_token {
            if token.trim().is_empty() {
                return Err(AppError::configuration("web.api_token must not be blank"));
            }
        }
        self.web.socket_addr()?;
        Ok(self)
    }

    /// Render the configuration as TOML.
    ///
    /// # Errors
    /// Returns an internal error if serialization fails.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self).map_err(|e| AppError::internal(e.to_string()))
    }
}
