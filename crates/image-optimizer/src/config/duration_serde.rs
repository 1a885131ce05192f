//! Cache lifetime strings such as `30min`, `12h`, `7d`, `2w`, `3m` (months) and `1y`.
//!
//! The grammar is a run of digits followed by one unit. Anything else,
//! including an empty string or a zero value, falls back to one hour so a
//! typo in the environment never disables caching.

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::{fmt, time::Duration};

use super::defaults::DEFAULT_CACHE_TTL;

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

/// Parse a cache lifetime, returning `None` when the text does not match the grammar.
pub fn try_parse_cache_duration(value: &str) -> Option<Duration> {
    let value = value.trim().to_ascii_lowercase();
    let split = value.find(|c: char| !c.is_ascii_digit())?;
    let (digits, unit) = value.split_at(split);

    let count: u64 = digits.parse().ok()?;
    if count == 0 {
        return None;
    }

    let unit_secs = match unit {
        "min" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        "w" => 7 * DAY,
        "m" => 30 * DAY,
        "y" => 365 * DAY,
        _ => return None,
    };

    count.checked_mul(unit_secs).map(Duration::from_secs)
}

/// Parse a cache lifetime, falling back to the one hour default.
pub fn parse_cache_duration(value: &str) -> Duration {
    try_parse_cache_duration(value).unwrap_or(DEFAULT_CACHE_TTL)
}

/// Render a duration in the same grammar, using the largest exact unit.
///
/// Durations that are not a whole number of minutes are rounded down
/// (to at least one minute).
pub fn format_cache_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    for (unit_secs, suffix) in [(365 * DAY, "y"), (7 * DAY, "w"), (DAY, "d"), (HOUR, "h")] {
        if secs >= unit_secs && secs % unit_secs == 0 {
            return format!("{}{suffix}", secs / unit_secs);
        }
    }
    format!("{}min", (secs / MINUTE).max(1))
}

/// Serde functions for general durations as whole seconds or humantime strings (`30s`, `1m 30s`)
pub mod duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration_str = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&duration_str)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a duration as seconds (number) or human-readable string (e.g., '30s', '1m 30s')")
            }

            fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(Duration::from_secs(seconds))
            }

            fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(seconds)
                    .map(Duration::from_secs)
                    .map_err(|_| de::Error::custom(format!("Invalid duration: {seconds} is negative")))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                humantime::parse_duration(value)
                    .map_err(|e| de::Error::custom(format!("Invalid duration '{value}': {e}")))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

/// Serde functions for cache lifetimes given as grammar strings or whole seconds
pub mod cache_duration {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_cache_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CacheDurationVisitor;

        impl Visitor<'_> for CacheDurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a cache lifetime as seconds (number) or a string such as '30min', '12h', '7d', '2w', '3m', '1y'")
            }

            fn visit_u64<E>(self, seconds: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if seconds == 0 {
                    Ok(DEFAULT_CACHE_TTL)
                } else {
                    Ok(Duration::from_secs(seconds))
                }
            }

            fn visit_i64<E>(self, seconds: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match u64::try_from(seconds) {
                    Ok(seconds) => self.visit_u64(seconds),
                    Err(_) => Ok(DEFAULT_CACHE_TTL),
                }
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let parsed = try_parse_cache_duration(value);
                if parsed.is_none() {
                    tracing::warn!(
                        "Invalid cache duration '{}', falling back to {}",
                        value,
                        format_cache_duration(DEFAULT_CACHE_TTL)
                    );
                }
                Ok(parsed.unwrap_or(DEFAULT_CACHE_TTL))
            }
        }

        deserializer.deserialize_any(CacheDurationVisitor)
    }
}
