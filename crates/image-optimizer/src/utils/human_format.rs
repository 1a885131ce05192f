//! Human-readable formatting utilities for sizes and durations

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Formats a byte count with an adaptive unit, e.g. `1.50MB`.
pub fn format_memory(bytes: f64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0.0 {
        return "0B".to_string();
    }

    let mut size = bytes.abs();
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    let sign = if bytes < 0.0 { "-" } else { "" };

    if unit_index == 0 {
        format!("{sign}{size:.0}{}", UNITS[unit_index])
    } else if size >= 10.0 {
        format!("{sign}{size:.1}{}", UNITS[unit_index])
    } else {
        format!("{sign}{size:.2}{}", UNITS[unit_index])
    }
}

/// Formats a byte count as megabytes with two decimals, e.g. `12.34 MB`.
///
/// This is the fixed format reported by the cache stats endpoint.
#[allow(clippy::cast_precision_loss)]
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// Formats a duration in milliseconds, e.g. `1m30s`.
pub fn format_duration(millis: u64) -> String {
    if millis < 1000 {
        return format!("{millis}ms");
    }

    let total_seconds = millis / 1000;
    if total_seconds < 60 {
        #[allow(clippy::cast_precision_loss)]
        let seconds = millis as f64 / 1000.0;
        return format!("{seconds:.2}s");
    }

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if seconds > 0 {
        out.push_str(&format!("{seconds}s"));
    }
    out
}
