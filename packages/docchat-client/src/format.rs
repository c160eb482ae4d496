//! Human-readable formatting for sizes, token counts and ratios.

const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count with base-1024 units, e.g. `1536 -> "1.5 KB"`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{} {}", trim_decimals(value), SIZE_UNITS[unit])
}

/// Format a token count with K/M suffixes, e.g. `1500 -> "1.5K"`.
pub fn format_token_count(tokens: u64) -> String {
    if tokens >= 1_000_000 {
        format!("{:.1}M", tokens as f64 / 1_000_000.0)
    } else if tokens >= 1_000 {
        format!("{:.1}K", tokens as f64 / 1_000.0)
    } else {
        tokens.to_string()
    }
}

/// Share of `limit` used, as a percentage capped at 100. A zero limit yields 0.
pub fn token_percentage(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    (used as f64 / limit as f64 * 100.0).min(100.0)
}

/// `42.27 -> "42.3%"`
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}%", value)
}

/// `0.25 -> "25.0%"`
pub fn format_ratio(ratio: f64) -> String {
    format_percentage(ratio * 100.0)
}

// Two decimals, trailing zeros dropped
fn trim_decimals(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
