/// Display formatting shared by the web views and the terminal output.
///
/// All timestamps are shown in Indian Standard Time (UTC+05:30) regardless
/// of the host timezone. Backend timestamps without an offset are treated
/// as UTC.
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

/// Placeholder for a missing timestamp.
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder for a stats-dependent field with no samples.
pub const NO_DATA: &str = "No data";

const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The fixed display timezone.
pub fn ist() -> FixedOffset {
    // 05:30 is always within the valid offset range.
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse a backend timestamp.
///
/// Accepts RFC 3339 (with offset) and naive ISO-8601 with either a `T` or a
/// space separator and optional fractional seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `dd/mm/yyyy, hh:mm:ss am` in IST, `N/A` when absent.
///
/// Unparseable input is returned unchanged; callers route it through the
/// view escaping like any other text.
pub fn format_datetime(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    match parse_timestamp(raw) {
        Some(dt) => dt
            .with_timezone(&ist())
            .format("%d/%m/%Y, %I:%M:%S %P")
            .to_string(),
        None => raw.to_string(),
    }
}

/// `hh:mm am` in IST, used for chart labels.
pub fn format_time(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };
    match parse_timestamp(raw) {
        Some(dt) => dt.with_timezone(&ist()).format("%I:%M %P").to_string(),
        None => raw.to_string(),
    }
}

/// Current time in IST, for "Generated:" labels.
pub fn now_ist() -> String {
    Utc::now()
        .with_timezone(&ist())
        .format("%d/%m/%Y, %I:%M:%S %P")
        .to_string()
}

/// Compact uptime: `1d 1h 1m`.
///
/// Zero (or negative, or non-finite) seconds render as `0s`; anything under
/// a minute renders as `0m`. Seconds are never shown otherwise.
pub fn format_uptime(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0s".to_string();
    }
    let secs = seconds.floor() as u64;
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3600;
    let minutes = (secs % 3600) / 60;

    let mut parts = Vec::with_capacity(3);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }

    if parts.is_empty() {
        "0m".to_string()
    } else {
        parts.join(" ")
    }
}

/// One-decimal percentage, e.g. `42.5%`.
pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}%")
    } else {
        NO_DATA.to_string()
    }
}

/// Percentage or `No data`.
pub fn format_percent_opt(value: Option<f64>) -> String {
    value.map_or_else(|| NO_DATA.to_string(), format_percent)
}
