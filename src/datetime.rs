//! Date/time utilities for ecweather.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Default display format for observation times.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M %Z";

/// Parse a feed timestamp.
///
/// RSS `pubDate` uses RFC 2822, Atom `updated`/`published` and `dc:date`
/// use RFC 3339. Returns `None` for anything else.
pub fn parse_feed_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check whether a timezone name is known.
pub fn is_valid_timezone(timezone: &str) -> bool {
    timezone.parse::<Tz>().is_ok()
}

/// Format a DateTime<Utc> in the specified timezone.
///
/// # Arguments
///
/// * `dt` - DateTime in UTC
/// * `timezone` - Timezone name (e.g., "America/Toronto", "UTC")
/// * `format` - Output format string (e.g., "%Y-%m-%d %H:%M")
///
/// Falls back to UTC when the timezone name is unknown.
pub fn format_utc_datetime(dt: &DateTime<Utc>, timezone: &str, format: &str) -> String {
    let tz: Tz = match timezone.parse() {
        Ok(tz) => tz,
        Err(_) => return dt.format(format).to_string(),
    };
    dt.with_timezone(&tz).format(format).to_string()
}
