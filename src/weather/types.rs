//! Weather feed types for ecweather.

use chrono::{DateTime, Utc};
use url::Url;

/// Maximum feed size in bytes (5MB).
pub const MAX_FEED_SIZE: u64 = 5 * 1024 * 1024;

/// Default total request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Condition shown when a feed entry carries no usable text.
pub const UNKNOWN_CONDITION: &str = "Unknown";

/// Raw bytes of one feed fetch.
#[derive(Debug, Clone)]
pub struct RawFeed {
    /// Response body.
    pub bytes: Vec<u8>,
    /// When the body finished downloading.
    pub fetched_at: DateTime<Utc>,
}

impl RawFeed {
    /// Create a raw feed stamped with the current time.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// Current conditions parsed from one feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Human-readable condition (e.g., "Mostly Cloudy").
    pub condition: String,
    /// Temperature in degrees Celsius.
    pub temperature_celsius: Option<f64>,
    /// When the conditions were observed.
    pub observed_at: Option<DateTime<Utc>>,
    /// Link to the human-readable page. Always set.
    pub source_link: Url,
}

impl Report {
    /// Create a report with only the required fields.
    pub fn new(condition: impl Into<String>, source_link: Url) -> Self {
        Self {
            condition: condition.into(),
            temperature_celsius: None,
            observed_at: None,
            source_link,
        }
    }

    /// Set the temperature.
    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature_celsius = Some(celsius);
        self
    }

    /// Set the observation time.
    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = Some(observed_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_raw_feed_new() {
        let before = Utc::now();
        let raw = RawFeed::new("<rss/>");
        assert_eq!(raw.bytes, b"<rss/>");
        assert!(raw.fetched_at >= before);
    }

    #[test]
    fn test_report_builder() {
        let link = Url::parse("https://weather.gc.ca/").unwrap();
        let observed = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let report = Report::new("Snow", link.clone())
            .with_temperature(-4.5)
            .with_observed_at(observed);

        assert_eq!(report.condition, "Snow");
        assert_eq!(report.temperature_celsius, Some(-4.5));
        assert_eq!(report.observed_at, Some(observed));
        assert_eq!(report.source_link, link);
    }

    #[test]
    fn test_report_new_leaves_optionals_unset() {
        let report = Report::new("Clear", Url::parse("https://weather.gc.ca/").unwrap());
        assert!(report.temperature_celsius.is_none());
        assert!(report.observed_at.is_none());
    }
}
