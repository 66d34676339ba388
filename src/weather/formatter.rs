//! Single-line rendering of weather reports.

use crate::config::DisplayConfig;
use crate::datetime::{format_utc_datetime, DEFAULT_TIME_FORMAT};
use crate::weather::types::Report;

/// Renders a [`Report`] as `"<condition>, <t>°C (as of <time>) — <link>"`.
///
/// Optional parts are left out when the report does not carry them.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    timezone: String,
    time_format: String,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl ReportFormatter {
    /// Create a formatter that shows observation times in `timezone`.
    pub fn new(timezone: impl Into<String>, time_format: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            time_format: time_format.into(),
        }
    }

    /// Create a formatter from the display section of the configuration.
    pub fn from_config(config: &DisplayConfig) -> Self {
        Self::new(&config.timezone, &config.time_format)
    }

    /// Format a report.
    pub fn format(&self, report: &Report) -> String {
        let mut line = report.condition.clone();

        if let Some(celsius) = report.temperature_celsius {
            // Avoid printing "-0.0°C".
            let celsius = if celsius == 0.0 { 0.0 } else { celsius };
            line.push_str(&format!(", {celsius:.1}°C"));
        }

        if let Some(observed_at) = &report.observed_at {
            let when = format_utc_datetime(observed_at, &self.timezone, &self.time_format);
            line.push_str(&format!(" (as of {when})"));
        }

        format!("{line} — {}", report.source_link)
    }
}
