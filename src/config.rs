//! Configuration module for ecweather.

use serde::Deserialize;
use std::path::Path;

use crate::datetime::{is_valid_timezone, DEFAULT_TIME_FORMAT};
use crate::weather::source::{parse_feed_url, parse_page_link};
use crate::weather::types::{DEFAULT_TIMEOUT_SECS, MAX_FEED_SIZE};
use crate::{Result, WeatherError};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; stderr is always written.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// HTTP fetch configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_total_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    MAX_FEED_SIZE
}

fn default_user_agent() -> String {
    format!("ecweather/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            user_agent: default_user_agent(),
        }
    }
}

/// Report display configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Timezone for observation times (e.g., "America/Toronto", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// strftime format for observation times.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            time_format: default_time_format(),
        }
    }
}

/// Polling schedule configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between polls. 0 runs a single poll and exits.
    #[serde(default)]
    pub interval_secs: u64,
}

/// One weather feed to query.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Region code (e.g., "on-118").
    pub region_code: String,
    /// Feed URL.
    pub feed_url: String,
    /// Human-readable page for the region.
    pub page_link: String,
}

impl SourceConfig {
    /// Create a new source entry.
    pub fn new(
        region_code: impl Into<String>,
        feed_url: impl Into<String>,
        page_link: impl Into<String>,
    ) -> Self {
        Self {
            region_code: region_code.into(),
            feed_url: feed_url.into(),
            page_link: page_link.into(),
        }
    }

    /// The Ottawa (Kanata - Orléans) city feed.
    pub fn ottawa() -> Self {
        Self::new(
            "on-118",
            "https://weather.gc.ca/rss/city/on-118_e.xml",
            "https://weather.gc.ca/city/pages/on-118_metric_e.html",
        )
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![SourceConfig::ottawa()]
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// HTTP fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Display configuration.
    #[serde(default)]
    pub display: DisplayConfig,
    /// Polling schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Feeds to query.
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            fetch: FetchConfig::default(),
            display: DisplayConfig::default(),
            schedule: ScheduleConfig::default(),
            sources: default_sources(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(WeatherError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration with environment overrides, using the defaults when
    /// the file cannot be read.
    ///
    /// The read error is returned alongside the defaults so the caller can
    /// report it. A file that is read but does not parse is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<(Self, Option<std::io::Error>)> {
        match Self::load_with_env(path) {
            Ok(config) => Ok((config, None)),
            Err(WeatherError::Io(e)) => {
                let mut config = Self::default();
                config.apply_env_overrides();
                Ok((config, Some(e)))
            }
            Err(e) => Err(e),
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| WeatherError::InvalidConfig(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `ECWEATHER_LOG_LEVEL`: Override the log level
    /// - `ECWEATHER_TIMEZONE`: Override the display timezone
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ECWEATHER_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
        if let Ok(timezone) = std::env::var("ECWEATHER_TIMEZONE") {
            if !timezone.is_empty() {
                self.display.timezone = timezone;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - No sources are configured, or a source has a blank region code or bad URL
    /// - A fetch timeout is zero
    /// - The log level or display timezone is unknown
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(WeatherError::InvalidConfig(
                "no weather sources configured".to_string(),
            ));
        }
        for source in &self.sources {
            if source.region_code.trim().is_empty() {
                return Err(WeatherError::InvalidConfig(
                    "region_code must not be empty".to_string(),
                ));
            }
            parse_feed_url(&source.feed_url)?;
            parse_page_link(&source.page_link)?;
        }

        if self.fetch.connect_timeout_secs == 0 || self.fetch.total_timeout_secs == 0 {
            return Err(WeatherError::InvalidConfig(
                "fetch timeouts must be greater than zero".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "warning", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(WeatherError::InvalidConfig(format!(
                "invalid log level '{}'",
                self.logging.level
            )));
        }

        if !is_valid_timezone(&self.display.timezone) {
            return Err(WeatherError::InvalidConfig(format!(
                "unknown timezone '{}'",
                self.display.timezone
            )));
        }

        Ok(())
    }
}
