//! Error types for ecweather.

use thiserror::Error;

/// Common error type for ecweather.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// A weather source or configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The connection to the feed server failed.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete before its deadline.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The feed server answered with a non-2xx status.
    #[error("HTTP status error: {code}")]
    HttpStatus { code: u16 },

    /// The feed body is not well-formed XML.
    #[error("malformed feed: {0}")]
    MalformedFeed(String),

    /// The feed parsed but carries no item or entry.
    #[error("feed contains no entries")]
    EmptyFeed,

    /// The feed body exceeds the configured size limit.
    #[error("feed too large: {size} bytes (max {max} bytes)")]
    FeedTooLarge { size: u64, max: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ecweather operations.
pub type Result<T> = std::result::Result<T, WeatherError>;
