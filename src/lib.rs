//! ecweather - Environment Canada city weather feeds
//!
//! Fetches a region's weather feed, parses the current conditions and renders
//! them as a single line of text.

pub mod config;
pub mod datetime;
pub mod error;
pub mod logging;
pub mod weather;

pub use config::{Config, SourceConfig};
pub use error::{Result, WeatherError};
pub use weather::{
    FeedFetcher, FeedParser, PollOutcome, RawFeed, Report, ReportFormatter, WeatherPoller,
    WeatherSource,
};
