//! Weather feed module for ecweather.
//!
//! Fetches a region's feed, parses the current conditions and formats them
//! for display.

pub mod fetcher;
pub mod formatter;
pub mod parser;
pub mod poller;
pub mod source;
pub mod types;

pub use fetcher::FeedFetcher;
pub use formatter::ReportFormatter;
pub use parser::FeedParser;
pub use poller::{PollOutcome, WeatherPoller};
pub use source::{parse_feed_url, parse_page_link, WeatherSource};
pub use types::{RawFeed, Report, DEFAULT_TIMEOUT_SECS, MAX_FEED_SIZE, UNKNOWN_CONDITION};
