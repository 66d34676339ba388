//! Weather source: one region's feed behind a fetch → parse → format pipeline.

use tracing::{debug, info};
use url::Url;

use crate::config::{Config, SourceConfig};
use crate::weather::fetcher::FeedFetcher;
use crate::weather::formatter::ReportFormatter;
use crate::weather::parser::FeedParser;
use crate::weather::types::Report;
use crate::{Result, WeatherError};

/// Parse and check a feed URL. Only http and https are fetchable.
pub fn parse_feed_url(feed_url: &str) -> Result<Url> {
    let url = Url::parse(feed_url.trim())
        .map_err(|e| WeatherError::InvalidConfig(format!("invalid feed URL '{feed_url}': {e}")))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(WeatherError::InvalidConfig(format!(
            "unsupported feed URL scheme: {scheme}"
        ))),
    }
}

/// Parse the human-readable page link.
pub fn parse_page_link(page_link: &str) -> Result<Url> {
    Url::parse(page_link.trim())
        .map_err(|e| WeatherError::InvalidConfig(format!("invalid page link '{page_link}': {e}")))
}

/// A remote weather feed for one region.
///
/// Holds only immutable configuration, so one source can serve any number
/// of concurrent `get_weather` calls.
#[derive(Debug, Clone)]
pub struct WeatherSource {
    region_code: String,
    feed_url: Url,
    fetcher: FeedFetcher,
    parser: FeedParser,
    formatter: ReportFormatter,
}

impl WeatherSource {
    /// Create a source with default fetch and display settings.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the region code is blank or either URL is invalid.
    pub fn new(region_code: &str, feed_url: &str, page_link: &str) -> Result<Self> {
        Self::with_parts(
            region_code,
            feed_url,
            page_link,
            FeedFetcher::new()?,
            ReportFormatter::default(),
        )
    }

    /// Create a source from a configured entry and the shared settings.
    pub fn from_config(source: &SourceConfig, config: &Config) -> Result<Self> {
        Self::with_parts(
            &source.region_code,
            &source.feed_url,
            &source.page_link,
            FeedFetcher::from_config(&config.fetch)?,
            ReportFormatter::from_config(&config.display),
        )
    }

    /// Create a source with an explicit fetcher and formatter.
    pub fn with_parts(
        region_code: &str,
        feed_url: &str,
        page_link: &str,
        fetcher: FeedFetcher,
        formatter: ReportFormatter,
    ) -> Result<Self> {
        let region_code = region_code.trim();
        if region_code.is_empty() {
            return Err(WeatherError::InvalidConfig(
                "region code must not be empty".to_string(),
            ));
        }

        let feed_url = parse_feed_url(feed_url)?;
        let page_link = parse_page_link(page_link)?;

        Ok(Self {
            region_code: region_code.to_string(),
            feed_url,
            fetcher,
            parser: FeedParser::new(page_link),
            formatter,
        })
    }

    /// Region code (e.g., "on-118").
    pub fn region_code(&self) -> &str {
        &self.region_code
    }

    /// Feed URL.
    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    /// Human-readable page link, used when the feed omits one.
    pub fn page_link(&self) -> &Url {
        self.parser.fallback_link()
    }

    /// Fetch and parse the feed.
    pub async fn fetch_report(&self) -> Result<Report> {
        debug!("Fetching weather for {}", self.region_code);
        let raw = self.fetcher.fetch(&self.feed_url).await?;
        self.parser.parse(&raw)
    }

    /// Fetch, parse and format the feed as a single display line.
    ///
    /// The first fetch or parse error is returned unchanged.
    pub async fn get_weather(&self) -> Result<String> {
        let report = self.fetch_report().await?;
        let line = self.formatter.format(&report);
        info!("Weather for {}: {}", self.region_code, line);
        Ok(line)
    }
}
