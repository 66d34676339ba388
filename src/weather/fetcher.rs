//! Weather feed fetcher.
//!
//! Performs a single HTTP GET per call with connect and total timeouts and
//! a cap on the body size. Dropping the returned future aborts the request.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::weather::types::RawFeed;
use crate::{Result, WeatherError};

/// HTTP feed fetcher.
#[derive(Debug, Clone)]
pub struct FeedFetcher {
    client: Client,
    max_feed_size: u64,
}

impl FeedFetcher {
    /// Create a new fetcher with default settings.
    pub fn new() -> Result<Self> {
        Self::from_config(&FetchConfig::default())
    }

    /// Create a fetcher from the fetch section of the configuration.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                WeatherError::InvalidConfig(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    /// Maximum accepted body size in bytes.
    pub fn max_feed_size(&self) -> u64 {
        self.max_feed_size
    }

    /// Fetch the raw feed at `url`.
    ///
    /// # Errors
    ///
    /// - `Network` if the connection fails
    /// - `Timeout` if the deadline passes before the body is read
    /// - `HttpStatus` for any non-2xx response
    /// - `FeedTooLarge` if the body exceeds the size cap
    pub async fn fetch(&self, url: &Url) -> Result<RawFeed> {
        debug!("Fetching feed: {}", url);

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::HttpStatus {
                code: status.as_u16(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(WeatherError::FeedTooLarge {
                    size: content_length,
                    max: self.max_feed_size,
                });
            }
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| request_error(url, e))? {
            bytes.extend_from_slice(&chunk);
            if bytes.len() as u64 > self.max_feed_size {
                return Err(WeatherError::FeedTooLarge {
                    size: bytes.len() as u64,
                    max: self.max_feed_size,
                });
            }
        }

        debug!("Fetched {} bytes from {}", bytes.len(), url);

        Ok(RawFeed {
            bytes,
            fetched_at: Utc::now(),
        })
    }
}

/// Classify a reqwest failure as a timeout or a plain network error.
fn request_error(url: &Url, e: reqwest::Error) -> WeatherError {
    if e.is_timeout() {
        WeatherError::Timeout(format!("{url}: {e}"))
    } else {
        WeatherError::Network(format!("{url}: {e}"))
    }
}
