//! Scheduled weather polling.
//!
//! Queries every configured source concurrently, either once or on a fixed
//! interval.

use futures::future::join_all;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::weather::source::WeatherSource;
use crate::Result;

/// Result of one source in one poll.
#[derive(Debug)]
pub struct PollOutcome {
    /// Region code of the source.
    pub region_code: String,
    /// Formatted weather line or the error that stopped it.
    pub result: Result<String>,
}

/// Weather poller over a fixed set of sources.
pub struct WeatherPoller {
    sources: Vec<WeatherSource>,
    interval: Duration,
}

impl WeatherPoller {
    /// Create a poller. A zero interval polls a single time.
    pub fn new(sources: Vec<WeatherSource>, interval: Duration) -> Self {
        Self { sources, interval }
    }

    /// Sources polled by this poller.
    pub fn sources(&self) -> &[WeatherSource] {
        &self.sources
    }

    /// Query every source concurrently. Outcomes keep the source order.
    pub async fn poll_once(&self) -> Vec<PollOutcome> {
        debug!("Polling {} source(s)", self.sources.len());

        let results = join_all(self.sources.iter().map(|source| source.get_weather())).await;

        self.sources
            .iter()
            .zip(results)
            .map(|(source, result)| PollOutcome {
                region_code: source.region_code().to_string(),
                result,
            })
            .collect()
    }

    /// Poll and print results to stdout.
    ///
    /// With a zero interval this polls once and returns the number of failed
    /// sources. Otherwise it polls forever.
    pub async fn run(&self) -> usize {
        if self.interval.is_zero() {
            return print_outcomes(self.poll_once().await);
        }

        info!(
            "Weather poller started (interval: {} seconds)",
            self.interval.as_secs()
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;
            print_outcomes(self.poll_once().await);
        }
    }
}

/// Print successes, log failures, and return the failure count.
fn print_outcomes(outcomes: Vec<PollOutcome>) -> usize {
    let mut failures = 0;
    for outcome in outcomes {
        match outcome.result {
            Ok(line) => println!("{line}"),
            Err(e) => {
                warn!("Failed to get weather for {}: {}", outcome.region_code, e);
                failures += 1;
            }
        }
    }
    failures
}
