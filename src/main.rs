use std::process::ExitCode;
use std::time::Duration;

use tracing::{error, info};

use ecweather::{Config, WeatherPoller, WeatherSource};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_or_default(&config_path) {
        Ok((config, None)) => config,
        Ok((config, Some(e))) => {
            eprintln!("Failed to read {config_path}: {e}");
            eprintln!("Using default configuration.");
            config
        }
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = ecweather::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        ecweather::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    info!("ecweather {}", env!("CARGO_PKG_VERSION"));

    let sources = match config
        .sources
        .iter()
        .map(|source| WeatherSource::from_config(source, &config))
        .collect::<ecweather::Result<Vec<_>>>()
    {
        Ok(sources) => sources,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let poller = WeatherPoller::new(
        sources,
        Duration::from_secs(config.schedule.interval_secs),
    );

    tokio::select! {
        failures = poller.run() => {
            if failures > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            ExitCode::SUCCESS
        }
    }
}
