//! # UPS Battery Bridge
//!
//! Expose an APC UPS battery as smart-home battery characteristics.
//!
//! This application polls apcupsd and logs the battery characteristics an
//! accessory host would read.

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use ups_battery_bridge::accessory::{BatteryService, BatteryStatusProvider};
use ups_battery_bridge::client::NisClient;
use ups_battery_bridge::config::Config;
use ups_battery_bridge::monitor::UpsMonitor;

/// Build the log filter: `RUST_LOG` directives plus the configured level
///
/// The configured level is added as a directive, so it applies to every
/// target `RUST_LOG` does not name.
fn build_env_filter(level: &str) -> Result<EnvFilter> {
    let directive = level
        .parse::<Directive>()
        .with_context(|| format!("Invalid log level: {}", level))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Characteristic values as read by an accessory host
type Characteristics = (u8, u8, u8);

fn read_characteristics(provider: &dyn BatteryStatusProvider) -> Characteristics {
    (
        provider.battery_level(),
        provider.charging_state(),
        provider.low_battery_state(),
    )
}

/// Main entry point for UPS Battery Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration from the path given as first argument, or defaults
///    - Set up logging with a non-blocking tracing subscriber
///    - Create the NIS client, UPS monitor and battery service
///
/// 2. **Main Loop**
///    - Poll apcupsd every `poller.interval_ms` on a background task
///    - Log the battery characteristics whenever they change
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration file cannot be read or is invalid.
/// An unreachable apcupsd is not an error; polling keeps retrying.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/ups.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO ups_battery_bridge: UPS Battery Bridge v0.1.0 starting...
/// INFO ups_battery_bridge::monitor: Polling apcupsd at 127.0.0.1:3551 every 5000 ms
/// INFO ups_battery_bridge: UPS: battery 100%, charging 0, low battery 0
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("Failed to load config from {}", path))?,
        None => Config::default(),
    };

    // Initialize logging
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(build_env_filter(&config.logging.level)?)
        .init();

    info!("UPS Battery Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let client = NisClient::new(config.nis.timeout());
    let monitor = UpsMonitor::from_config(client, &config.nis);
    let mut reader = monitor.subscribe();
    let service = BatteryService::new(config.accessory.name.clone(), monitor.subscribe());

    let poller = monitor.start_polling(config.poller.interval());
    info!("Press Ctrl+C to exit");

    let mut last_reported: Option<Characteristics> = None;

    loop {
        tokio::select! {
            changed = reader.changed() => {
                if changed.is_none() {
                    break;
                }

                let current = read_characteristics(&service);
                if last_reported != Some(current) {
                    let (level, charging, low) = current;
                    info!(
                        "{}: battery {}%, charging {}, low battery {}",
                        service.name(), level, charging, low
                    );
                    last_reported = Some(current);
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    poller.abort();
    Ok(())
}
