//! # UPS Monitor Module
//!
//! Periodically polls apcupsd and publishes the derived battery status.
//!
//! Each tick runs one cycle against the telemetry source:
//!
//! 1. **Connect** to the NIS server. On failure the cycle ends; state is untouched.
//! 2. **Query** a status snapshot. On failure the cycle skips the update.
//! 3. **Derive** the new status and publish it as a whole.
//! 4. **Disconnect** whenever a connection was opened, whatever happened in 2-3.
//!
//! No error escapes a cycle. An unreachable daemon is expected; the next tick
//! is the retry.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn, Level};

use crate::client::TelemetryClient;
use crate::config::NisConfig;
use crate::nis::protocol::{RawSnapshot, FIELD_STATUS, FIELD_TIME_LEFT, NIS_DEFAULT_PORT};
use crate::status::{derive_status, DerivedStatus, StatusReader};

/// Default NIS host (apcupsd on the same machine)
pub const DEFAULT_NIS_HOST: &str = "127.0.0.1";

/// Default NIS port
pub const DEFAULT_NIS_PORT: u16 = NIS_DEFAULT_PORT;

/// Default poll interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A snapshot was read and the status replaced
    Updated,
    /// The NIS server could not be reached
    ConnectFailed,
    /// Connected, but the status query failed
    QueryFailed,
}

/// Per-device poller state
///
/// `current` always holds a complete status; `last` is the status that
/// `current` replaced on the latest update.
#[derive(Debug, Clone, Default)]
pub struct PollerState {
    current: DerivedStatus,
    last: Option<DerivedStatus>,
    connected: bool,
}

impl PollerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> DerivedStatus {
        self.current
    }

    pub fn last(&self) -> Option<DerivedStatus> {
        self.last
    }

    /// Whether the transient connection is currently open
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Replace the current status with one derived from `snapshot`
    fn apply_snapshot(&mut self, snapshot: &RawSnapshot) -> DerivedStatus {
        self.last = Some(self.current);
        self.current = derive_status(snapshot, self.last.as_ref());
        self.current
    }
}

/// UPS monitor for a single device
///
/// Owns the telemetry client and the poller state, and publishes every
/// derived status to [`StatusReader`]s.
pub struct UpsMonitor<C> {
    client: C,
    host: String,
    port: u16,
    state: PollerState,
    status_tx: watch::Sender<DerivedStatus>,
}

impl<C> std::fmt::Debug for UpsMonitor<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsMonitor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<C: TelemetryClient> UpsMonitor<C> {
    /// Create a monitor polling `host:port` through `client`
    pub fn new(client: C, host: impl Into<String>, port: u16) -> Self {
        let (status_tx, _) = watch::channel(DerivedStatus::default());
        Self {
            client,
            host: host.into(),
            port,
            state: PollerState::new(),
            status_tx,
        }
    }

    /// Create a monitor for the local apcupsd at 127.0.0.1:3551
    pub fn local(client: C) -> Self {
        Self::new(client, DEFAULT_NIS_HOST, DEFAULT_NIS_PORT)
    }

    /// Create a monitor targeting the configured NIS server
    pub fn from_config(client: C, config: &NisConfig) -> Self {
        Self::new(client, config.host.clone(), config.port)
    }

    /// Get a read handle on the published status
    pub fn subscribe(&self) -> StatusReader {
        StatusReader::new(self.status_tx.subscribe())
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    /// Run a single connect, query, derive, disconnect cycle
    ///
    /// Never fails: every error is logged and ends only this cycle.
    pub async fn poll_once(&mut self) -> CycleOutcome {
        if let Err(e) = self.client.connect(&self.host, self.port).await {
            error!("APC connect error ({}:{}): {}", self.host, self.port, e);
            return CycleOutcome::ConnectFailed;
        }
        self.state.connected = true;

        let outcome = match self.client.get_status().await {
            Ok(snapshot) => {
                self.publish(&snapshot);
                CycleOutcome::Updated
            }
            Err(e) => {
                error!("APC status query error: {}", e);
                CycleOutcome::QueryFailed
            }
        };

        if self.state.connected {
            if let Err(e) = self.client.disconnect().await {
                error!("APC disconnect error: {}", e);
            }
            self.state.connected = false;
        }

        outcome
    }

    fn publish(&mut self, snapshot: &RawSnapshot) {
        log_snapshot(snapshot);

        let previous = self.state.current();
        let status = self.state.apply_snapshot(snapshot);
        self.status_tx.send_replace(status);
        debug!("UPS status updated: {}", status);

        if status.is_charging() != previous.is_charging() {
            info!(
                "UPS battery {} at {:.1}%",
                if status.is_charging() { "started charging" } else { "stopped charging" },
                status.battery_level()
            );
        }

        if status.is_low_battery() && !previous.is_low_battery() {
            warn!("UPS battery low: {:.1}%", status.battery_level());
        } else if !status.is_low_battery() && previous.is_low_battery() {
            info!("UPS battery recovered: {:.1}%", status.battery_level());
        }
    }
}

/// Log snapshot details at debug level
///
/// Returns `false` without rendering anything when debug is disabled.
fn log_snapshot(snapshot: &RawSnapshot) -> bool {
    if !tracing::enabled!(Level::DEBUG) {
        return false;
    }

    debug!(
        "APC snapshot received at {}: STATUS={} TIMELEFT={}",
        snapshot.received_at().to_rfc3339(),
        snapshot.get(FIELD_STATUS).unwrap_or("n/a"),
        snapshot.get(FIELD_TIME_LEFT).unwrap_or("n/a")
    );
    if let Ok(json) = snapshot.to_json() {
        debug!("APC snapshot fields: {}", json);
    }
    true
}

impl<C: TelemetryClient + 'static> UpsMonitor<C> {
    /// Start polling every `period` on a background task
    ///
    /// The first cycle runs one period after the call. The task runs until
    /// the returned handle is aborted or the runtime shuts down. A cycle that
    /// overruns the period delays the next tick instead of overlapping it.
    pub fn start_polling(mut self, period: Duration) -> JoinHandle<()> {
        info!(
            "Polling apcupsd at {}:{} every {} ms",
            self.host,
            self.port,
            period.as_millis()
        );

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let outcome = self.poll_once().await;
                debug!("Poll cycle finished: {:?}", outcome);
            }
        })
    }
}
