//! # NIS Client Module
//!
//! Handles the TCP connection to the apcupsd Network Information Server.
//!
//! This module handles:
//! - Opening a transient TCP connection to the NIS port
//! - Sending the `status` command and collecting the reply
//! - Closing the connection after each query
//! - Bounding every step with a timeout

pub mod client_trait;

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Result, UpsBridgeError};
use crate::nis::protocol::{read_status_reply, write_command, RawSnapshot, NIS_STATUS_COMMAND};

pub use client_trait::TelemetryClient;

/// Default per-step timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// apcupsd NIS client
///
/// Holds at most one open connection. The poller opens and closes it on
/// every cycle.
pub struct NisClient {
    /// Open connection, if any
    stream: Option<TcpStream>,
    /// Address of the open connection (e.g., 127.0.0.1:3551)
    peer: Option<String>,
    /// Limit applied to each of connect, query and disconnect
    timeout: Duration,
}

impl std::fmt::Debug for NisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NisClient")
            .field("peer", &self.peer)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Default for NisClient {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}

impl NisClient {
    /// Create a disconnected client
    ///
    /// # Arguments
    ///
    /// * `timeout` - Limit for each connect, query and disconnect step
    pub fn new(timeout: Duration) -> Self {
        Self {
            stream: None,
            peer: None,
            timeout,
        }
    }

    /// Whether a connection is currently open
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Address of the open connection
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

async fn query_status(stream: &mut TcpStream) -> Result<RawSnapshot> {
    write_command(stream, NIS_STATUS_COMMAND).await?;
    read_status_reply(stream).await
}

#[async_trait]
impl TelemetryClient for NisClient {
    async fn connect(&mut self, host: &str, port: u16) -> Result<()> {
        let addr = format!("{}:{}", host, port);
        debug!("Connecting to NIS server at {}", addr);

        let stream = timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| UpsBridgeError::Timeout(self.timeout_ms()))?
            .map_err(|e| UpsBridgeError::Connection(format!("Failed to connect to {}: {}", addr, e)))?;

        if self.stream.replace(stream).is_some() {
            warn!("Dropped a stale NIS connection while connecting to {}", addr);
        }
        self.peer = Some(addr);
        Ok(())
    }

    async fn get_status(&mut self) -> Result<RawSnapshot> {
        let limit = self.timeout;
        let timeout_ms = self.timeout_ms();
        let stream = self.stream.as_mut().ok_or(UpsBridgeError::NotConnected)?;

        let snapshot = timeout(limit, query_status(stream))
            .await
            .map_err(|_| UpsBridgeError::Timeout(timeout_ms))??;

        debug!(
            "Received {} status fields from {}",
            snapshot.len(),
            self.peer.as_deref().unwrap_or("NIS server")
        );
        Ok(snapshot)
    }

    async fn disconnect(&mut self) -> Result<()> {
        let mut stream = self.stream.take().ok_or(UpsBridgeError::NotConnected)?;
        let peer = self.peer.take();

        timeout(self.timeout, stream.shutdown())
            .await
            .map_err(|_| UpsBridgeError::Timeout(self.timeout_ms()))??;

        debug!("Closed NIS connection to {}", peer.as_deref().unwrap_or("NIS server"));
        Ok(())
    }
}
