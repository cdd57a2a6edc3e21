//! Trait abstraction for telemetry client operations to enable testing

use async_trait::async_trait;

use crate::error::Result;
use crate::nis::protocol::RawSnapshot;

/// Trait for the connect/query/disconnect cycle against a telemetry source
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryClient: Send {
    /// Open a connection to the telemetry source
    async fn connect(&mut self, host: &str, port: u16) -> Result<()>;

    /// Request one full status snapshot over the open connection
    async fn get_status(&mut self) -> Result<RawSnapshot>;

    /// Close the open connection
    async fn disconnect(&mut self) -> Result<()>;
}
