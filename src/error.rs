//! # Error Types
//!
//! Custom error types for UPS Battery Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for UPS Battery Bridge
#[derive(Debug, Error)]
pub enum UpsBridgeError {
    /// NIS wire protocol errors (bad framing, oversized command, bad encoding)
    #[error("NIS protocol error: {0}")]
    NisProtocol(String),

    /// Could not reach the NIS server
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query or disconnect attempted without an open connection
    #[error("Not connected to NIS server")]
    NotConnected,

    /// A client step did not finish within the configured timeout
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for UPS Battery Bridge
pub type Result<T> = std::result::Result<T, UpsBridgeError>;
