//! # NIS Protocol Constants and Types
//!
//! Framing and status-record parsing for the apcupsd Network Information
//! Server (NIS).
//!
//! Every message in either direction is a 2-byte big-endian length followed
//! by that many bytes of text. A reply to `status` is a sequence of such
//! messages, one `KEY : value` record each, terminated by a zero-length
//! message.

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, UpsBridgeError};

/// Conventional NIS port of apcupsd
pub const NIS_DEFAULT_PORT: u16 = 3551;

/// Command requesting the full status record set
pub const NIS_STATUS_COMMAND: &str = "status";

/// Size of the big-endian length prefix on every message
pub const NIS_LENGTH_PREFIX_SIZE: usize = 2;

/// Largest payload a single message can carry
pub const NIS_MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

/// Upper bound on records accepted in one reply (apcupsd sends under 100)
pub const NIS_MAX_RECORDS: usize = 1024;

/// Battery charge field, formatted as `"<float> Percent"`
pub const FIELD_BATTERY_CHARGE: &str = "BCHARGE";

/// Line status field (`ONLINE`, `ONBATT`, ...)
pub const FIELD_STATUS: &str = "STATUS";

/// Estimated runtime field, formatted as `"<float> Minutes"`
pub const FIELD_TIME_LEFT: &str = "TIMELEFT";

/// One full set of status fields returned by a single `status` query.
///
/// Field values are kept as the raw text the daemon sent; interpretation is
/// left to the status deriver.
#[derive(Debug, Clone, Serialize)]
pub struct RawSnapshot {
    /// Record keys mapped to their trimmed values
    fields: BTreeMap<String, String>,

    /// Local time the reply was fully received
    received_at: DateTime<Utc>,
}

impl Default for RawSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl RawSnapshot {
    /// Create an empty snapshot stamped with the current time
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
            received_at: Utc::now(),
        }
    }

    /// Build a snapshot from raw `KEY : value` record lines
    ///
    /// Lines that do not parse as records are skipped. A later record with
    /// the same key overwrites an earlier one.
    ///
    /// # Examples
    ///
    /// ```
    /// use ups_battery_bridge::nis::protocol::RawSnapshot;
    ///
    /// let snapshot = RawSnapshot::from_records(["BCHARGE  : 100.0 Percent"]);
    /// assert_eq!(snapshot.battery_charge(), Some("100.0 Percent"));
    /// ```
    pub fn from_records<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut snapshot = Self::new();
        for line in lines {
            if let Some((key, value)) = parse_record_line(line.as_ref()) {
                snapshot.insert(key, value);
            }
        }
        snapshot
    }

    /// Insert or replace a field
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Look up a field by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The raw battery charge text, if the daemon reported one
    pub fn battery_charge(&self) -> Option<&str> {
        self.get(FIELD_BATTERY_CHARGE)
    }

    /// Number of fields in the snapshot
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the snapshot has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Local time the snapshot was received
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Render the snapshot as a JSON object
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Parse one status record line into a `(key, value)` pair
///
/// The line is split on its first `:`. Both sides are trimmed, and the
/// trailing newline apcupsd appends is dropped with them. Lines without a
/// `:` or with an empty key yield `None`.
pub fn parse_record_line(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

/// Encode a payload as a length-prefixed NIS message
///
/// # Errors
///
/// Returns error if the payload is empty (an empty message means
/// end-of-reply) or larger than [`NIS_MAX_MESSAGE_SIZE`].
pub fn encode_message(payload: &[u8]) -> Result<Bytes> {
    if payload.is_empty() {
        return Err(UpsBridgeError::NisProtocol(
            "Cannot encode an empty message".to_string(),
        ));
    }

    if payload.len() > NIS_MAX_MESSAGE_SIZE {
        return Err(UpsBridgeError::NisProtocol(format!(
            "Message size {} exceeds maximum {}",
            payload.len(),
            NIS_MAX_MESSAGE_SIZE
        )));
    }

    let mut buf = BytesMut::with_capacity(NIS_LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Write a command message and flush it
pub async fn write_command<W>(writer: &mut W, command: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let message = encode_message(command.as_bytes())?;
    writer.write_all(&message).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one message
///
/// Returns `Ok(None)` on the zero-length end-of-reply marker.
///
/// # Errors
///
/// Returns a protocol error if the stream closes mid-reply.
pub async fn read_message<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let length = reader.read_u16().await.map_err(map_eof)? as usize;
    if length == 0 {
        return Ok(None);
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await.map_err(map_eof)?;
    Ok(Some(String::from_utf8_lossy(&payload).into_owned()))
}

/// Read a complete status reply into a [`RawSnapshot`]
///
/// # Errors
///
/// Returns error if the stream ends before the end-of-reply marker or the
/// reply carries more than [`NIS_MAX_RECORDS`] records.
pub async fn read_status_reply<R>(reader: &mut R) -> Result<RawSnapshot>
where
    R: AsyncRead + Unpin,
{
    let mut records = Vec::new();

    while let Some(record) = read_message(reader).await? {
        if records.len() == NIS_MAX_RECORDS {
            return Err(UpsBridgeError::NisProtocol(format!(
                "Status reply exceeds {} records",
                NIS_MAX_RECORDS
            )));
        }
        records.push(record);
    }

    Ok(RawSnapshot::from_records(records))
}

fn map_eof(e: std::io::Error) -> UpsBridgeError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        UpsBridgeError::NisProtocol("Connection closed before end of status reply".to_string())
    } else {
        UpsBridgeError::Io(e)
    }
}
