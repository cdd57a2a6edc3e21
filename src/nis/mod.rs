//! # NIS Protocol Module
//!
//! Implementation of the apcupsd Network Information Server (NIS) protocol.
//!
//! This module handles:
//! - Length-prefixed message framing (2-byte big-endian length)
//! - The `status` command and its record-per-message reply
//! - Parsing `KEY : value` records into a [`protocol::RawSnapshot`]

pub mod protocol;
