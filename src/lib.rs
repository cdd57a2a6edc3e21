//! # UPS Battery Bridge Library
//!
//! Expose an APC UPS battery as smart-home battery characteristics.
//!
//! This library polls the apcupsd Network Information Server on a fixed
//! interval, derives battery level, charging and low-battery flags from each
//! reply, and serves the latest values to accessory hosts on demand.

pub mod accessory;
pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod nis;
pub mod status;
