//! # Accessory Module
//!
//! Exposes the latest UPS status as smart-home battery characteristics.
//!
//! A host framework (e.g. a HomeKit bridge) binds one [`BatteryService`] per
//! monitored UPS and reads these values on demand:
//!
//! | Characteristic | Values |
//! |----------------|--------|
//! | Battery Level | 0-100 (floor of the charge percentage) |
//! | Charging State | 0 = not charging, 1 = charging |
//! | Status Low Battery | 0 = normal, 1 = low |
//!
//! Reads are synchronous, never fail and never trigger a poll.

use tracing::debug;

use crate::status::StatusReader;

/// Charging State characteristic values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChargingState {
    NotCharging = 0,
    Charging = 1,
}

/// Status Low Battery characteristic values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusLowBattery {
    Normal = 0,
    Low = 1,
}

impl From<bool> for ChargingState {
    fn from(charging: bool) -> Self {
        if charging {
            Self::Charging
        } else {
            Self::NotCharging
        }
    }
}

impl From<bool> for StatusLowBattery {
    fn from(low: bool) -> Self {
        if low {
            Self::Low
        } else {
            Self::Normal
        }
    }
}

/// Read-only battery status as seen by an accessory host
pub trait BatteryStatusProvider: Send + Sync {
    /// Display name of the accessory
    fn name(&self) -> &str;

    /// Battery level in 0..=100
    fn battery_level(&self) -> u8;

    /// [`ChargingState`] value
    fn charging_state(&self) -> u8;

    /// [`StatusLowBattery`] value
    fn low_battery_state(&self) -> u8;
}

/// Battery service backed by a monitor's published status
#[derive(Debug, Clone)]
pub struct BatteryService {
    name: String,
    reader: StatusReader,
}

impl BatteryService {
    pub fn new(name: impl Into<String>, reader: StatusReader) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

impl BatteryStatusProvider for BatteryService {
    fn name(&self) -> &str {
        &self.name
    }

    fn battery_level(&self) -> u8 {
        debug!("Triggered GET BatteryLevel");
        // Level is already within 0..=100
        self.reader.current().battery_level().floor() as u8
    }

    fn charging_state(&self) -> u8 {
        debug!("Triggered GET ChargingState");
        ChargingState::from(self.reader.current().is_charging()) as u8
    }

    fn low_battery_state(&self) -> u8 {
        debug!("Triggered GET StatusLowBattery");
        StatusLowBattery::from(self.reader.current().is_low_battery()) as u8
    }
}
