//! # Status Module
//!
//! Normalized UPS battery status and its derivation from raw telemetry.
//!
//! This module handles:
//! - The [`DerivedStatus`] value object (battery level, charging, low battery)
//! - Deriving the next status from a snapshot and the previous status
//! - Sharing the latest status with readers through a watch channel

pub mod deriver;

use serde::Serialize;
use tokio::sync::watch;

pub use deriver::{derive_status, parse_battery_charge};

/// Battery level below which the battery is reported low
pub const LOW_BATTERY_THRESHOLD: f64 = 10.0;

/// Battery level at which charging is considered finished
pub const FULL_CHARGE_LEVEL: f64 = 100.0;

/// Normalized battery status computed from one telemetry snapshot
///
/// Instances are never mutated; each poll cycle produces a new one that
/// replaces the previous status as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedStatus {
    /// Battery charge percentage, always within 0..=100
    battery_level: f64,
    is_charging: bool,
    /// Always `battery_level < LOW_BATTERY_THRESHOLD`
    is_low_battery: bool,
}

impl DerivedStatus {
    /// Derive a status from an already-parsed charge level
    ///
    /// A missing, non-finite or out-of-range level becomes 0. Charging is
    /// inferred from the trend against `previous`: the level must be below
    /// full and strictly above a previous level that was itself above 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use ups_battery_bridge::status::DerivedStatus;
    ///
    /// let before = DerivedStatus::from_level(Some(50.0), None);
    /// let after = DerivedStatus::from_level(Some(70.0), Some(&before));
    /// assert!(after.is_charging());
    /// assert!(!after.is_low_battery());
    /// ```
    #[must_use]
    pub fn from_level(level: Option<f64>, previous: Option<&DerivedStatus>) -> Self {
        let battery_level = level
            .filter(|l| (0.0..=FULL_CHARGE_LEVEL).contains(l))
            .unwrap_or(0.0);

        let is_charging = battery_level < FULL_CHARGE_LEVEL
            && previous.is_some_and(|p| p.battery_level > 0.0 && p.battery_level < battery_level);

        Self {
            battery_level,
            is_charging,
            is_low_battery: battery_level < LOW_BATTERY_THRESHOLD,
        }
    }

    /// Battery charge percentage (unrounded)
    #[must_use]
    pub fn battery_level(&self) -> f64 {
        self.battery_level
    }

    #[must_use]
    pub fn is_charging(&self) -> bool {
        self.is_charging
    }

    #[must_use]
    pub fn is_low_battery(&self) -> bool {
        self.is_low_battery
    }
}

impl std::fmt::Display for DerivedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1}% (charging: {}, low: {})",
            self.battery_level, self.is_charging, self.is_low_battery
        )
    }
}

/// Read handle on the latest published [`DerivedStatus`]
///
/// Reads never block on or trigger a poll. Before the first successful
/// cycle the reader sees the zero status.
#[derive(Debug, Clone)]
pub struct StatusReader {
    rx: watch::Receiver<DerivedStatus>,
}

impl StatusReader {
    pub(crate) fn new(rx: watch::Receiver<DerivedStatus>) -> Self {
        Self { rx }
    }

    /// The latest published status
    pub fn current(&self) -> DerivedStatus {
        *self.rx.borrow()
    }

    /// Wait for the next publication and return it
    ///
    /// Returns `None` once the publishing monitor is gone.
    pub async fn changed(&mut self) -> Option<DerivedStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_zero() {
        let status = DerivedStatus::default();
        assert_eq!(status.battery_level(), 0.0);
        assert!(!status.is_charging());
        assert!(!status.is_low_battery());
    }

    #[test]
    fn test_valid_levels_pass_through() {
        for level in [0.0, 0.5, 9.99, 10.0, 36.7, 99.9, 100.0] {
            let status = DerivedStatus::from_level(Some(level), None);
            assert_eq!(status.battery_level(), level, "Level {} should be kept", level);
        }
    }

    #[test]
    fn test_out_of_range_levels_become_zero() {
        for level in [-0.1, -50.0, 100.1, 250.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let status = DerivedStatus::from_level(Some(level), None);
            assert_eq!(status.battery_level(), 0.0, "Level {} should fall back to 0", level);
        }
    }

    #[test]
    fn test_missing_level_becomes_zero_and_low() {
        let status = DerivedStatus::from_level(None, None);
        assert_eq!(status.battery_level(), 0.0);
        assert!(status.is_low_battery());
        assert!(!status.is_charging());
    }

    #[test]
    fn test_low_battery_matches_threshold() {
        for level in [0.0, 5.0, 9.9, 10.0, 10.1, 50.0, 100.0] {
            let status = DerivedStatus::from_level(Some(level), None);
            assert_eq!(status.is_low_battery(), level < LOW_BATTERY_THRESHOLD);
        }
    }

    #[test]
    fn test_level_exactly_ten_is_not_low() {
        assert!(!DerivedStatus::from_level(Some(10.0), None).is_low_battery());
    }

    #[test]
    fn test_never_charging_without_previous() {
        for level in [1.0, 50.0, 99.0] {
            assert!(!DerivedStatus::from_level(Some(level), None).is_charging());
        }
    }

    #[test]
    fn test_rising_level_is_charging() {
        let previous = DerivedStatus::from_level(Some(50.0), None);
        let status = DerivedStatus::from_level(Some(70.0), Some(&previous));
        assert!(status.is_charging());
    }

    #[test]
    fn test_falling_level_is_not_charging() {
        let previous = DerivedStatus::from_level(Some(50.0), None);
        let status = DerivedStatus::from_level(Some(30.0), Some(&previous));
        assert!(!status.is_charging());
    }

    #[test]
    fn test_steady_level_is_not_charging() {
        let previous = DerivedStatus::from_level(Some(50.0), None);
        let status = DerivedStatus::from_level(Some(50.0), Some(&previous));
        assert!(!status.is_charging());
    }

    #[test]
    fn test_rise_from_zero_is_not_charging() {
        let previous = DerivedStatus::from_level(Some(0.0), None);
        let status = DerivedStatus::from_level(Some(40.0), Some(&previous));
        assert!(!status.is_charging());
    }

    #[test]
    fn test_full_charge_is_not_charging() {
        let previous = DerivedStatus::from_level(Some(99.0), None);
        let status = DerivedStatus::from_level(Some(100.0), Some(&previous));
        assert!(!status.is_charging());
    }

    #[test]
    fn test_repeated_zero_readings_never_charge() {
        let mut status = DerivedStatus::default();
        for _ in 0..3 {
            status = DerivedStatus::from_level(None, Some(&status));
            assert!(!status.is_charging());
            assert!(status.is_low_battery());
        }
    }

    #[test]
    fn test_display() {
        let status = DerivedStatus::from_level(Some(45.0), None);
        assert_eq!(status.to_string(), "45.0% (charging: false, low: false)");
    }

    #[tokio::test]
    async fn test_reader_sees_replaced_status() {
        let (tx, rx) = watch::channel(DerivedStatus::default());
        let mut reader = StatusReader::new(rx);
        assert_eq!(reader.current(), DerivedStatus::default());

        let next = DerivedStatus::from_level(Some(80.0), None);
        tx.send_replace(next);

        assert_eq!(reader.current(), next);
        assert_eq!(reader.changed().await, Some(next));
    }

    #[tokio::test]
    async fn test_reader_changed_ends_when_sender_dropped() {
        let (tx, rx) = watch::channel(DerivedStatus::default());
        let mut reader = StatusReader::new(rx);
        drop(tx);

        assert_eq!(reader.changed().await, None);
        // The last value stays readable
        assert_eq!(reader.current(), DerivedStatus::default());
    }
}
