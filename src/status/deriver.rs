//! # Status Deriver
//!
//! Turns a [`RawSnapshot`] plus the previous status into the next
//! [`DerivedStatus`]. No I/O; parse anomalies are normalized, never raised.
//!
//! The charge field arrives as `"<float> <unit>"`, e.g. `"100.0 Percent"`.
//! Only [`parse_battery_charge`] knows about that text format.

use super::DerivedStatus;
use crate::nis::protocol::RawSnapshot;

/// Parse the leading number of a charge field such as `"36.7 Percent"`
///
/// Only the first whitespace-separated token is read, and only its numeric
/// prefix counts: `"50%"` is 50. Returns `None` if the field is empty or the
/// token does not start with a number.
///
/// # Examples
///
/// ```
/// use ups_battery_bridge::status::parse_battery_charge;
///
/// assert_eq!(parse_battery_charge("36.7 Percent"), Some(36.7));
/// assert_eq!(parse_battery_charge("36.7Percent"), Some(36.7));
/// assert_eq!(parse_battery_charge("N/A"), None);
/// ```
pub fn parse_battery_charge(raw: &str) -> Option<f64> {
    let token = raw.split_whitespace().next()?;
    let end = numeric_prefix_len(token.as_bytes());
    if end == 0 {
        return None;
    }
    token[..end].parse::<f64>().ok()
}

/// Length of the longest `[+-]digits[.digits][(e|E)[+-]digits]` prefix
///
/// Returns 0 when the mantissa has no digit at all.
fn numeric_prefix_len(bytes: &[u8]) -> usize {
    let digits_from = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }

    let int_end = digits_from(i);
    let mut end = int_end;
    let mut has_digits = int_end > i;

    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        has_digits |= frac_end > end + 1;
        end = frac_end;
    }

    if !has_digits {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }

    end
}

/// Derive the next status from a snapshot
///
/// # Arguments
///
/// * `snapshot` - Raw fields from the latest query
/// * `previous` - Status from the prior cycle, used for the charging trend
#[must_use]
pub fn derive_status(snapshot: &RawSnapshot, previous: Option<&DerivedStatus>) -> DerivedStatus {
    let level = snapshot.battery_charge().and_then(parse_battery_charge);
    DerivedStatus::from_level(level, previous)
}
