//! Bus multiplexer: parallel pin ranges to integer values
//!
//! Bus lines may be unwired (optional channels, unmapped decoder pins), so a
//! reduction can refuse to produce a number. [`BusValue`] keeps that case out
//! of arithmetic entirely instead of smuggling a sentinel through an integer.

use crate::runtime::sample::{PinLevel, SampleVector};
use std::ops::RangeInclusive;

/// A value reconstructed from parallel bus lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusValue {
    Known(u32),
    Unassigned,
}

impl BusValue {
    /// Combine two 8-bit halves as `high * 256 + low`. Unassigned if either
    /// half is.
    pub fn word_from(high: BusValue, low: BusValue) -> BusValue {
        match (high, low) {
            (BusValue::Known(h), BusValue::Known(l)) => BusValue::Known(h * 256 + l),
            _ => BusValue::Unassigned,
        }
    }

    /// Format as a two-digit hex byte, placeholder if unassigned
    pub fn fmt_byte(&self) -> String {
        match self {
            BusValue::Known(v) => format!("{:02X}", v),
            BusValue::Unassigned => "??".to_string(),
        }
    }

    /// Format as a four-digit hex word, placeholder if unassigned
    pub fn fmt_word(&self) -> String {
        match self {
            BusValue::Known(v) => format!("{:04X}", v),
            BusValue::Unassigned => "????".to_string(),
        }
    }

    /// The numeric value, if known
    pub fn known(&self) -> Option<u32> {
        match self {
            BusValue::Known(v) => Some(*v),
            BusValue::Unassigned => None,
        }
    }
}

/// Reduce a contiguous pin range to an unsigned value, least-significant pin
/// first (pin `range.start()` becomes bit 0).
///
/// Any unassigned pin in the range poisons the whole reduction. The check
/// happens during the scan; no partial number escapes.
pub fn reduce_bus(pins: &SampleVector, range: RangeInclusive<usize>) -> BusValue {
    let base = *range.start();
    let mut value: u32 = 0;
    for pin in range {
        match pins.pin(pin) {
            PinLevel::High => value |= 1 << (pin - base),
            PinLevel::Low => {}
            PinLevel::Unassigned => return BusValue::Unassigned,
        }
    }
    BusValue::Known(value)
}
