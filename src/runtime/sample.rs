//! Core data types for bus-capture processing

use std::fmt;

/// State of a single pin at one acquired instant.
///
/// `Unassigned` marks a channel that carries no trustworthy signal: an
/// optional probe that was never wired, or a decoder pin with no capture
/// probe mapped to it. It is distinct from both logic levels so that bus
/// reductions can refuse to produce a number from it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
    Unassigned,
}

/// One acquired instant of a logic capture: the level of every pin.
///
/// Pin levels are packed into `levels` (bit per pin, LSB = pin 0); `wired`
/// has a bit set for every pin that carries a real signal. A cleared `wired`
/// bit makes the pin read as [`PinLevel::Unassigned`] regardless of `levels`.
///
/// Up to 32 pins, which covers the widest decoder here (27 mandatory
/// channels for the MC6809).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleVector {
    /// Global sample index (0-based position in the capture)
    pub index: u64,
    /// Pin levels, bit per pin
    pub levels: u32,
    /// Wired mask, bit per pin
    pub wired: u32,
}

impl SampleVector {
    /// Create a sample vector from packed levels and a wired mask
    pub fn new(index: u64, levels: u32, wired: u32) -> Self {
        Self {
            index,
            levels,
            wired,
        }
    }

    /// Level of pin `pin`
    #[inline]
    pub fn pin(&self, pin: usize) -> PinLevel {
        if pin >= 32 || self.wired & (1 << pin) == 0 {
            PinLevel::Unassigned
        } else if self.levels & (1 << pin) != 0 {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }

    /// Whether pin `pin` is wired and high. Unassigned pins read as false.
    #[inline]
    pub fn is_high(&self, pin: usize) -> bool {
        self.pin(pin) == PinLevel::High
    }

    /// Whether pin `pin` is wired and low. Unassigned pins read as false.
    #[inline]
    pub fn is_low(&self, pin: usize) -> bool {
        self.pin(pin) == PinLevel::Low
    }
}

impl fmt::Display for SampleVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SampleVector[#{}, levels={:08x}, wired={:08x}]",
            self.index, self.levels, self.wired
        )
    }
}
