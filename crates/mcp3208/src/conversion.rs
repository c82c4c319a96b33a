//! Scaling between raw codes and millivolts.

use crate::{MAX_CODE, RESOLUTION};

/// Converts between raw 12-bit codes and millivolts for a given reference voltage.
///
/// All scaling is integer arithmetic with truncating division, so a round trip
/// through [`to_analog`](Self::to_analog) and [`to_digital`](Self::to_digital) may
/// lose up to one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    vref_mv: u16,
}

impl Conversion {
    /// Reference voltage in millivolts, i.e. the voltage of code 4095.
    pub const fn new(vref_mv: u16) -> Self {
        Self { vref_mv }
    }

    /// The reference voltage in millivolts.
    pub const fn vref(&self) -> u16 {
        self.vref_mv
    }

    /// Raw code to millivolts.
    pub const fn to_analog(&self, raw: u16) -> u16 {
        let raw = if raw > MAX_CODE { MAX_CODE } else { raw };

        (raw as u32 * self.vref_mv as u32 / (RESOLUTION - 1) as u32) as u16
    }

    /// Millivolts to raw code, saturating at [`MAX_CODE`].
    pub const fn to_digital(&self, mv: u16) -> u16 {
        if self.vref_mv == 0 {
            return 0;
        }

        let raw = mv as u32 * (RESOLUTION - 1) as u32 / self.vref_mv as u32;

        if raw > MAX_CODE as u32 {
            MAX_CODE
        } else {
            raw as u16
        }
    }

    /// Size of one code step in microvolts.
    pub const fn analog_resolution(&self) -> u16 {
        (self.vref_mv as u32 * 1000 / (RESOLUTION - 1) as u32) as u16
    }
}
