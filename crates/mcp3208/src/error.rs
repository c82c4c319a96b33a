//! Driver error type.

use core::fmt;

/// Errors raised while talking to the ADC.
///
/// `SPI` and `PIN` are the error types of the bus and device-select line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error<SPI, PIN> {
    /// A byte exchange or flush on the SPI bus failed.
    Spi(SPI),
    /// Driving the device-select line failed.
    Pin(PIN),
    /// A bounded gated read gave up before its predicate held.
    GateExhausted {
        /// Number of samples taken and rejected.
        attempts: u32,
    },
}

impl<SPI: fmt::Debug, PIN: fmt::Debug> fmt::Display for Error<SPI, PIN> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi(e) => write!(f, "SPI transfer failed: {e:?}"),
            Self::Pin(e) => write!(f, "device select line failed: {e:?}"),
            Self::GateExhausted { attempts } => {
                write!(f, "trigger condition not met after {attempts} samples")
            }
        }
    }
}

#[cfg(feature = "std")]
impl<SPI: fmt::Debug, PIN: fmt::Debug> std::error::Error for Error<SPI, PIN> {}

/// Result alias used throughout the driver.
pub type Result<T, SPI, PIN> = core::result::Result<T, Error<SPI, PIN>>;
