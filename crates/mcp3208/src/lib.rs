//! Provides a driver for the Microchip MCP3208 12-bit ADC via the `embedded-hal` ecosystem.
//!
//! Beyond single conversions the driver can read bursts of samples, pace them to a
//! target sampling frequency using an empirically calibrated conversion time, and
//! hold off collection until a trigger condition on the raw value is met.
//!
//! The driver owns the device-select line and drives it around every conversion, so
//! it takes an [`SpiBus`] rather than an `SpiDevice`. Devices sharing one bus have to
//! be serialized by the caller.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

pub mod command;
pub mod conversion;
pub mod error;
pub mod mcp3208;
pub mod timing;

#[cfg(test)]
mod mock;

pub use command::{Channel, Command};
pub use conversion::Conversion;
pub use error::Error;
pub use mcp3208::Mcp3208;
#[cfg(feature = "std")]
pub use timing::StdClock;
pub use timing::{MonotonicClock, CALIBRATION_SAMPLES, DEFAULT_MEASURE_SAMPLES};

/// Number of distinct output codes.
pub const RESOLUTION: u16 = 4096;

/// Largest output code.
pub const MAX_CODE: u16 = RESOLUTION - 1;

/// Internal method for one conversion: three full-duplex bytes with the device selected.
pub(crate) fn transfer<SPI: SpiBus, CS: OutputPin>(
    spi: &mut SPI,
    cs: &mut CS,
    command: Command,
) -> error::Result<u16, SPI::Error, CS::Error> {
    cs.set_low().map_err(Error::<SPI::Error, CS::Error>::Pin)?;

    let exchanged = exchange_frame(spi, command);

    // Release the device even when the bus failed part way through.
    let released = cs.set_high().map_err(Error::<SPI::Error, CS::Error>::Pin);

    let [high, low] = exchanged.map_err(Error::<SPI::Error, CS::Error>::Spi)?;
    released?;

    // Only B11..B8 of the second response byte are defined.
    let result = (((high & 0x0F) as u16) << 8) | low as u16;

    log::trace!("{command:?} -> {result}");

    Ok(result)
}

fn exchange_frame<SPI: SpiBus>(spi: &mut SPI, command: Command) -> Result<[u8; 2], SPI::Error> {
    // Start bit, SGL/DIFF and D2; nothing useful comes back yet.
    exchange(spi, command.high_byte())?;
    // D1, D0 out; null bit and B11..B8 in.
    let high = exchange(spi, command.low_byte())?;
    // Clock out B7..B0.
    let low = exchange(spi, 0x00)?;

    spi.flush()?;

    Ok([high, low])
}

fn exchange<SPI: SpiBus>(spi: &mut SPI, byte: u8) -> Result<u8, SPI::Error> {
    let mut buffer = [byte];

    spi.transfer_in_place(&mut buffer)?;

    Ok(buffer[0])
}
