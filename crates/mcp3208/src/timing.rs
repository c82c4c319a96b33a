//! Clock abstraction and the integer arithmetic behind calibration and pacing.

/// Number of back-to-back reads used to calibrate the per-conversion baseline.
pub const CALIBRATION_SAMPLES: u16 = 256;

/// Number of reads used by an ad-hoc rate measurement.
pub const DEFAULT_MEASURE_SAMPLES: u16 = 64;

const NANOS_PER_SECOND: u64 = 1_000_000_000;
const NANOS_PER_MICRO: u64 = 1_000;

/// A free-running microsecond counter.
///
/// The counter may wrap around; elapsed time is always taken with wrapping subtraction,
/// so a single measurement window must stay below roughly 71 minutes.
pub trait MonotonicClock {
    /// Current counter value in microseconds.
    fn now_micros(&mut self) -> u32;
}

impl<F: FnMut() -> u32> MonotonicClock for F {
    fn now_micros(&mut self) -> u32 {
        self()
    }
}

/// [`MonotonicClock`] backed by [`std::time::Instant`], counting from construction.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    /// Start counting from now.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl MonotonicClock for StdClock {
    fn now_micros(&mut self) -> u32 {
        // Truncation gives the wrapping behaviour the trait expects.
        self.origin.elapsed().as_micros() as u32
    }
}

/// Divide rounding to the nearest integer, halves away from zero.
pub(crate) const fn div_round(n: u64, d: u64) -> u64 {
    (n + d / 2) / d
}

/// Average nanoseconds per sample for `samples` reads spanning `elapsed_us`.
pub(crate) fn average_ns(elapsed_us: u32, samples: u16) -> u32 {
    if samples == 0 {
        return 0;
    }

    let average = div_round(elapsed_us as u64 * NANOS_PER_MICRO, samples as u64);

    u32::try_from(average).unwrap_or(u32::MAX)
}

/// Desired sample period in nanoseconds, `None` for an unpaced (0 Hz) request.
pub(crate) fn sample_period_ns(frequency_hz: u32) -> Option<u64> {
    match frequency_hz {
        0 => None,
        hz => Some(div_round(NANOS_PER_SECOND, hz as u64)),
    }
}

/// Microseconds to wait after each conversion so that conversion plus wait spans
/// `period_ns`. Clamped to zero when the conversion alone already takes longer.
pub(crate) fn inter_sample_delay_us(period_ns: u64, baseline_ns: u32) -> u32 {
    let slack = period_ns as i64 - baseline_ns as i64;

    if slack <= 0 {
        return 0;
    }

    u32::try_from(slack as u64 / NANOS_PER_MICRO).unwrap_or(u32::MAX)
}
