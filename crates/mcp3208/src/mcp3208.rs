use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

use crate::error::{Error, Result};
use crate::timing::{self, MonotonicClock, CALIBRATION_SAMPLES, DEFAULT_MEASURE_SAMPLES};
use crate::{transfer, Channel, Command, Conversion};

/// MCP3208 driver
///
/// Besides the bus and select line the driver holds a microsecond clock and a delay
/// provider, used to calibrate the conversion time and to pace rate-limited reads.
pub struct Mcp3208<SPI, CS, CLK, D> {
    spi: SPI,
    cs: CS,
    clock: CLK,
    delay: D,
    conversion: Conversion,
    conversion_ns: Option<u32>,
}

impl<SPI, CS, CLK, D> Mcp3208<SPI, CS, CLK, D> {
    /// Creates a new driver from an SPI bus and the device-select pin.
    /// Please ensure the SPI bus is in SPI mode 0 or 3.
    ///
    /// `vref_mv` is the reference voltage in millivolts.
    pub fn new(spi: SPI, cs: CS, clock: CLK, delay: D, vref_mv: u16) -> Self {
        Self {
            spi,
            cs,
            clock,
            delay,
            conversion: Conversion::new(vref_mv),
            conversion_ns: None,
        }
    }

    /// Give back the peripherals.
    pub fn release(self) -> (SPI, CS, CLK, D) {
        (self.spi, self.cs, self.clock, self.delay)
    }

    /// Scaling for this device's reference voltage.
    pub fn conversion(&self) -> Conversion {
        self.conversion
    }

    /// The reference voltage in millivolts.
    pub fn vref(&self) -> u16 {
        self.conversion.vref()
    }

    /// See [`Conversion::to_analog`].
    pub fn to_analog(&self, raw: u16) -> u16 {
        self.conversion.to_analog(raw)
    }

    /// See [`Conversion::to_digital`].
    pub fn to_digital(&self, mv: u16) -> u16 {
        self.conversion.to_digital(mv)
    }

    /// See [`Conversion::analog_resolution`].
    pub fn analog_resolution(&self) -> u16 {
        self.conversion.analog_resolution()
    }

    /// Calibrated duration of one conversion in nanoseconds, if calibrated.
    pub fn conversion_time_ns(&self) -> Option<u32> {
        self.conversion_ns
    }

    /// Forget the calibrated conversion time. The next rate-limited operation
    /// recalibrates.
    pub fn reset_calibration(&mut self) {
        self.conversion_ns = None;
    }
}

impl<SPI, CS, CLK, D> Mcp3208<SPI, CS, CLK, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    CLK: MonotonicClock,
    D: DelayNs,
{
    /// Read a channel and return the 12 bit value as a [`u16`].
    pub fn read(&mut self, ch: Channel) -> Result<u16, SPI::Error, CS::Error> {
        self.convert(Command::new(ch))
    }

    /// Fill `data` with back-to-back conversions of `ch`.
    ///
    /// Samples are stored as raw codes converted into `T`; no scaling is applied. An
    /// empty slice performs no conversions.
    pub fn read_many<T: From<u16>>(
        &mut self,
        ch: Channel,
        data: &mut [T],
    ) -> Result<(), SPI::Error, CS::Error> {
        self.collect(Command::new(ch), data, None)
    }

    /// Fill `data` with conversions of `ch` paced to roughly `frequency_hz`.
    ///
    /// The pause follows every sample, the last one included, so the call returns one
    /// pause after the final conversion. Requests faster than the hardware allows run
    /// unpaced. Calibrates on first use.
    pub fn read_many_at_rate<T: From<u16>>(
        &mut self,
        ch: Channel,
        data: &mut [T],
        frequency_hz: u32,
    ) -> Result<(), SPI::Error, CS::Error> {
        let delay_us = self.sample_delay_us(ch, frequency_hz)?;

        self.collect(Command::new(ch), data, Some(delay_us))
    }

    /// Discard conversions of `ch` until `predicate` accepts one, then fill `data`
    /// with the conversions that follow.
    ///
    /// This blocks for as long as the predicate rejects samples. See
    /// [`read_until_within`](Self::read_until_within) for a bounded variant.
    pub fn read_until<T, P>(
        &mut self,
        ch: Channel,
        data: &mut [T],
        predicate: P,
    ) -> Result<(), SPI::Error, CS::Error>
    where
        T: From<u16>,
        P: FnMut(u16) -> bool,
    {
        let command = Command::new(ch);

        self.gate(command, None, predicate)?;
        self.collect(command, data, None)
    }

    /// [`read_until`](Self::read_until), giving up with [`Error::GateExhausted`] once
    /// `max_attempts` samples have been rejected.
    pub fn read_until_within<T, P>(
        &mut self,
        ch: Channel,
        data: &mut [T],
        max_attempts: u32,
        predicate: P,
    ) -> Result<(), SPI::Error, CS::Error>
    where
        T: From<u16>,
        P: FnMut(u16) -> bool,
    {
        let command = Command::new(ch);

        self.gate(command, Some(max_attempts), predicate)?;
        self.collect(command, data, None)
    }

    /// [`read_until`](Self::read_until) with the collected samples paced like
    /// [`read_many_at_rate`](Self::read_many_at_rate). Gating itself runs unpaced.
    pub fn read_until_at_rate<T, P>(
        &mut self,
        ch: Channel,
        data: &mut [T],
        frequency_hz: u32,
        predicate: P,
    ) -> Result<(), SPI::Error, CS::Error>
    where
        T: From<u16>,
        P: FnMut(u16) -> bool,
    {
        let command = Command::new(ch);
        let delay_us = self.sample_delay_us(ch, frequency_hz)?;

        self.gate(command, None, predicate)?;
        self.collect(command, data, Some(delay_us))
    }

    /// [`read_until_at_rate`](Self::read_until_at_rate) with a bound on rejected samples.
    pub fn read_until_at_rate_within<T, P>(
        &mut self,
        ch: Channel,
        data: &mut [T],
        frequency_hz: u32,
        max_attempts: u32,
        predicate: P,
    ) -> Result<(), SPI::Error, CS::Error>
    where
        T: From<u16>,
        P: FnMut(u16) -> bool,
    {
        let command = Command::new(ch);
        let delay_us = self.sample_delay_us(ch, frequency_hz)?;

        self.gate(command, Some(max_attempts), predicate)?;
        self.collect(command, data, Some(delay_us))
    }

    /// Time `samples` back-to-back conversions of `ch` and return the average
    /// nanoseconds per conversion.
    pub fn measure_conversion_rate(
        &mut self,
        ch: Channel,
        samples: u16,
    ) -> Result<u32, SPI::Error, CS::Error> {
        self.measure(Command::new(ch), samples, None)
    }

    /// [`measure_conversion_rate`](Self::measure_conversion_rate) over
    /// [`DEFAULT_MEASURE_SAMPLES`] conversions.
    pub fn measure_conversion_rate_default(
        &mut self,
        ch: Channel,
    ) -> Result<u32, SPI::Error, CS::Error> {
        self.measure_conversion_rate(ch, DEFAULT_MEASURE_SAMPLES)
    }

    /// Average nanoseconds per sample actually achieved when pacing to `frequency_hz`,
    /// measured over `samples` conversions.
    pub fn measure_rate_at(
        &mut self,
        ch: Channel,
        samples: u16,
        frequency_hz: u32,
    ) -> Result<u32, SPI::Error, CS::Error> {
        let delay_us = self.sample_delay_us(ch, frequency_hz)?;

        self.measure(Command::new(ch), samples, Some(delay_us))
    }

    /// Measure the conversion time over [`CALIBRATION_SAMPLES`] conversions and keep it
    /// as the baseline for pacing, replacing any earlier value.
    pub fn calibrate(&mut self, ch: Channel) -> Result<u32, SPI::Error, CS::Error> {
        let ns = self.measure_conversion_rate(ch, CALIBRATION_SAMPLES)?;

        log::debug!("calibrated on {ch:?}: {ns} ns per conversion");

        self.conversion_ns = Some(ns);

        Ok(ns)
    }

    /// Microseconds to pause after each conversion to approximate `frequency_hz`.
    ///
    /// Calibrates on `ch` first if no baseline is known. Returns zero when the rate is
    /// out of reach, and for a 0 Hz request, which means unpaced.
    pub fn sample_delay_us(
        &mut self,
        ch: Channel,
        frequency_hz: u32,
    ) -> Result<u32, SPI::Error, CS::Error> {
        let Some(period_ns) = timing::sample_period_ns(frequency_hz) else {
            log::warn!("0 Hz sampling requested, running unpaced");
            return Ok(0);
        };

        let baseline_ns = match self.conversion_ns {
            Some(ns) => ns,
            None => self.calibrate(ch)?,
        };

        let delay_us = timing::inter_sample_delay_us(period_ns, baseline_ns);

        if delay_us == 0 {
            log::debug!(
                "{frequency_hz} Hz is out of reach at {baseline_ns} ns per conversion, running unpaced"
            );
        } else {
            log::debug!("{frequency_hz} Hz: {delay_us} us between conversions");
        }

        Ok(delay_us)
    }

    fn convert(&mut self, command: Command) -> Result<u16, SPI::Error, CS::Error> {
        transfer(&mut self.spi, &mut self.cs, command)
    }

    fn collect<T: From<u16>>(
        &mut self,
        command: Command,
        data: &mut [T],
        delay_us: Option<u32>,
    ) -> Result<(), SPI::Error, CS::Error> {
        for slot in data.iter_mut() {
            *slot = T::from(self.convert(command)?);

            if let Some(us) = delay_us {
                self.delay.delay_us(us);
            }
        }

        Ok(())
    }

    fn gate<P: FnMut(u16) -> bool>(
        &mut self,
        command: Command,
        max_attempts: Option<u32>,
        mut predicate: P,
    ) -> Result<(), SPI::Error, CS::Error> {
        let mut attempts = 0u32;

        loop {
            if max_attempts.is_some_and(|max| attempts >= max) {
                return Err(Error::GateExhausted { attempts });
            }

            if predicate(self.convert(command)?) {
                log::trace!("trigger met after {attempts} rejected samples");
                return Ok(());
            }

            attempts = attempts.saturating_add(1);
        }
    }

    fn measure(
        &mut self,
        command: Command,
        samples: u16,
        delay_us: Option<u32>,
    ) -> Result<u32, SPI::Error, CS::Error> {
        if samples == 0 {
            log::warn!("rate measurement over zero samples");
            return Ok(0);
        }

        let start = self.clock.now_micros();

        for _ in 0..samples {
            self.convert(command)?;

            if let Some(us) = delay_us {
                self.delay.delay_us(us);
            }
        }

        let elapsed_us = self.clock.now_micros().wrapping_sub(start);

        Ok(timing::average_ns(elapsed_us, samples))
    }
}
