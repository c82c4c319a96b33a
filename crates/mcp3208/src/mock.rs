//! Scripted stand-ins for the bus, select line, clock and delay, sharing one event log.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::spi::{self, ErrorKind, SpiBus};

use crate::MonotonicClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Select,
    Release,
    Exchange(u8),
    Flush,
    Delay(u32),
}

#[derive(Debug, Default, Clone)]
pub struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Completed conversions, counted by their closing flush.
    pub fn conversions(&self) -> usize {
        self.count(|event| matches!(event, Event::Flush))
    }

    /// Every delay requested so far, in microseconds.
    pub fn delays(&self) -> Vec<u32> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Delay(us) => Some(*us),
                _ => None,
            })
            .collect()
    }

    fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| f(event)).count()
    }

    fn push(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    /// A bus answering each conversion with the next of `samples`.
    pub fn bus(&self, samples: impl IntoIterator<Item = u16>) -> ScriptedBus {
        ScriptedBus {
            recorder: self.clone(),
            samples: samples.into_iter().collect(),
            fallback: None,
            position: 0,
            pending: 0,
            fail_after: None,
        }
    }

    pub fn pin(&self) -> RecordingPin {
        RecordingPin {
            recorder: self.clone(),
        }
    }

    pub fn delay(&self) -> RecordingDelay {
        RecordingDelay {
            recorder: self.clone(),
        }
    }

    /// A clock that only moves when the bus or delay does: `per_conversion_us` for each
    /// completed conversion plus every microsecond of delay.
    pub fn clock(&self, start_us: u32, per_conversion_us: u32) -> SimClock {
        SimClock {
            recorder: self.clone(),
            start_us,
            per_conversion_us,
        }
    }
}

pub struct ScriptedBus {
    recorder: Recorder,
    samples: VecDeque<u16>,
    fallback: Option<u16>,
    position: usize,
    pending: u16,
    fail_after: Option<usize>,
}

impl ScriptedBus {
    /// Keep answering `value` once the script runs out.
    pub fn then_repeat(mut self, value: u16) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Fail every exchange after the first `exchanges`.
    pub fn fail_after(&mut self, exchanges: usize) {
        self.fail_after = Some(exchanges);
    }

    fn exchange(&mut self, out: u8) -> Result<u8, ErrorKind> {
        if let Some(remaining) = self.fail_after.as_mut() {
            if *remaining == 0 {
                return Err(ErrorKind::Other);
            }
            *remaining -= 1;
        }

        self.recorder.push(Event::Exchange(out));

        let response = match self.position % 3 {
            0 => {
                self.pending = self
                    .samples
                    .pop_front()
                    .or(self.fallback)
                    .expect("conversion past the end of the script");
                0xFF
            }
            // Undefined upper bits and a null bit the driver has to mask away.
            1 => 0xE0 | (self.pending >> 8) as u8,
            _ => (self.pending & 0xFF) as u8,
        };

        self.position += 1;

        Ok(response)
    }
}

impl spi::ErrorType for ScriptedBus {
    type Error = ErrorKind;
}

impl SpiBus for ScriptedBus {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words {
            *word = self.exchange(0x00)?;
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        for word in words {
            self.exchange(*word)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        for (r, w) in read.iter_mut().zip(write) {
            *r = self.exchange(*w)?;
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        for word in words {
            *word = self.exchange(*word)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.recorder.push(Event::Flush);
        Ok(())
    }
}

pub struct RecordingPin {
    recorder: Recorder,
}

impl digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.recorder.push(Event::Select);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.recorder.push(Event::Release);
        Ok(())
    }
}

pub struct RecordingDelay {
    recorder: Recorder,
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.recorder.push(Event::Delay(ns / 1_000));
    }

    fn delay_us(&mut self, us: u32) {
        self.recorder.push(Event::Delay(us));
    }
}

pub struct SimClock {
    recorder: Recorder,
    start_us: u32,
    per_conversion_us: u32,
}

impl MonotonicClock for SimClock {
    fn now_micros(&mut self) -> u32 {
        let converting = (self.recorder.conversions() as u32).wrapping_mul(self.per_conversion_us);
        let waiting = self
            .recorder
            .delays()
            .into_iter()
            .fold(0u32, u32::wrapping_add);

        self.start_us.wrapping_add(converting).wrapping_add(waiting)
    }
}
