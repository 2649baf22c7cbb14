//! Host-side stand-ins for the sensor and the tick counter.
//!
//! [`Sensor`] plays back the DHT11 waveform on a simulated timeline shared by
//! the pin, the delay and the tick counter, so reads go through the exact
//! same timing code as on hardware.

use std::cell::RefCell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

use crate::dht11::Dht11;
use crate::hal::{DataPin, TickCounter};

/// Tick counter that advances by a fixed step on every read.
pub struct FakeClock {
    now: u32,
    step: u32,
    ticks_per_us: u32,
}

impl FakeClock {
    /// A 64 MHz counter that moves 1us per read.
    pub fn micros() -> Self {
        FakeClock::with_step_us(1)
    }

    /// A 64 MHz counter that moves `step_us` per read.
    pub fn with_step_us(step_us: u32) -> Self {
        FakeClock {
            now: 0,
            step: 64 * step_us,
            ticks_per_us: 64,
        }
    }
}

impl TickCounter for FakeClock {
    fn ticks(&mut self) -> u32 {
        let now = self.now;
        self.now = self.now.wrapping_add(self.step);
        now
    }

    fn ticks_per_us(&self) -> u32 {
        self.ticks_per_us
    }
}

const TICKS_PER_US: u32 = 64;
/// Cost of one pin read on the simulated timeline.
const PIN_READ_TICKS: u32 = TICKS_PER_US;

/// Levels the sensor drives after the host releases the line.
#[derive(Clone, Debug)]
pub struct Waveform {
    segments: Vec<(bool, u32)>,
    tail_high: bool,
}

impl Waveform {
    /// Keeps the response and the first `bits` bits, then holds the line low.
    pub fn truncate_after_bits(&mut self, bits: usize) {
        self.segments.truncate(3 + 2 * bits);
        self.tail_high = false;
    }

    fn level_at(&self, us: u32) -> bool {
        let mut start = 0;
        for &(high, len) in &self.segments {
            if us < start + len {
                return high;
            }
            start += len;
        }
        self.tail_high
    }
}

/// Waveform of a healthy sensor sending `bytes`.
pub fn encode_frame(bytes: [u8; 5]) -> Waveform {
    // pull-up until the sensor reacts, then 80us low and 80us high
    let mut segments = vec![(true, 20), (false, 80), (true, 80)];
    for byte in bytes {
        for i in 0..8 {
            let one = (byte >> (7 - i)) & 1 == 1;
            segments.push((false, 50));
            segments.push((true, if one { 70 } else { 27 }));
        }
    }
    segments.push((false, 50));
    Waveform {
        segments,
        tail_high: true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl digital::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

struct State {
    now: u32,
    driven_high: bool,
    released_at: Option<u32>,
    wave: Waveform,
    reads_left: Option<usize>,
}

impl State {
    fn advance(&mut self, ticks: u32) {
        self.now = self.now.wrapping_add(ticks);
    }

    fn level(&self) -> bool {
        match self.released_at {
            Some(at) => self
                .wave
                .level_at(self.now.wrapping_sub(at) / TICKS_PER_US),
            None => self.driven_high,
        }
    }
}

/// A simulated DHT11 on the end of a wire.
#[derive(Clone)]
pub struct Sensor {
    state: Rc<RefCell<State>>,
}

impl Sensor {
    pub fn new(wave: Waveform) -> Self {
        Sensor {
            state: Rc::new(RefCell::new(State {
                now: 0,
                driven_high: true,
                released_at: None,
                wave,
                reads_left: None,
            })),
        }
    }

    /// Nothing connected: the pull-up keeps the line high.
    pub fn absent() -> Self {
        Sensor::new(Waveform {
            segments: Vec::new(),
            tail_high: true,
        })
    }

    /// Makes every pin read after the first `reads` fail.
    pub fn fail_reads_after(&self, reads: usize) {
        self.state.borrow_mut().reads_left = Some(reads);
    }

    pub fn driver(&self) -> Dht11<SimPin, SimDelay, SimClock> {
        Dht11::new(
            SimPin(self.state.clone()),
            SimDelay(self.state.clone()),
            SimClock(self.state.clone()),
        )
    }
}

pub struct SimPin(Rc<RefCell<State>>);

impl ErrorType for SimPin {
    type Error = SimError;
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.0.borrow_mut();
        if let Some(left) = state.reads_left.as_mut() {
            if *left == 0 {
                return Err(SimError);
            }
            *left -= 1;
        }
        state.advance(PIN_READ_TICKS);
        Ok(state.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().driven_high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().driven_high = true;
        Ok(())
    }
}

impl DataPin for SimPin {
    fn set_output(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().released_at = None;
        Ok(())
    }

    fn set_input_pull_up(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.released_at = Some(state.now);
        Ok(())
    }
}

pub struct SimDelay(Rc<RefCell<State>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        let ticks = u64::from(ns) * u64::from(TICKS_PER_US) / 1000;
        self.0.borrow_mut().advance(ticks as u32);
    }
}

pub struct SimClock(Rc<RefCell<State>>);

impl TickCounter for SimClock {
    fn ticks(&mut self) -> u32 {
        let mut state = self.0.borrow_mut();
        state.advance(1);
        state.now
    }

    fn ticks_per_us(&self) -> u32 {
        TICKS_PER_US
    }
}
