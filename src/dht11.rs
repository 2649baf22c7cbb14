use embedded_hal::delay::DelayNs;

use crate::error::DhtError;
use crate::frame::{BitSample, FRAME_BITS, RawFrame, Reading};
use crate::hal::{DataPin, ReadIndicator, TickCounter};
use crate::timing::Timing;
use crate::trace::{HandshakePhase, NoTrace, Trace, TraceEntry, TraceEvent, TraceSink};

/// Whether a read records a diagnostic [`Trace`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadMode {
    #[default]
    Normal,
    Diagnostic,
}

/// Result of waiting for the line to reach a level, with the time waited (us).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    Seen(u32),
    TimedOut(u32),
}

impl Edge {
    fn waited_us(self) -> u32 {
        match self {
            Edge::Seen(us) | Edge::TimedOut(us) => us,
        }
    }

    fn timed_out(self) -> bool {
        matches!(self, Edge::TimedOut(_))
    }
}

/// Driver for the DHT11 temperature and humidity sensor.
pub struct Dht11<PIN, D, C, I = ()> {
    pin: PIN,
    delay: D,
    clock: C,
    indicator: I,
    timing: Timing,
    origin: u32,
}

impl<PIN, DELAY, CLOCK, E> Dht11<PIN, DELAY, CLOCK>
where
    PIN: DataPin<Error = E>,
    DELAY: DelayNs,
    CLOCK: TickCounter,
{
    /// Creates a new instance of the DHT11 driver.
    ///
    /// # Arguments
    ///
    /// * `pin` - The GPIO pin connected to the DHT11 data line.
    /// * `delay` - A delay provider implementing the `DelayNs` trait.
    /// * `clock` - A free-running tick counter used to measure pulse widths.
    pub fn new(pin: PIN, delay: DELAY, clock: CLOCK) -> Self {
        Dht11 {
            pin,
            delay,
            clock,
            indicator: (),
            timing: Timing::default(),
            origin: 0,
        }
    }
}

impl<PIN, DELAY, CLOCK, IND, E> Dht11<PIN, DELAY, CLOCK, IND>
where
    PIN: DataPin<Error = E>,
    DELAY: DelayNs,
    CLOCK: TickCounter,
    IND: ReadIndicator,
{
    /// Replaces the read indicator, e.g. with one that blinks an LED.
    pub fn with_indicator<I2: ReadIndicator>(self, indicator: I2) -> Dht11<PIN, DELAY, CLOCK, I2> {
        Dht11 {
            pin: self.pin,
            delay: self.delay,
            clock: self.clock,
            indicator,
            timing: self.timing,
            origin: self.origin,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Gives back the pin, delay, clock and indicator.
    pub fn release(self) -> (PIN, DELAY, CLOCK, IND) {
        (self.pin, self.delay, self.clock, self.indicator)
    }

    /// Reads a temperature and humidity measurement from the DHT11 sensor.
    ///
    /// This method performs the complete DHT11 communication sequence:
    /// sending a start signal, waiting for the sensor's response,
    /// reading 40 bits, validating the checksum and the value ranges.
    ///
    /// The sensor needs at least one second between two reads; this driver
    /// does not enforce it.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` if the read is successful and the data is valid.
    /// * `Err(DhtError)` if a communication, checksum or range error occurs.
    pub fn read(&mut self) -> Result<Reading, DhtError<E>> {
        self.read_traced(&mut NoTrace)
    }

    /// Same as [`read`](Self::read), additionally returning a trace of
    /// every protocol step, whatever the outcome.
    pub fn read_diagnostic(&mut self) -> (Result<Reading, DhtError<E>>, Trace) {
        let mut trace = Trace::new();
        let result = self.read_traced(&mut trace);
        (result, trace)
    }

    /// Reads in the given mode. A trace is returned in diagnostic mode only.
    pub fn read_mode(&mut self, mode: ReadMode) -> (Result<Reading, DhtError<E>>, Option<Trace>) {
        match mode {
            ReadMode::Normal => (self.read(), None),
            ReadMode::Diagnostic => {
                let (result, trace) = self.read_diagnostic();
                (result, Some(trace))
            }
        }
    }

    /// Reads a measurement, reporting each protocol step to `sink`.
    ///
    /// The indicator is told the read started and finished exactly once,
    /// and the sink receives a terminal `Success` or `Failed` entry.
    pub fn read_traced<S: TraceSink>(&mut self, sink: &mut S) -> Result<Reading, DhtError<E>> {
        self.origin = self.clock.ticks();
        self.indicator.read_started();
        let result = self.run(sink);
        self.indicator.read_finished();

        match &result {
            Ok(reading) => {
                self.note(sink, TraceEvent::Success);
                debug!("dht11: {}", reading);
            }
            Err(e) => {
                let kind = e.kind();
                self.note(sink, TraceEvent::Failed(kind));
                warn!("dht11: read failed: {}", kind);
            }
        }
        result
    }

    fn run<S: TraceSink>(&mut self, sink: &mut S) -> Result<Reading, DhtError<E>> {
        // Informational only: a failed read here must not fail the read
        if S::ENABLED {
            if let Ok(high) = self.pin.is_high() {
                self.note(sink, TraceEvent::InitialLevel { high });
            }
        }

        // MCU sends start request
        self.pin.set_output()?;
        self.pin.set_low()?;
        self.note(
            sink,
            TraceEvent::StartSignal {
                low_ms: self.timing.start_low_ms,
            },
        );
        self.delay.delay_ms(self.timing.start_low_ms);

        let captured = critical_section::with(|_cs| self.exchange(sink));
        self.note(sink, TraceEvent::CriticalSectionExited);
        let frame = captured?;

        self.note(sink, TraceEvent::RawData(frame));
        self.note(
            sink,
            TraceEvent::Checksum {
                computed: frame.checksum(),
                received: frame.received_checksum(),
            },
        );
        if !frame.is_checksum_valid() {
            return Err(DhtError::ChecksumMismatch);
        }

        self.note(sink, TraceEvent::Decoded(frame.reading_unchecked()));
        frame.decode().map_err(DhtError::from_frame)
    }

    /// The timing-critical part: release the line, follow the sensor's
    /// handshake and capture all 40 bits.
    fn exchange<S: TraceSink>(&mut self, sink: &mut S) -> Result<RawFrame, DhtError<E>> {
        self.note(sink, TraceEvent::CriticalSectionEntered);

        self.pin.set_high()?;
        self.delay.delay_us(self.timing.release_high_us);
        self.note(
            sink,
            TraceEvent::ReleaseSignal {
                high_us: self.timing.release_high_us,
            },
        );
        self.pin.set_input_pull_up()?;
        self.note(sink, TraceEvent::InputMode);

        // Waiting for DHT11 Response: 80us low, 80us high
        for phase in HandshakePhase::ALL {
            let edge = self.wait_for_level(phase.awaited_high(), self.timing.response_timeout_us)?;
            self.note(
                sink,
                TraceEvent::Handshake {
                    phase,
                    waited_us: edge.waited_us(),
                    timed_out: edge.timed_out(),
                },
            );
            if edge.timed_out() {
                return Err(match phase {
                    HandshakePhase::ResponseLow => DhtError::NoResponse,
                    HandshakePhase::ResponseHigh => DhtError::InvalidResponse,
                    HandshakePhase::DataReady => DhtError::ResponseTooLong,
                });
            }
        }

        self.note(
            sink,
            TraceEvent::DataStarted {
                threshold_us: self.timing.bit_threshold_us,
            },
        );

        let mut frame = RawFrame::default();
        for index in 0..FRAME_BITS {
            let sample = match self.read_bit(index) {
                Ok(sample) => sample,
                Err(e) => {
                    self.note(sink, TraceEvent::BitsRead { count: index });
                    return Err(e);
                }
            };
            if sample.value {
                frame.set_bit(index);
            }
            if sample.is_logged() {
                self.note(sink, TraceEvent::Bit(sample));
            }
        }
        self.note(sink, TraceEvent::BitsRead { count: FRAME_BITS });
        Ok(frame)
    }

    /// Reads a single bit from the sensor.
    ///
    /// The bit is determined by how long the line stays high after the
    /// sensor's ~50us low separator.
    fn read_bit(&mut self, index: u8) -> Result<BitSample, DhtError<E>> {
        if self
            .wait_for_level(true, self.timing.bit_start_timeout_us)?
            .timed_out()
        {
            return Err(DhtError::BitTimeout(index));
        }

        let cap = self.us_to_ticks(self.timing.pulse_cap_us);
        let start = self.clock.ticks();
        // A line stuck high is cut off at the cap
        while !self.pin.is_low()? {
            if self.clock.ticks().wrapping_sub(start) > cap {
                break;
            }
        }
        let end = self.clock.ticks();
        let high_us = self.ticks_to_us(end.wrapping_sub(start));

        Ok(BitSample::classify(
            index,
            high_us,
            self.timing.bit_threshold_us,
        ))
    }

    /// Polls the line until it reaches the given level or `timeout_us` has
    /// passed on the tick counter.
    ///
    /// Returns the edge along with the time waited for it, which on timeout
    /// is the time actually spent polling.
    fn wait_for_level(&mut self, high: bool, timeout_us: u32) -> Result<Edge, E> {
        let limit = self.us_to_ticks(timeout_us);
        let start = self.clock.ticks();
        loop {
            let reached = if high {
                self.pin.is_high()?
            } else {
                self.pin.is_low()?
            };
            let elapsed = self.clock.ticks().wrapping_sub(start);
            if reached {
                return Ok(Edge::Seen(self.ticks_to_us(elapsed)));
            }
            if elapsed >= limit {
                return Ok(Edge::TimedOut(self.ticks_to_us(elapsed)));
            }
            if self.timing.poll_interval_us > 0 {
                self.delay.delay_us(self.timing.poll_interval_us);
            }
        }
    }

    fn note<S: TraceSink>(&mut self, sink: &mut S, event: TraceEvent) {
        if S::ENABLED {
            let now = self.clock.ticks();
            let at_us = self.ticks_to_us(now.wrapping_sub(self.origin));
            sink.record(TraceEntry { at_us, event });
        }
    }

    fn us_to_ticks(&self, us: u32) -> u32 {
        us.saturating_mul(self.clock.ticks_per_us())
    }

    fn ticks_to_us(&self, ticks: u32) -> u32 {
        ticks / self.clock.ticks_per_us().max(1)
    }
}
