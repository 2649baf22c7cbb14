//! Diagnostic trace of a single read.
//!
//! The driver reports every protocol step to a [`TraceSink`]. Normal reads
//! use [`NoTrace`], which compiles the reporting away; diagnostic reads use
//! a [`Trace`], which keeps structured entries that the caller can inspect or
//! render as text.

use core::fmt;

use heapless::Vec;

use crate::error::FailureKind;
use crate::frame::{BitSample, RawFrame, Reading};

/// Default number of entries kept by a [`Trace`].
pub const TRACE_CAPACITY: usize = 48;

/// One of the three edges the sensor produces in response to the start
/// signal.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandshakePhase {
    /// Line goes low: the sensor starts its 80 us response.
    ResponseLow,
    /// Line goes high: the 80 us low pulse ended.
    ResponseHigh,
    /// Line goes low again: the 80 us high pulse ended, data follows.
    DataReady,
}

impl HandshakePhase {
    pub const ALL: [HandshakePhase; 3] = [
        HandshakePhase::ResponseLow,
        HandshakePhase::ResponseHigh,
        HandshakePhase::DataReady,
    ];

    /// Line level that completes this phase.
    pub fn awaited_high(self) -> bool {
        matches!(self, HandshakePhase::ResponseHigh)
    }
}

impl fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakePhase::ResponseLow => f.write_str("Wait for LOW"),
            HandshakePhase::ResponseHigh => f.write_str("Response LOW"),
            HandshakePhase::DataReady => f.write_str("Response HIGH"),
        }
    }
}

/// A single protocol step.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TraceEvent {
    /// Line level before the driver touched it.
    InitialLevel { high: bool },
    StartSignal { low_ms: u32 },
    CriticalSectionEntered,
    ReleaseSignal { high_us: u32 },
    InputMode,
    Handshake {
        phase: HandshakePhase,
        waited_us: u32,
        timed_out: bool,
    },
    DataStarted { threshold_us: u32 },
    Bit(BitSample),
    /// Number of bits captured before capture ended.
    BitsRead { count: u8 },
    CriticalSectionExited,
    RawData(RawFrame),
    Checksum { computed: u8, received: u8 },
    Decoded(Reading),
    Success,
    Failed(FailureKind),
}

impl TraceEvent {
    /// Whether this event closes a trace.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TraceEvent::Success | TraceEvent::Failed(_))
    }
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::InitialLevel { high } => {
                let level = if *high { "HIGH" } else { "LOW" };
                write!(f, "Initial pin state: {level}")
            }
            TraceEvent::StartSignal { low_ms } => {
                write!(f, "Start signal: pin LOW for {low_ms}ms")
            }
            TraceEvent::CriticalSectionEntered => f.write_str("Critical section: interrupts disabled"),
            TraceEvent::ReleaseSignal { high_us } => {
                write!(f, "Release signal: pin HIGH for {high_us}us")
            }
            TraceEvent::InputMode => f.write_str("Input mode: pull-up enabled"),
            TraceEvent::Handshake {
                phase,
                waited_us,
                timed_out,
            } => {
                write!(f, "{phase}: {waited_us}us")?;
                if *timed_out {
                    f.write_str(" (timeout)")?;
                }
                Ok(())
            }
            TraceEvent::DataStarted { threshold_us } => {
                write!(f, "Data transmission started (th:{threshold_us}us)")
            }
            TraceEvent::Bit(sample) => write!(
                f,
                "Bit {}: {}us = {}",
                sample.index,
                sample.high_us,
                u8::from(sample.value)
            ),
            TraceEvent::BitsRead { count } => write!(f, "Bits read: {count}/40"),
            TraceEvent::CriticalSectionExited => f.write_str("Critical section: interrupts enabled"),
            TraceEvent::RawData(frame) => write!(f, "Raw data: {frame}"),
            TraceEvent::Checksum { computed, received } => {
                write!(f, "Checksum calc: {computed:02X}, received: {received:02X}")
            }
            TraceEvent::Decoded(reading) => write!(
                f,
                "Humidity: {:.1}%, Temperature: {:.1}°C",
                reading.relative_humidity, reading.temperature
            ),
            TraceEvent::Success => f.write_str("SUCCESS: read completed"),
            TraceEvent::Failed(FailureKind::NoResponse) => write!(
                f,
                "ERROR: {} (check VCC, GND and DATA wiring)",
                FailureKind::NoResponse
            ),
            TraceEvent::Failed(kind) => write!(f, "ERROR: {kind}"),
        }
    }
}

/// An event together with the time it was recorded.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceEntry {
    /// Microseconds since the read started.
    pub at_us: u32,
    pub event: TraceEvent,
}

/// Receiver for protocol steps.
pub trait TraceSink {
    /// When false the driver skips building entries altogether.
    const ENABLED: bool;

    fn record(&mut self, entry: TraceEntry);
}

/// Sink used by normal reads. Records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTrace;

impl TraceSink for NoTrace {
    const ENABLED: bool = false;

    fn record(&mut self, _entry: TraceEntry) {}
}

impl<T: TraceSink + ?Sized> TraceSink for &mut T {
    const ENABLED: bool = T::ENABLED;

    fn record(&mut self, entry: TraceEntry) {
        T::record(self, entry)
    }
}

/// Bounded, ordered record of one read.
///
/// The last slot is reserved for the terminal `Success`/`Failed` entry.
/// Once the other `N - 1` slots are full, further entries are dropped and
/// counted, so a full trace still ends with the outcome.
#[derive(Clone, Debug, Default)]
pub struct Trace<const N: usize = TRACE_CAPACITY> {
    entries: Vec<TraceEntry, N>,
    dropped: usize,
    frame: Option<RawFrame>,
    reading: Option<Reading>,
}

impl<const N: usize> Trace<N> {
    pub const fn new() -> Self {
        Trace {
            entries: Vec::new(),
            dropped: 0,
            frame: None,
            reading: None,
        }
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of entries that did not fit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Frame captured from the wire, if bit capture completed.
    pub fn frame(&self) -> Option<RawFrame> {
        self.frame
    }

    /// Decoded values, if the checksum matched.
    ///
    /// Present even when the values were then rejected as out of range.
    pub fn reading(&self) -> Option<Reading> {
        self.reading
    }

    /// The terminal entry, once the read has finished.
    pub fn outcome(&self) -> Option<&TraceEvent> {
        self.entries
            .last()
            .map(|entry| &entry.event)
            .filter(|event| event.is_terminal())
    }

    pub fn bits(&self) -> impl Iterator<Item = &BitSample> {
        self.entries.iter().filter_map(|entry| match &entry.event {
            TraceEvent::Bit(sample) => Some(sample),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl<const N: usize> TraceSink for Trace<N> {
    const ENABLED: bool = true;

    fn record(&mut self, entry: TraceEntry) {
        match entry.event {
            TraceEvent::RawData(frame) => self.frame = Some(frame),
            TraceEvent::Decoded(reading) => self.reading = Some(reading),
            _ => {}
        }

        if !entry.event.is_terminal() && self.entries.len() + 1 >= N {
            self.dropped += 1;
            return;
        }
        if self.entries.push(entry).is_err() {
            self.dropped += 1;
        }
    }
}

impl<const N: usize> fmt::Display for Trace<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== DHT11 Debug Log ===")?;
        for entry in &self.entries {
            writeln!(f, "[{:>6}us] {}", entry.at_us, entry.event)?;
        }
        if self.dropped > 0 {
            writeln!(f, "... {} entries dropped", self.dropped)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(at_us: u32, event: TraceEvent) -> TraceEntry {
        TraceEntry { at_us, event }
    }

    #[test]
    fn test_records_in_order() {
        let mut trace: Trace = Trace::new();
        trace.record(entry(0, TraceEvent::StartSignal { low_ms: 20 }));
        trace.record(entry(20_000, TraceEvent::InputMode));
        trace.record(entry(20_100, TraceEvent::Success));

        let events: std::vec::Vec<_> = trace.entries().iter().map(|e| e.event).collect();
        assert_eq!(
            events,
            [
                TraceEvent::StartSignal { low_ms: 20 },
                TraceEvent::InputMode,
                TraceEvent::Success
            ]
        );
        assert_eq!(trace.outcome(), Some(&TraceEvent::Success));
        assert_eq!(trace.dropped(), 0);
    }

    #[test]
    fn test_truncation_keeps_terminal_entry() {
        let mut trace: Trace<4> = Trace::new();
        for at_us in 0..10 {
            trace.record(entry(at_us, TraceEvent::InputMode));
        }
        trace.record(entry(10, TraceEvent::Failed(FailureKind::NoResponse)));

        assert_eq!(trace.entries().len(), 4);
        assert_eq!(trace.dropped(), 7);
        assert_eq!(
            trace.outcome(),
            Some(&TraceEvent::Failed(FailureKind::NoResponse))
        );
        // the oldest entries are the ones kept
        assert_eq!(trace.entries()[2].at_us, 2);
    }

    #[test]
    fn test_frame_and_reading_survive_truncation() {
        let mut trace: Trace<1> = Trace::new();
        let frame = RawFrame::new([0x32, 0x00, 0x19, 0x00, 0x4B]);
        trace.record(entry(1, TraceEvent::RawData(frame)));
        trace.record(entry(2, TraceEvent::Decoded(frame.reading_unchecked())));
        trace.record(entry(3, TraceEvent::Success));

        assert_eq!(trace.entries().len(), 1);
        assert_eq!(trace.dropped(), 2);
        assert_eq!(trace.frame(), Some(frame));
        assert_eq!(trace.reading(), Some(frame.reading_unchecked()));
    }

    #[test]
    fn test_no_outcome_until_finished() {
        let mut trace: Trace = Trace::new();
        trace.record(entry(0, TraceEvent::CriticalSectionEntered));
        assert_eq!(trace.outcome(), None);
    }

    #[test]
    fn test_clear() {
        let mut trace: Trace<2> = Trace::new();
        let frame = RawFrame::new([1, 0, 1, 0, 2]);
        trace.record(entry(0, TraceEvent::RawData(frame)));
        trace.record(entry(1, TraceEvent::InputMode));
        trace.clear();

        assert!(trace.entries().is_empty());
        assert_eq!(trace.dropped(), 0);
        assert_eq!(trace.frame(), None);
    }

    #[test]
    fn test_render() {
        let mut trace: Trace<2> = Trace::new();
        trace.record(entry(
            85,
            TraceEvent::Handshake {
                phase: HandshakePhase::ResponseLow,
                waited_us: 200,
                timed_out: true,
            },
        ));
        trace.record(entry(90, TraceEvent::InputMode));
        trace.record(entry(95, TraceEvent::Failed(FailureKind::NoResponse)));

        assert_eq!(
            trace.to_string(),
            "=== DHT11 Debug Log ===\n\
             [    85us] Wait for LOW: 200us (timeout)\n\
             [    95us] ERROR: no response from sensor (check VCC, GND and DATA wiring)\n\
             ... 1 entries dropped\n"
        );
    }

    #[test]
    fn test_bit_rendering() {
        let event = TraceEvent::Bit(BitSample::classify(3, 71, 40));
        assert_eq!(event.to_string(), "Bit 3: 71us = 1");
        assert_eq!(
            TraceEvent::BitsRead { count: 12 }.to_string(),
            "Bits read: 12/40"
        );
    }

    #[test]
    fn test_wiring_hint_only_for_no_response() {
        assert_eq!(
            TraceEvent::Failed(FailureKind::ChecksumMismatch).to_string(),
            "ERROR: checksum mismatch"
        );
        assert!(
            TraceEvent::Failed(FailureKind::NoResponse)
                .to_string()
                .ends_with("(check VCC, GND and DATA wiring)")
        );
    }
}
