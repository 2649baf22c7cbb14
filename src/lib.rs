//! DHT11 Sensor Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for the DHT11 temperature
//! and humidity sensor, built on top of the [`embedded-hal`] traits.
//!
//! # Features
//! - Blocking synchronous API using `embedded-hal` traits
//! - Designed for `no_std` environments, no allocator needed
//! - Pulse widths measured against a tick counter, with deadline-based timeouts
//! - Timing-critical section run inside [`critical_section::with`]
//! - Diagnostic reads that return a structured [`Trace`] of every protocol step
//! - Optional logging support via `defmt` or `log`
//!
//! # Dependencies
//! This driver depends on the following traits:
//! - [`DataPin`], an [`InputPin`] + [`OutputPin`] that can switch direction
//!   ([`OpenDrain`] adapts any open-drain pin)
//! - [`DelayNs`] for the start signal and polling
//! - [`TickCounter`] for measuring pulse widths, e.g. a cycle counter
//!
//! # Example
//! ```ignore
//! let mut dht = Dht11::new(OpenDrain(pin), delay, cycle_counter);
//!
//! match dht.read() {
//!     Ok(reading) => info!("{} °C, {} %", reading.temperature, reading.relative_humidity),
//!     Err(e) => warn!("sensor error: {}", e.kind()),
//! }
//!
//! let (result, trace) = dht.read_diagnostic();
//! for entry in trace.entries() {
//!     info!("{}us {}", entry.at_us, entry.event);
//! }
//! ```
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` and logs read outcomes via `defmt`
//! - `log`: Logs read outcomes via `log`
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal
//! [`InputPin`]: embedded_hal::digital::InputPin
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

#[macro_use]
mod fmt;

pub mod dht11;
pub mod error;
pub mod frame;
pub mod hal;
pub mod timing;
pub mod trace;

#[cfg(test)]
mod sim;

pub use dht11::{Dht11, ReadMode};
pub use error::{DhtError, FailureKind, FrameError};
pub use frame::{BitSample, RawFrame, Reading};
pub use hal::{DataPin, OpenDrain, ReadIndicator, TickCounter};
pub use timing::Timing;
pub use trace::{HandshakePhase, NoTrace, Trace, TraceEntry, TraceEvent, TraceSink};
