//! Collaborator traits the driver is generic over.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

/// The single bidirectional data line of the sensor.
///
/// On top of the `embedded-hal` input and output traits, the driver needs to
/// flip the pin between push-pull output (start signal) and input with
/// pull-up (sensor response).
pub trait DataPin: InputPin + OutputPin {
    /// Configures the line as a push-pull output.
    fn set_output(&mut self) -> Result<(), Self::Error>;

    /// Configures the line as an input with the pull-up bias enabled.
    fn set_input_pull_up(&mut self) -> Result<(), Self::Error>;
}

/// Adapter for a pin already configured as open-drain with a pull-up.
///
/// Such a pin can be read while it is driven, and driving it high releases
/// the line, so direction changes are no-ops.
#[derive(Debug)]
pub struct OpenDrain<P>(pub P);

impl<P> OpenDrain<P> {
    pub fn into_inner(self) -> P {
        self.0
    }
}

impl<P: ErrorType> ErrorType for OpenDrain<P> {
    type Error = P::Error;
}

impl<P: InputPin> InputPin for OpenDrain<P> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }
}

impl<P: OutputPin> OutputPin for OpenDrain<P> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

impl<P: InputPin + OutputPin> DataPin for OpenDrain<P> {
    fn set_output(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_input_pull_up(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Free-running, wrapping tick counter used to time pulses.
///
/// Typically the core's cycle counter (e.g. DWT `CYCCNT` on Cortex-M).
pub trait TickCounter {
    /// Current counter value. Allowed to wrap.
    fn ticks(&mut self) -> u32;

    /// Number of ticks per microsecond, e.g. 64 for a 64 MHz core clock.
    fn ticks_per_us(&self) -> u32;
}

impl<T: TickCounter + ?Sized> TickCounter for &mut T {
    fn ticks(&mut self) -> u32 {
        T::ticks(self)
    }

    fn ticks_per_us(&self) -> u32 {
        T::ticks_per_us(self)
    }
}

/// Fire-and-forget notifications around each read, e.g. to blink an LED.
///
/// Each read calls `read_started` once and `read_finished` once, whatever
/// the outcome.
pub trait ReadIndicator {
    fn read_started(&mut self);
    fn read_finished(&mut self);
}

impl ReadIndicator for () {
    fn read_started(&mut self) {}
    fn read_finished(&mut self) {}
}

impl<T: ReadIndicator + ?Sized> ReadIndicator for &mut T {
    fn read_started(&mut self) {
        T::read_started(self)
    }

    fn read_finished(&mut self) {
        T::read_finished(self)
    }
}
