/// Protocol durations used by the driver.
///
/// The defaults follow the DHT11 datasheet: an 18 ms minimum start pulse
/// (20 ms used), a 20..40 us release, 80 us response pulses, and data bits
/// whose high time is ~26-28 us for a 0 and ~70 us for a 1.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// How long the host holds the line low to request a reading (ms).
    pub start_low_ms: u32,
    /// How long the host drives the line high before releasing it (us).
    pub release_high_us: u32,
    /// Deadline for each of the three response handshake edges (us).
    pub response_timeout_us: u32,
    /// Deadline for the rising edge that starts each data bit (us).
    pub bit_start_timeout_us: u32,
    /// Upper bound on a single high pulse measurement (us).
    pub pulse_cap_us: u32,
    /// High pulses strictly longer than this decode as 1 (us).
    pub bit_threshold_us: u32,
    /// Delay between two polls of the line while waiting for an edge (us).
    /// Zero polls back to back.
    pub poll_interval_us: u32,
}

impl Timing {
    /// Timings for the DHT11.
    pub const fn dht11() -> Self {
        Self {
            start_low_ms: 20,
            release_high_us: 30,
            response_timeout_us: 200,
            bit_start_timeout_us: 200,
            pulse_cap_us: 200,
            bit_threshold_us: 40,
            poll_interval_us: 1,
        }
    }

    pub const fn with_bit_threshold_us(mut self, threshold_us: u32) -> Self {
        self.bit_threshold_us = threshold_us;
        self
    }

    pub const fn with_poll_interval_us(mut self, interval_us: u32) -> Self {
        self.poll_interval_us = interval_us;
        self
    }

    pub const fn with_start_low_ms(mut self, start_low_ms: u32) -> Self {
        self.start_low_ms = start_low_ms;
        self
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self::dht11()
    }
}
