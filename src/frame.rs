use core::fmt;

use crate::error::FrameError;

/// Number of data bits in one DHT11 transmission.
pub const FRAME_BITS: u8 = 40;

/// Highest relative humidity accepted, in percent.
pub const MAX_HUMIDITY: f32 = 100.0;
/// Lowest temperature accepted, in degrees Celsius.
pub const MIN_TEMPERATURE: f32 = -40.0;
/// Highest temperature accepted, in degrees Celsius.
pub const MAX_TEMPERATURE: f32 = 60.0;

/// Reading returned by the DHT11 sensor.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub relative_humidity: f32,
}

impl Reading {
    /// Whether both values lie in the range the sensor can physically report.
    pub fn is_plausible(&self) -> bool {
        self.relative_humidity <= MAX_HUMIDITY
            && self.temperature <= MAX_TEMPERATURE
            && self.temperature >= MIN_TEMPERATURE
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} °C, {:.1} %RH",
            self.temperature, self.relative_humidity
        )
    }
}

/// The five bytes captured from the wire.
///
/// Byte 0 is integral humidity, byte 2 integral temperature with bit 7 as
/// the sign flag, byte 4 the checksum. Bytes 1 and 3 carry fractional parts
/// which the DHT11 always sends as zero; they only take part in the checksum.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawFrame([u8; 5]);

impl RawFrame {
    pub const fn new(bytes: [u8; 5]) -> Self {
        RawFrame(bytes)
    }

    pub const fn bytes(&self) -> [u8; 5] {
        self.0
    }

    /// Sets the bit at `index` (0..40), most significant bit first.
    pub fn set_bit(&mut self, index: u8) {
        debug_assert!(index < FRAME_BITS);
        let byte = usize::from(index / 8);
        self.0[byte] |= 1 << (7 - index % 8);
    }

    /// Checksum computed over the four data bytes.
    pub fn checksum(&self) -> u8 {
        self.0[..4].iter().fold(0u8, |sum, v| sum.wrapping_add(*v))
    }

    /// Checksum byte as sent by the sensor.
    pub fn received_checksum(&self) -> u8 {
        self.0[4]
    }

    pub fn is_checksum_valid(&self) -> bool {
        self.checksum() == self.received_checksum()
    }

    /// Decodes the data bytes without checksum or range validation.
    pub fn reading_unchecked(&self) -> Reading {
        let [humidity, _, temp, _, _] = self.0;

        // 0x80 is a signed zero; keep it positive
        let magnitude = f32::from(temp & 0b0111_1111);
        let temperature = if temp & 0b1000_0000 != 0 && magnitude != 0.0 {
            -magnitude
        } else {
            magnitude
        };

        Reading {
            temperature,
            relative_humidity: f32::from(humidity),
        }
    }

    /// Validates the checksum and the value ranges, then decodes.
    pub fn decode(&self) -> Result<Reading, FrameError> {
        if !self.is_checksum_valid() {
            return Err(FrameError::ChecksumMismatch);
        }
        let reading = self.reading_unchecked();
        if !reading.is_plausible() {
            return Err(FrameError::OutOfRange);
        }
        Ok(reading)
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e] = self.0;
        write!(f, "{a:02X} {b:02X} {c:02X} {d:02X} {e:02X}")
    }
}

/// One decoded data bit and the high pulse it was decoded from.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitSample {
    /// Position in the frame, 0..40.
    pub index: u8,
    /// Measured high pulse in microseconds.
    pub high_us: u32,
    pub value: bool,
}

impl BitSample {
    /// A pulse strictly longer than `threshold_us` is a 1.
    pub fn classify(index: u8, high_us: u32, threshold_us: u32) -> Self {
        BitSample {
            index,
            high_us,
            value: high_us > threshold_us,
        }
    }

    /// Bits 0..16 and every eighth bit after that end up in a trace.
    pub fn is_logged(&self) -> bool {
        self.index < 16 || self.index % 8 == 7
    }
}
