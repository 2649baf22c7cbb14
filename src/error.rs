use core::fmt;

/// Possible errors from the DHT11 driver.
///
/// The variants separate an absent sensor (`NoResponse`) from wiring or
/// timing faults (`InvalidResponse`, `ResponseTooLong`, `BitTimeout`),
/// corrupted data (`ChecksumMismatch`) and implausible values (`OutOfRange`).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// The sensor never pulled the line low after the start signal.
    NoResponse,
    /// The sensor's response low pulse did not end in time.
    InvalidResponse,
    /// The sensor's response high pulse did not end in time.
    ResponseTooLong,
    /// Timed out waiting for the start of the data bit at this index.
    BitTimeout(u8),
    /// Checksum did not match the received data.
    ChecksumMismatch,
    /// Decoded values are outside the sensor's physical range.
    OutOfRange,
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> DhtError<E> {
    /// Classification of this error without the pin error payload.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoResponse => FailureKind::NoResponse,
            Self::InvalidResponse => FailureKind::InvalidResponse,
            Self::ResponseTooLong => FailureKind::ResponseTooLong,
            Self::BitTimeout(index) => FailureKind::BitTimeout(*index),
            Self::ChecksumMismatch => FailureKind::ChecksumMismatch,
            Self::OutOfRange => FailureKind::OutOfRange,
            Self::PinError(_) => FailureKind::Pin,
        }
    }

    pub(crate) fn from_frame(err: FrameError) -> Self {
        match err {
            FrameError::ChecksumMismatch => Self::ChecksumMismatch,
            FrameError::OutOfRange => Self::OutOfRange,
        }
    }
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}

impl<E: fmt::Debug> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinError(e) => write!(f, "pin error: {e:?}"),
            other => fmt::Display::fmt(&other.kind(), f),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for DhtError<E> {}

/// Errors from validating a captured [`RawFrame`](crate::RawFrame).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// Checksum byte does not equal the sum of the data bytes.
    ChecksumMismatch,
    /// Humidity or temperature is physically implausible.
    OutOfRange,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch => f.write_str("checksum mismatch"),
            Self::OutOfRange => f.write_str("values out of range"),
        }
    }
}

impl core::error::Error for FrameError {}

/// Payload-free classification of a failed read, as recorded in a trace.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    NoResponse,
    InvalidResponse,
    ResponseTooLong,
    BitTimeout(u8),
    ChecksumMismatch,
    OutOfRange,
    Pin,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => f.write_str("no response from sensor"),
            Self::InvalidResponse => f.write_str("invalid response timing"),
            Self::ResponseTooLong => f.write_str("response too long"),
            Self::BitTimeout(index) => write!(f, "bit {index} start timeout"),
            Self::ChecksumMismatch => f.write_str("checksum mismatch"),
            Self::OutOfRange => f.write_str("values out of range"),
            Self::Pin => f.write_str("pin error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_error_converts_with_question_mark() {
        fn fails() -> Result<(), DhtError<u8>> {
            Err::<(), u8>(7)?;
            Ok(())
        }
        assert_eq!(fails(), Err(DhtError::PinError(7)));
    }

    #[test]
    fn test_kind_drops_payload() {
        assert_eq!(DhtError::PinError(3u8).kind(), FailureKind::Pin);
        assert_eq!(DhtError::<()>::BitTimeout(12).kind(), FailureKind::BitTimeout(12));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DhtError::<()>::BitTimeout(5).to_string(),
            "bit 5 start timeout"
        );
        assert_eq!(DhtError::PinError(()).to_string(), "pin error: ()");
    }
}
