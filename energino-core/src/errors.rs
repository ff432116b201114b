//! Error Types for the Measurement Core
//!
//! ## Design Philosophy
//!
//! The core runs inside a single cooperative control loop on a small MCU, so
//! errors follow the same rules as everything else on the hot path:
//!
//! 1. **No heap**: reasons are `&'static str`, payloads are plain integers.
//! 2. **Copy**: errors are returned by value and can be stashed for later
//!    reporting without lifetimes.
//! 3. **Recoverable by the caller**: nothing in the core panics across a
//!    component boundary. The loop decides whether to reset, ignore or log.
//!
//! ## Error Categories
//!
//! ### Configuration
//! - `CorruptSettings`: stored record missing, undecodable or from another build
//! - `InvalidCalibration`: a record that would divide by zero
//!
//! ### Construction
//! - `InvalidWindow`: a zero-capacity or oversized moving-average window
//!
//! ### Peripherals
//! - `AnalogRead`: the converter reported an error
//! - `Storage`: the block store rejected a read or write
//!
//! ### Formatting and Decoding
//! - `Encoding`: the record did not fit the settings block
//! - `Output`: a reply sink refused more text
//! - `MalformedTelemetry`: a host-side line did not match the frame layout
//! - `TuningRejected`: a tuning run produced an unusable value
//!
//! Invalid serial commands are deliberately *not* an error: the protocol has
//! no error channel, so the dispatcher reports them as ignored.

use thiserror_no_std::Error;

/// Result type for core operations
pub type EnerginoResult<T> = Result<T, EnerginoError>;

/// Core errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnerginoError {
    /// Moving-average capacity outside `1..=bound`
    #[error("Invalid window capacity {capacity} (storage holds {bound})")]
    InvalidWindow {
        /// Requested capacity
        capacity: usize,
        /// Compile-time storage bound
        bound: usize,
    },

    /// Stored settings record is missing, undecodable or has a foreign magic tag
    #[error("Settings record is corrupt or uninitialized")]
    CorruptSettings,

    /// Settings would make a conversion divide by zero
    #[error("Invalid calibration: {reason}")]
    InvalidCalibration {
        /// Which invariant failed
        reason: &'static str,
    },

    /// ADC read failed on the given channel
    #[error("Analog read failed on pin {pin}")]
    AnalogRead {
        /// Channel that failed
        pin: u8,
    },

    /// Block storage rejected the operation
    #[error("Storage error: {reason}")]
    Storage {
        /// Backend-specific reason
        reason: &'static str,
    },

    /// Settings record could not be encoded into its block
    #[error("Settings record does not fit the storage block")]
    Encoding,

    /// Reply sink refused output
    #[error("Reply output failed")]
    Output,

    /// Telemetry line did not match the expected layout
    #[error("Malformed telemetry line: {reason}")]
    MalformedTelemetry {
        /// What was wrong with the line
        reason: &'static str,
    },

    /// A tuning run produced a value that would break calibration invariants
    #[error("Tuning rejected: {reason}")]
    TuningRejected {
        /// Why the value was discarded
        reason: &'static str,
    },
}

impl From<core::fmt::Error> for EnerginoError {
    fn from(_: core::fmt::Error) -> Self {
        Self::Output
    }
}

impl From<postcard::Error> for EnerginoError {
    fn from(err: postcard::Error) -> Self {
        match err {
            postcard::Error::SerializeBufferFull => Self::Encoding,
            _ => Self::CorruptSettings,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EnerginoError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::InvalidWindow { capacity, bound } =>
                defmt::write!(fmt, "Window capacity {} outside 1..={}", capacity, bound),
            Self::CorruptSettings =>
                defmt::write!(fmt, "Corrupt settings"),
            Self::InvalidCalibration { reason } =>
                defmt::write!(fmt, "Invalid calibration: {}", reason),
            Self::AnalogRead { pin } =>
                defmt::write!(fmt, "Analog read failed on pin {}", pin),
            Self::Storage { reason } =>
                defmt::write!(fmt, "Storage: {}", reason),
            Self::Encoding =>
                defmt::write!(fmt, "Settings encoding overflow"),
            Self::Output =>
                defmt::write!(fmt, "Reply output failed"),
            Self::MalformedTelemetry { reason } =>
                defmt::write!(fmt, "Malformed telemetry: {}", reason),
            Self::TuningRejected { reason } =>
                defmt::write!(fmt, "Tuning rejected: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postcard_overflow_maps_to_encoding() {
        let err: EnerginoError = postcard::Error::SerializeBufferFull.into();
        assert_eq!(err, EnerginoError::Encoding);

        let err: EnerginoError = postcard::Error::DeserializeUnexpectedEnd.into();
        assert_eq!(err, EnerginoError::CorruptSettings);
    }
}
