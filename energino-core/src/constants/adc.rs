//! ADC Characteristics
//!
//! The sensing board uses a 10-bit successive-approximation converter
//! referenced to the supply rail.

/// Number of discrete levels of the 10-bit converter.
///
/// Step size is `aref / ADC_LEVELS`, so a full-scale reading of
/// `ADC_MAX_READING` sits one step below the reference.
pub const ADC_LEVELS: f64 = 1024.0;

/// Largest raw value the converter reports.
pub const ADC_MAX_READING: u16 = 1023;

/// Standard reference voltage (mV) for a 5 V board.
///
/// Boards running the converter from a different rail pass their own value
/// through `Calibration::with_aref`.
pub const DEFAULT_AREF_MV: u32 = 5000;

/// Consecutive reads averaged by the blocking tuning routines.
///
/// At ~100 µs per conversion this holds the control loop for about a second.
pub const TUNING_SAMPLE_COUNT: u32 = 10_000;
