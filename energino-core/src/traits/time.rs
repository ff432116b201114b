//! Time Source Abstraction
//!
//! The sampling cycle only needs a millisecond counter that does not run
//! backwards. On the MCU that is the systick/millis counter; on a host it is
//! `Instant`; in tests it is a value the test advances by hand.

use crate::time::Timestamp;

/// Source of millisecond timestamps
///
/// ## Implementation Requirements
///
/// - `now()` must be cheap; it is called on every loop iteration
/// - Wraparound is the implementer's problem: widen a 32-bit hardware
///   counter to 64 bits before returning it
pub trait TimeSource {
    /// Current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}
