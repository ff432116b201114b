//! Simulated peripherals for host runs and tests
//!
//! `SimulatedAdc` returns a settable level per pin and can be told to fail a
//! pin; `SimulatedRelay` remembers pin levels. Both cover pins `0..SIM_PINS`.

use crate::traits::{AnalogInput, RelayOutput};

/// Number of pins the simulated peripherals model
pub const SIM_PINS: usize = 16;

/// Error reported by a simulated conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// Pin outside `0..SIM_PINS`
    NoSuchPin(u8),
    /// Pin configured to fail
    Faulted(u8),
}

/// Analog input returning fixed per-pin levels
#[derive(Debug, Clone)]
pub struct SimulatedAdc {
    levels: [u16; SIM_PINS],
    failing: Option<u8>,
    reads: u32,
}

impl SimulatedAdc {
    /// All pins read zero
    pub const fn new() -> Self {
        Self {
            levels: [0; SIM_PINS],
            failing: None,
            reads: 0,
        }
    }

    /// Set the raw level subsequent reads of `pin` return
    pub fn set(&mut self, pin: u8, raw: u16) {
        if let Some(level) = self.levels.get_mut(usize::from(pin)) {
            *level = raw;
        }
    }

    /// Make reads of `pin` fail, or clear the fault with `None`
    pub fn fail_pin(&mut self, pin: Option<u8>) {
        self.failing = pin;
    }

    /// Completed conversions so far
    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl Default for SimulatedAdc {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogInput for SimulatedAdc {
    type Error = SimError;

    fn read(&mut self, pin: u8) -> nb::Result<u16, Self::Error> {
        if self.failing == Some(pin) {
            return Err(nb::Error::Other(SimError::Faulted(pin)));
        }

        let level = *self
            .levels
            .get(usize::from(pin))
            .ok_or(nb::Error::Other(SimError::NoSuchPin(pin)))?;
        self.reads += 1;
        Ok(level)
    }
}

/// Relay output remembering pin levels
#[derive(Debug, Clone, Default)]
pub struct SimulatedRelay {
    levels: [bool; SIM_PINS],
}

impl SimulatedRelay {
    /// All pins low
    pub const fn new() -> Self {
        Self {
            levels: [false; SIM_PINS],
        }
    }
}

impl RelayOutput for SimulatedRelay {
    fn set(&mut self, pin: u8, high: bool) {
        if let Some(level) = self.levels.get_mut(usize::from(pin)) {
            *level = high;
        }
    }

    fn is_high(&self, pin: u8) -> bool {
        self.levels.get(usize::from(pin)).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adc_returns_configured_level() {
        let mut adc = SimulatedAdc::new();
        adc.set(3, 777);
        assert_eq!(adc.read(3), Ok(777));
        assert_eq!(adc.read(4), Ok(0));
        assert_eq!(adc.reads(), 2);
    }

    #[test]
    fn adc_faults() {
        let mut adc = SimulatedAdc::new();
        adc.fail_pin(Some(1));
        assert_eq!(adc.read(1), Err(nb::Error::Other(SimError::Faulted(1))));
        assert_eq!(adc.read(200), Err(nb::Error::Other(SimError::NoSuchPin(200))));
    }

    #[test]
    fn relay_out_of_range_reads_low() {
        let mut relay = SimulatedRelay::new();
        relay.set(99, true);
        assert!(!relay.is_high(99));
    }
}
