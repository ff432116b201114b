//! Peripheral Traits
//!
//! Pins are identified by the raw numbers stored in the settings record, so
//! implementations map them onto whatever channel type the HAL uses.

use crate::constants::ADC_MAX_READING;
use crate::errors::{EnerginoError, EnerginoResult};

/// Single-shot analog input
///
/// Shaped like the embedded-hal 0.2 `OneShot` trait: a conversion may report
/// `WouldBlock` while in flight, and the core polls it to completion with
/// `nb::block!`. Conversions are bounded, so this never spins indefinitely
/// on working hardware.
pub trait AnalogInput {
    /// Converter error type
    type Error: core::fmt::Debug;

    /// Start or poll a conversion on `pin`, returning the raw 10-bit count
    fn read(&mut self, pin: u8) -> nb::Result<u16, Self::Error>;
}

/// Digital output driving the load relay
pub trait RelayOutput {
    /// Drive `pin` high (`true`) or low (`false`)
    fn set(&mut self, pin: u8, high: bool);

    /// Current level of `pin`
    fn is_high(&self, pin: u8) -> bool;
}

/// Byte-addressed persistent storage written in whole blocks
///
/// The medium is assumed to complete a block write atomically. There is no
/// checksum or redundancy layered on top; a torn write shows up as a corrupt
/// record on the next boot and triggers a factory reset.
pub trait BlockStorage {
    /// Fill `buf` with the bytes stored at `address..address + buf.len()`
    fn read_block(&mut self, address: usize, buf: &mut [u8]) -> EnerginoResult<()>;

    /// Store `data` at `address..address + data.len()`
    fn write_block(&mut self, address: usize, data: &[u8]) -> EnerginoResult<()>;
}

impl<T: AnalogInput + ?Sized> AnalogInput for &mut T {
    type Error = T::Error;

    fn read(&mut self, pin: u8) -> nb::Result<u16, Self::Error> {
        (**self).read(pin)
    }
}

impl<T: RelayOutput + ?Sized> RelayOutput for &mut T {
    fn set(&mut self, pin: u8, high: bool) {
        (**self).set(pin, high)
    }

    fn is_high(&self, pin: u8) -> bool {
        (**self).is_high(pin)
    }
}

impl<T: BlockStorage + ?Sized> BlockStorage for &mut T {
    fn read_block(&mut self, address: usize, buf: &mut [u8]) -> EnerginoResult<()> {
        (**self).read_block(address, buf)
    }

    fn write_block(&mut self, address: usize, data: &[u8]) -> EnerginoResult<()> {
        (**self).write_block(address, data)
    }
}

/// Block until `pin` yields a conversion, clamped to the 10-bit range
pub fn sample<A: AnalogInput + ?Sized>(adc: &mut A, pin: u8) -> EnerginoResult<u16> {
    match nb::block!(adc.read(pin)) {
        Ok(raw) => Ok(raw.min(ADC_MAX_READING)),
        Err(_err) => {
            log_warn!("ADC read on pin {} failed: {:?}", pin, _err);
            Err(EnerginoError::AnalogRead { pin })
        }
    }
}
