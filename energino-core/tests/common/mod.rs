//! Shared fixtures for integration tests
//!
//! - Booted devices over simulated peripherals and in-memory storage
//! - Raw ADC levels for common bench setups
//! - Reply capture helpers

#![allow(dead_code)]

use energino_core::sim::{SimulatedAdc, SimulatedRelay};
use energino_core::{CalibrationSettings, CommandOutcome, Energino, MemoryStorage, SettingsStore};
use heapless::String;

/// Storage size used by every fixture
pub const STORAGE_BYTES: usize = 256;

/// Device type used across the integration suites
pub type BenchDevice = Energino<SimulatedAdc, SimulatedRelay, MemoryStorage<STORAGE_BYTES>>;

/// Reply buffer large enough for a full settings dump
pub type Reply = String<512>;

/// Raw count the factory offset (2500 mV) sits at on a 5 V reference
pub const ZERO_CURRENT_RAW: u16 = 512;

/// Boot over blank storage
pub fn boot() -> BenchDevice {
    boot_from(MemoryStorage::new())
}

/// Boot over existing storage contents
pub fn boot_from(storage: MemoryStorage<STORAGE_BYTES>) -> BenchDevice {
    Energino::init(SimulatedAdc::new(), SimulatedRelay::new(), storage)
        .expect("boot over simulated peripherals")
        .with_tuning_samples(200)
}

/// Storage holding `settings` at the standard address
pub fn storage_with(settings: &CalibrationSettings) -> MemoryStorage<STORAGE_BYTES> {
    let mut store = SettingsStore::new(MemoryStorage::new());
    store.save(settings).expect("save fixture settings");
    store.into_inner()
}

/// Send one command line and capture the reply
pub fn send(device: &mut BenchDevice, line: &str) -> (CommandOutcome, Reply) {
    let mut reply = Reply::new();
    let outcome = device.handle_line(line, &mut reply).expect("command executes");
    (outcome, reply)
}

/// Set both channel levels on the simulated converter
pub fn drive(device: &mut BenchDevice, voltage_raw: u16, current_raw: u16) {
    let voltage_pin = device.settings().voltage_pin;
    let current_pin = device.settings().current_pin;
    device.adc_mut().set(voltage_pin, voltage_raw);
    device.adc_mut().set(current_pin, current_raw);
}
