//! Device Context
//!
//! [`Energino`] owns everything the control loop touches: the peripherals,
//! the settings store, the live settings record and the sampling cycle.
//! There are no globals; the loop holds the one context and threads it
//! through each step.
//!
//! ## Control Loop
//!
//! ```text
//! loop {
//!     ┌─────────────────┐   ┌──────────────┐   ┌──────────────────────┐
//!     │ serial commands │ → │ poll (tick)  │ → │ telemetry / REST /   │
//!     │ handle_line     │   │ if period    │   │ push from measurement│
//!     └─────────────────┘   └──────────────┘   └──────────────────────┘
//! }
//! ```
//!
//! Every step runs to completion before the next starts. `&mut self` on the
//! mutating operations makes overlapping access impossible. The tuning
//! routines block the loop for their whole run.
//!
//! ## Persistence
//!
//! Each successful mutation (command or tuning run) writes the complete
//! record back to storage before returning.
//!
//! ## Usage Example
//!
//! ```rust
//! use energino_core::device::Energino;
//! use energino_core::sim::{SimulatedAdc, SimulatedRelay};
//! use energino_core::storage::MemoryStorage;
//! use energino_core::time::FixedTime;
//! use heapless::String;
//!
//! let storage = MemoryStorage::<256>::new();
//! let mut device: Energino<_, _, _> =
//!     Energino::init(SimulatedAdc::new(), SimulatedRelay::new(), storage)?;
//!
//! let mut reply: String<64> = String::new();
//! device.handle_line("#P500", &mut reply)?;
//! assert_eq!(reply.as_str(), "@period: 500 ms\n");
//!
//! let clock = FixedTime::new(0);
//! device.poll(&clock)?;
//! let line = device.telemetry()?;
//! assert!(line.starts_with("#Energino,1,"));
//! # Ok::<(), energino_core::EnerginoError>(())
//! ```

use core::fmt::Write;

use crate::calibration::Calibration;
use crate::command::{write_settings_dump, Command, CommandOutcome};
use crate::constants::protocol::REPLY_PREFIX;
use crate::constants::DEFAULT_WINDOW_CAPACITY;
use crate::cycle::{MeasurementCycle, MeasurementSnapshot, TickOutcome};
use crate::errors::EnerginoResult;
use crate::measurement::Measurement;
use crate::settings::CalibrationSettings;
use crate::storage::SettingsStore;
use crate::telemetry::{self, TelemetryLine};
use crate::time::TimeSource;
use crate::traits::{AnalogInput, BlockStorage, RelayOutput};
use crate::tuning::TuningRun;

/// Power meter context
///
/// `N` is the moving-average window per channel.
#[derive(Debug)]
pub struct Energino<A, R, S, const N: usize = DEFAULT_WINDOW_CAPACITY> {
    adc: A,
    relay: R,
    store: SettingsStore<S>,
    settings: CalibrationSettings,
    cycle: MeasurementCycle<N>,
    tuning: TuningRun,
}

impl<A, R, S, const N: usize> Energino<A, R, S, N>
where
    A: AnalogInput,
    R: RelayOutput,
    S: BlockStorage,
{
    /// Boot: load settings (restoring factory defaults if the stored record
    /// is unusable) and drive the relay low
    pub fn init(adc: A, mut relay: R, storage: S) -> EnerginoResult<Self> {
        let mut store = SettingsStore::new(storage);
        let settings = store.load_or_reset()?;
        let cycle = MeasurementCycle::new(N)?;

        relay.set(settings.relay_pin, false);
        log_info!(
            "Energino rev {} up: period {} ms, window {}",
            settings.revision,
            settings.period_ms,
            N
        );

        Ok(Self {
            adc,
            relay,
            store,
            settings,
            cycle,
            tuning: TuningRun::default(),
        })
    }

    /// Use a non-standard ADC reference voltage (mV) for conversions and tuning
    pub fn with_aref(mut self, aref_mv: u32) -> Self {
        self.tuning.aref_mv = aref_mv;
        self
    }

    /// Change how many reads a tuning run averages
    pub fn with_tuning_samples(mut self, samples: u32) -> Self {
        self.tuning.samples = samples;
        self
    }

    /// Live settings record
    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Latest raw snapshot
    pub fn snapshot(&self) -> &MeasurementSnapshot {
        self.cycle.snapshot()
    }

    /// Reference voltage in use (mV)
    pub fn aref_mv(&self) -> u32 {
        self.tuning.aref_mv
    }

    /// Conversion engine for the live settings
    pub fn calibration(&self) -> EnerginoResult<Calibration<'_>> {
        Ok(Calibration::new(&self.settings)?.with_aref(self.tuning.aref_mv))
    }

    /// Calibrated report of the latest snapshot
    pub fn measurement(&self) -> EnerginoResult<Measurement> {
        let calibration = self.calibration()?;
        Ok(Measurement::from_snapshot(
            self.cycle.snapshot(),
            &calibration,
            self.relay_on(),
            self.settings.period_ms,
        ))
    }

    /// Current relay level
    pub fn relay_on(&self) -> bool {
        self.relay.is_high(self.settings.relay_pin)
    }

    /// Drive the relay without touching the settings record
    pub fn set_relay(&mut self, on: bool) {
        self.relay.set(self.settings.relay_pin, on);
        log_debug!("Relay {}", if on { "high" } else { "low" });
    }

    /// Run the sampling cycle if its period has elapsed
    pub fn poll<T: TimeSource + ?Sized>(&mut self, clock: &T) -> EnerginoResult<TickOutcome> {
        self.cycle
            .tick(clock.now(), &self.settings, &mut self.adc, &self.relay)
    }

    /// Parse and execute one serial line, writing any reply to `out`
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> EnerginoResult<CommandOutcome> {
        match Command::parse(line) {
            Some(command) => self.execute(command, out),
            None => {
                log_debug!("Ignoring serial line {:?}", line);
                Ok(CommandOutcome::Ignored)
            }
        }
    }

    /// Execute a parsed command, writing any reply to `out`
    ///
    /// Setting changes are staged on a copy of the record and only become
    /// live once the copy is stored. A failed save leaves the device and the
    /// relay untouched and writes no reply.
    pub fn execute<W: Write>(&mut self, command: Command<'_>, out: &mut W) -> EnerginoResult<CommandOutcome> {
        let p = REPLY_PREFIX;
        let mut staged = self.settings.clone();

        match command {
            Command::Reset => {
                self.reset_settings()?;
                writeln!(out, "{p}reset")?;
                return Ok(CommandOutcome::Applied);
            }
            Command::Dump => {
                write_settings_dump(out, &self.settings)?;
                return Ok(CommandOutcome::Reported);
            }
            Command::TuneOffset => {
                let offset = self.tune_offset()?;
                writeln!(out, "{p}offset: {offset}")?;
                return Ok(CommandOutcome::Applied);
            }
            Command::FeedId(id) => staged.feed_id = id,
            Command::ApiKey(key) => staged.set_api_key(key),
            Command::FeedsUrl(url) => staged.set_feeds_url(url),
            Command::Period(ms) => staged.period_ms = ms,
            Command::R1(kohm) => staged.r1_kohm = kohm,
            Command::R2(kohm) => staged.r2_kohm = kohm,
            Command::Offset(mv) => staged.offset_mv = mv,
            Command::Sensitivity(mv_per_a) => staged.sensitivity_mv_per_a = mv_per_a,
            Command::Switch(_) => {}
        }

        self.commit(staged, "command", command.opcode())?;

        match command {
            Command::Period(ms) => writeln!(out, "{p}period: {ms} ms")?,
            Command::R1(kohm) => writeln!(out, "{p}r1: {kohm} Kohm")?,
            Command::R2(kohm) => writeln!(out, "{p}r2: {kohm} Kohm")?,
            Command::Offset(mv) => writeln!(out, "{p}offset: {mv} mV")?,
            Command::Sensitivity(mv_per_a) => writeln!(out, "{p}sensitivity: {mv_per_a} mV/A")?,
            Command::Switch(on) => {
                self.set_relay(on);
                writeln!(out, "{p}switch: {}", if on { "high" } else { "low" })?;
            }
            _ => {}
        }

        Ok(CommandOutcome::Applied)
    }

    /// Store `staged`, then make it the live record
    fn commit(&mut self, staged: CalibrationSettings, _source: &str, _opcode: char) -> EnerginoResult<()> {
        if let Err(err) = self.store.save(&staged) {
            log_warn!("Settings not persisted after {} '{}', keeping previous record", _source, _opcode);
            return Err(err);
        }
        self.settings = staged;
        log_info!("Settings persisted after {} '{}'", _source, _opcode);
        Ok(())
    }

    /// Standard telemetry line for the latest snapshot
    pub fn telemetry(&self) -> EnerginoResult<TelemetryLine> {
        telemetry::render(&self.settings, &self.measurement()?)
    }

    /// Live telemetry line (feed id, URL and key appended)
    pub fn live_telemetry(&self) -> EnerginoResult<TelemetryLine> {
        telemetry::render_live(&self.settings, &self.measurement()?)
    }

    /// Measure and persist the zero-current offset (blocking)
    pub fn tune_offset(&mut self) -> EnerginoResult<u32> {
        let mut staged = self.settings.clone();
        let offset = self.tuning.offset(&mut self.adc, &mut staged)?;
        self.commit(staged, "tuning", 'T')?;
        Ok(offset)
    }

    /// Derive and persist the sensitivity from a known current in mA (blocking)
    pub fn tune_sensitivity(&mut self, known_current_ma: u32) -> EnerginoResult<u32> {
        let mut staged = self.settings.clone();
        let sensitivity = self
            .tuning
            .sensitivity(&mut self.adc, &mut staged, known_current_ma)?;
        self.commit(staged, "tuning", 'D')?;
        Ok(sensitivity)
    }

    /// Derive and persist R1 from a known load voltage in mV (blocking)
    pub fn tune_divider(&mut self, known_voltage_mv: u32) -> EnerginoResult<u32> {
        let mut staged = self.settings.clone();
        let r1 = self
            .tuning
            .divider(&mut self.adc, &mut staged, known_voltage_mv)?;
        self.commit(staged, "tuning", 'A')?;
        Ok(r1)
    }

    /// Restore and persist factory defaults, restart sampling and drop the relay
    ///
    /// Nothing changes if the defaults cannot be stored.
    pub fn reset_settings(&mut self) -> EnerginoResult<()> {
        let defaults = self.store.reset_to_factory_defaults()?;
        self.relay.set(self.settings.relay_pin, false);
        self.settings = defaults;
        self.relay.set(self.settings.relay_pin, false);
        self.cycle.reset()?;
        log_info!("Factory defaults restored");
        Ok(())
    }

    /// Settings store
    pub fn store(&self) -> &SettingsStore<S> {
        &self.store
    }

    /// Analog input
    pub fn adc_mut(&mut self) -> &mut A {
        &mut self.adc
    }

    /// Relay output
    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Tear down, returning the peripherals and storage
    pub fn release(self) -> (A, R, S) {
        (self.adc, self.relay, self.store.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedAdc, SimulatedRelay};
    use crate::storage::MemoryStorage;
    use crate::time::FixedTime;
    use heapless::String;

    type TestDevice = Energino<SimulatedAdc, SimulatedRelay, MemoryStorage<256>, 4>;

    fn boot() -> TestDevice {
        Energino::init(SimulatedAdc::new(), SimulatedRelay::new(), MemoryStorage::new())
            .unwrap()
            .with_tuning_samples(50)
    }

    fn run(device: &mut TestDevice, line: &str) -> (CommandOutcome, String<512>) {
        let mut out = String::new();
        let outcome = device.handle_line(line, &mut out).unwrap();
        (outcome, out)
    }

    /// Memory storage whose writes can be switched off after boot
    #[derive(Debug)]
    struct FlakyStorage {
        inner: MemoryStorage<256>,
        reject_writes: bool,
    }

    impl BlockStorage for FlakyStorage {
        fn read_block(&mut self, address: usize, buf: &mut [u8]) -> EnerginoResult<()> {
            self.inner.read_block(address, buf)
        }

        fn write_block(&mut self, address: usize, data: &[u8]) -> EnerginoResult<()> {
            if self.reject_writes {
                return Err(crate::errors::EnerginoError::Storage { reason: "medium failure" });
            }
            self.inner.write_block(address, data)
        }
    }

    fn boot_flaky() -> Energino<SimulatedAdc, SimulatedRelay, FlakyStorage, 4> {
        let storage = FlakyStorage { inner: MemoryStorage::new(), reject_writes: false };
        let mut device = Energino::init(SimulatedAdc::new(), SimulatedRelay::new(), storage)
            .unwrap()
            .with_tuning_samples(50);
        device.store.storage_mut().reject_writes = true;
        device
    }

    #[test]
    fn failed_save_leaves_record_and_reply_untouched() {
        let mut device = boot_flaky();

        for line in ["#P500", "#A33", "#F12", "#Kkey"] {
            let mut reply: String<64> = String::new();
            assert!(device.handle_line(line, &mut reply).is_err());
            assert!(reply.is_empty(), "reply for {line:?}");
        }
        assert_eq!(*device.settings(), CalibrationSettings::factory_defaults());

        let (_, _, storage) = device.release();
        let mut store = SettingsStore::new(storage.inner);
        assert_eq!(store.load().unwrap().period_ms, 200);
    }

    #[test]
    fn failed_save_keeps_relay_low() {
        let mut device = boot_flaky();
        let mut reply: String<64> = String::new();
        assert!(device.handle_line("#S1", &mut reply).is_err());
        assert!(!device.relay_on());
        assert!(reply.is_empty());
    }

    #[test]
    fn failed_save_discards_tuning_result() {
        let mut device = boot_flaky();
        let pin = device.settings().current_pin;
        device.adc_mut().set(pin, 500);

        assert!(device.tune_offset().is_err());
        assert_eq!(device.settings().offset_mv, 2500);
    }

    #[test]
    fn failed_reset_keeps_live_record() {
        let mut device = boot_flaky();
        device.store.storage_mut().reject_writes = false;
        let mut reply: String<64> = String::new();
        device.handle_line("#P900", &mut reply).unwrap();
        device.store.storage_mut().reject_writes = true;

        reply.clear();
        assert!(device.handle_line("#R", &mut reply).is_err());
        assert!(reply.is_empty());
        assert_eq!(device.settings().period_ms, 900);
    }

    #[test]
    fn blank_storage_boots_with_defaults() {
        let device = boot();
        assert_eq!(*device.settings(), CalibrationSettings::factory_defaults());
        assert_eq!(device.store().storage().writes(), 1);
        assert!(!device.relay_on());
    }

    #[test]
    fn period_command_persists_and_dumps() {
        let mut device = boot();
        let (outcome, reply) = run(&mut device, "#P500");
        assert_eq!(outcome, CommandOutcome::Applied);
        assert_eq!(reply.as_str(), "@period: 500 ms\n");

        let (outcome, dump) = run(&mut device, "#Z");
        assert_eq!(outcome, CommandOutcome::Reported);
        assert!(dump.contains("@period: 500 ms\n"));

        let (_, _, storage) = device.release();
        let mut store = SettingsStore::new(storage);
        assert_eq!(store.load().unwrap().period_ms, 500);
    }

    #[test]
    fn dump_does_not_write() {
        let mut device = boot();
        run(&mut device, "#Z");
        assert_eq!(device.store().storage().writes(), 1);
    }

    #[test]
    fn ignored_lines_change_nothing() {
        let mut device = boot();
        for line in ["#P-5", "#B0", "#D0", "hello", "#Q1"] {
            let (outcome, reply) = run(&mut device, line);
            assert_eq!(outcome, CommandOutcome::Ignored);
            assert!(reply.is_empty());
        }
        assert_eq!(*device.settings(), CalibrationSettings::factory_defaults());
        assert_eq!(device.store().storage().writes(), 1);
    }

    #[test]
    fn switch_command_drives_relay() {
        let mut device = boot();
        let (_, reply) = run(&mut device, "#S1");
        assert_eq!(reply.as_str(), "@switch: high\n");
        assert!(device.relay_on());

        let (_, reply) = run(&mut device, "#S0");
        assert_eq!(reply.as_str(), "@switch: low\n");
        assert!(!device.relay_on());
    }

    #[test]
    fn feed_commands_are_silent() {
        let mut device = boot();
        let (_, reply) = run(&mut device, "#F77");
        assert!(reply.is_empty());
        run(&mut device, "#Kabcdef");
        run(&mut device, "#Uhttp://feeds.example/");

        let settings = device.settings();
        assert_eq!(settings.feed_id, 77);
        assert_eq!(settings.api_key.as_str(), "abcdef");
        assert_eq!(settings.feeds_url.as_str(), "http://feeds.example/");
    }

    #[test]
    fn reset_command_restores_defaults() {
        let mut device = boot();
        run(&mut device, "#P1000");
        run(&mut device, "#S1");
        device.poll(&FixedTime::new(0)).unwrap();

        let (outcome, reply) = run(&mut device, "#R");
        assert_eq!(outcome, CommandOutcome::Applied);
        assert_eq!(reply.as_str(), "@reset\n");
        assert_eq!(device.settings().period_ms, 200);
        assert!(!device.relay_on());
        assert_eq!(device.snapshot().samples, 0);
    }

    #[test]
    fn tune_command_reports_offset() {
        let mut device = boot();
        let pin = device.settings().current_pin;
        device.adc_mut().set(pin, 512);

        let (_, reply) = run(&mut device, "#T");
        assert_eq!(reply.as_str(), "@offset: 2500\n");
        assert_eq!(device.settings().offset_mv, 2500);
    }

    #[test]
    fn rejected_tuning_keeps_record() {
        let mut device = boot();
        let writes = device.store().storage().writes();
        assert!(device.tune_divider(12_000).is_err());
        assert_eq!(device.store().storage().writes(), writes);
    }

    #[test]
    fn poll_and_measure() {
        let mut device = boot();
        let (current_pin, voltage_pin) = (device.settings().current_pin, device.settings().voltage_pin);
        device.adc_mut().set(voltage_pin, 500);
        device.adc_mut().set(current_pin, 512);

        let mut clock = FixedTime::new(10);
        assert_eq!(device.poll(&clock).unwrap(), TickOutcome::Sampled);
        clock.advance(50);
        assert_eq!(device.poll(&clock).unwrap(), TickOutcome::Skipped);

        let report = device.measurement().unwrap();
        assert!((report.voltage_v - 26.85546875).abs() < 1e-9);
        assert_eq!(report.current_a, 0.0);
        assert_eq!(report.samples, 1);

        let line = device.telemetry().unwrap();
        assert_eq!(line.as_str(), "#Energino,1,26.855,0.000,0.00,0,200,1,54,26\n");
    }

    #[test]
    fn aref_flows_into_calibration() {
        let device = boot().with_aref(3300);
        assert_eq!(device.aref_mv(), 3300);
        assert_eq!(device.calibration().unwrap().voltage_error_mv(), 35);
    }

    #[test]
    fn live_telemetry_carries_feed() {
        let mut device = boot();
        run(&mut device, "#F9");
        let line = device.live_telemetry().unwrap();
        assert!(line.ends_with(",9,https://api.xively.com/v2/feeds/,\n"));
    }
}
