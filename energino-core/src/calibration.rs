//! Raw-to-Physical Conversion
//!
//! ## Front End
//!
//! ```text
//!   V_load ──┬── R1 ──┬── R2 ── GND           I_load ──[hall sensor]── V_i
//!            │        │                                     │
//!            │      ADC (voltage_pin)                     ADC (current_pin)
//! ```
//!
//! - Voltage channel: the divider scales the load voltage down by
//!   `R2 / (R1 + R2)`; undoing that gives the load voltage.
//! - Current channel: the hall sensor outputs `offset + I * sensitivity`
//!   millivolts; subtracting the zero-current offset and dividing by the
//!   sensitivity gives the current in amps.
//!
//! ## Quantization
//!
//! One ADC count is `aref / 1024` mV. Pushed through the same scaling, that
//! step bounds how finely each channel can resolve:
//!
//! ```text
//! voltage error (mV) = round(step * (R1 + R2) / R2)
//! current error (mA) = round(step / sensitivity * 1000)
//! ```
//!
//! With the factory front end at 5 V that is 54 mV and 26 mA.
//!
//! ## Clamping
//!
//! Neither quantity can be negative in this circuit. Readings at or below
//! zero (a current below the calibrated offset, or a floating divider) are
//! reported as `0.0`.
//!
//! ## Usage Example
//!
//! ```rust
//! use energino_core::calibration::Calibration;
//! use energino_core::settings::CalibrationSettings;
//!
//! let settings = CalibrationSettings::factory_defaults();
//! let cal = Calibration::new(&settings)?;
//!
//! let volts = cal.voltage(512.0);
//! let amps = cal.current(600.0);
//! assert!(volts > 0.0 && amps > 0.0);
//!
//! // Same settings on a 3.3 V board
//! let cal_3v3 = Calibration::new(&settings)?.with_aref(3300);
//! assert!(cal_3v3.voltage(512.0) < volts);
//! # Ok::<(), energino_core::EnerginoError>(())
//! ```

use crate::constants::{ADC_LEVELS, DEFAULT_AREF_MV};
use crate::errors::EnerginoResult;
use crate::settings::CalibrationSettings;

/// Millivolts per ADC count for a given reference voltage
#[inline]
pub fn voltage_step_mv(aref_mv: u32) -> f64 {
    f64::from(aref_mv) / ADC_LEVELS
}

/// Conversion engine bound to a settings record and reference voltage
///
/// Construction validates the denominators once, so every conversion after
/// that is a handful of float operations with no error path.
#[derive(Debug, Clone, Copy)]
pub struct Calibration<'a> {
    settings: &'a CalibrationSettings,
    aref_mv: u32,
}

impl<'a> Calibration<'a> {
    /// Bind to `settings` at the standard 5 V reference
    pub fn new(settings: &'a CalibrationSettings) -> EnerginoResult<Self> {
        settings.validate_calibration()?;
        Ok(Self {
            settings,
            aref_mv: DEFAULT_AREF_MV,
        })
    }

    /// Use a non-standard reference voltage (mV)
    pub fn with_aref(mut self, aref_mv: u32) -> Self {
        self.aref_mv = aref_mv;
        self
    }

    /// Reference voltage in use (mV)
    pub fn aref_mv(&self) -> u32 {
        self.aref_mv
    }

    /// Millivolts per ADC count
    pub fn step_mv(&self) -> f64 {
        voltage_step_mv(self.aref_mv)
    }

    fn divider_gain(&self) -> f64 {
        let r1 = f64::from(self.settings.r1_kohm);
        let r2 = f64::from(self.settings.r2_kohm);
        (r1 + r2) / r2
    }

    /// Worst-case voltage quantization error (mV)
    pub fn voltage_error_mv(&self) -> u32 {
        libm::round(self.step_mv() * self.divider_gain()) as u32
    }

    /// Worst-case current quantization error (mA)
    pub fn current_error_ma(&self) -> u32 {
        let sensitivity = f64::from(self.settings.sensitivity_mv_per_a);
        libm::round(self.step_mv() / sensitivity * 1000.0) as u32
    }

    /// Load voltage (V) for a filtered raw voltage-channel reading
    pub fn voltage(&self, raw: f64) -> f64 {
        let v_out = raw * self.step_mv();
        let scaled = v_out * self.divider_gain();

        if scaled > 0.0 {
            scaled / 1000.0
        } else {
            0.0
        }
    }

    /// Load current (A) for a filtered raw current-channel reading
    pub fn current(&self, raw: f64) -> f64 {
        let v_out = raw * self.step_mv();
        let offset = f64::from(self.settings.offset_mv);
        let sensitivity = f64::from(self.settings.sensitivity_mv_per_a);
        let amps = (v_out - offset) / sensitivity;

        if amps > 0.0 {
            amps
        } else {
            0.0
        }
    }

    /// Load power (W) from filtered raw voltage and current readings
    pub fn power(&self, raw_voltage: f64, raw_current: f64) -> f64 {
        self.voltage(raw_voltage) * self.current(raw_current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EnerginoError;

    fn bench_settings() -> CalibrationSettings {
        let mut settings = CalibrationSettings::factory_defaults();
        settings.r1_kohm = 100;
        settings.r2_kohm = 10;
        settings.offset_mv = 0;
        settings.sensitivity_mv_per_a = 185;
        settings
    }

    #[test]
    fn step_size_at_five_volts() {
        let step = voltage_step_mv(5000);
        assert!((step - 4.8828125).abs() < 1e-12);
    }

    #[test]
    fn voltage_through_divider() {
        let settings = bench_settings();
        let cal = Calibration::new(&settings).unwrap();

        // 500 counts -> 2441.406 mV at the pin -> x11 -> 26.855 V
        let volts = cal.voltage(500.0);
        assert!((volts - 26.85546875).abs() < 1e-9);
    }

    #[test]
    fn current_clamps_below_offset() {
        let settings = CalibrationSettings::factory_defaults();
        let cal = Calibration::new(&settings).unwrap();

        // 2500 mV offset sits at ~512 counts
        assert_eq!(cal.current(0.0), 0.0);
        assert_eq!(cal.current(400.0), 0.0);
        assert!(cal.current(700.0) > 0.0);
    }

    #[test]
    fn current_with_zero_offset() {
        let settings = bench_settings();
        let cal = Calibration::new(&settings).unwrap();

        // 185 mV -> 1 A; 185 mV is 37.888 counts
        let raw = 185.0 / voltage_step_mv(5000);
        assert!((cal.current(raw) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_reading_clamps_voltage() {
        let settings = bench_settings();
        let cal = Calibration::new(&settings).unwrap();
        assert_eq!(cal.voltage(0.0), 0.0);
    }

    #[test]
    fn power_is_product() {
        let settings = bench_settings();
        let cal = Calibration::new(&settings).unwrap();
        let p = cal.power(500.0, 100.0);
        assert!((p - cal.voltage(500.0) * cal.current(100.0)).abs() < 1e-12);
    }

    #[test]
    fn quantization_errors_for_factory_front_end() {
        let settings = CalibrationSettings::factory_defaults();
        let cal = Calibration::new(&settings).unwrap();

        // 4.8828 * 110 / 10 = 53.7 -> 54 mV; 4.8828 / 185 * 1000 = 26.4 -> 26 mA
        assert_eq!(cal.voltage_error_mv(), 54);
        assert_eq!(cal.current_error_ma(), 26);
    }

    #[test]
    fn alternate_reference_voltage() {
        let settings = bench_settings();
        let cal = Calibration::new(&settings).unwrap().with_aref(3300);

        assert_eq!(cal.aref_mv(), 3300);
        // 3300 / 1024 * 11 = 35.4 -> 35 mV
        assert_eq!(cal.voltage_error_mv(), 35);
    }

    #[test]
    fn invalid_denominators_rejected() {
        let mut settings = bench_settings();
        settings.r2_kohm = 0;
        assert!(matches!(
            Calibration::new(&settings),
            Err(EnerginoError::InvalidCalibration { .. })
        ));
    }
}
