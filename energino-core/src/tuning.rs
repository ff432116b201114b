//! One-Shot Calibration Routines
//!
//! Each routine reads one channel back-to-back `samples` times (10,000 by
//! default), averages the raw counts and derives one calibration constant
//! from the result:
//!
//! | Routine       | Precondition                       | Writes                 |
//! |---------------|------------------------------------|------------------------|
//! | `offset`      | no load current                    | `offset_mv`            |
//! | `sensitivity` | known current through the sensor   | `sensitivity_mv_per_a` |
//! | `divider`     | known voltage across the divider   | `r1_kohm`              |
//!
//! ## Blocking
//!
//! These are deliberate busy loops. They hold the control loop for the whole
//! run (about a second at typical conversion rates): no commands are
//! serviced, no ticks run, no requests are answered. There is no scheduler to
//! yield to on the target, and a run cannot be cancelled once started.
//!
//! ## Rejection
//!
//! A routine that would produce a value breaking the calibration invariants
//! (zero or negative sensitivity, negative R1) leaves the settings untouched
//! and returns [`EnerginoError::TuningRejected`].

use crate::calibration::voltage_step_mv;
use crate::constants::{DEFAULT_AREF_MV, TUNING_SAMPLE_COUNT};
use crate::errors::{EnerginoError, EnerginoResult};
use crate::settings::CalibrationSettings;
use crate::traits::io::sample;
use crate::traits::AnalogInput;

/// Parameters shared by every tuning run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuningRun {
    /// Consecutive reads to average
    pub samples: u32,
    /// Reference voltage (mV)
    pub aref_mv: u32,
}

impl Default for TuningRun {
    fn default() -> Self {
        Self {
            samples: TUNING_SAMPLE_COUNT,
            aref_mv: DEFAULT_AREF_MV,
        }
    }
}

impl TuningRun {
    /// Run with the standard sample count at `aref_mv`
    pub fn with_aref(aref_mv: u32) -> Self {
        Self {
            aref_mv,
            ..Self::default()
        }
    }

    /// Mean pin voltage (mV) over `samples` consecutive reads
    pub fn mean_pin_mv<A: AnalogInput + ?Sized>(&self, adc: &mut A, pin: u8) -> EnerginoResult<f64> {
        if self.samples == 0 {
            return Err(EnerginoError::TuningRejected {
                reason: "zero sample count",
            });
        }

        let mut total: u64 = 0;
        for _ in 0..self.samples {
            total += u64::from(sample(adc, pin)?);
        }

        let mean_raw = total as f64 / f64::from(self.samples);
        Ok(mean_raw * voltage_step_mv(self.aref_mv))
    }

    /// Measure the zero-current sensor output and store it as the offset
    ///
    /// Returns the new offset in mV.
    pub fn offset<A: AnalogInput + ?Sized>(
        &self,
        adc: &mut A,
        settings: &mut CalibrationSettings,
    ) -> EnerginoResult<u32> {
        let v_out = self.mean_pin_mv(adc, settings.current_pin)?;
        let offset = libm::round(v_out) as u32;

        log_info!("Offset tuned to {} mV over {} samples", offset, self.samples);
        settings.offset_mv = offset;
        Ok(offset)
    }

    /// Derive the sensor sensitivity from a known load current (mA)
    ///
    /// Uses the stored offset, so tune that first. Returns the new
    /// sensitivity in mV/A.
    pub fn sensitivity<A: AnalogInput + ?Sized>(
        &self,
        adc: &mut A,
        settings: &mut CalibrationSettings,
        known_current_ma: u32,
    ) -> EnerginoResult<u32> {
        if known_current_ma == 0 {
            return Err(EnerginoError::TuningRejected {
                reason: "reference current must be non-zero",
            });
        }

        let v_out = self.mean_pin_mv(adc, settings.current_pin)?;
        let delta_mv = v_out - f64::from(settings.offset_mv);
        let sensitivity = libm::round(delta_mv * 1000.0 / f64::from(known_current_ma));

        if sensitivity < 1.0 {
            return Err(EnerginoError::TuningRejected {
                reason: "sensor output not above offset",
            });
        }

        let sensitivity = sensitivity as u32;
        log_info!("Sensitivity tuned to {} mV/A", sensitivity);
        settings.sensitivity_mv_per_a = sensitivity;
        Ok(sensitivity)
    }

    /// Derive R1 from a known load voltage (mV), keeping R2 fixed
    ///
    /// Returns the new R1 in kΩ.
    pub fn divider<A: AnalogInput + ?Sized>(
        &self,
        adc: &mut A,
        settings: &mut CalibrationSettings,
        known_voltage_mv: u32,
    ) -> EnerginoResult<u32> {
        let v_out = self.mean_pin_mv(adc, settings.voltage_pin)?;
        if v_out <= 0.0 {
            return Err(EnerginoError::TuningRejected {
                reason: "no voltage at divider tap",
            });
        }

        let gain = f64::from(known_voltage_mv) / v_out;
        let r2 = f64::from(settings.r2_kohm);
        let r1 = libm::round(gain * r2 - r2);

        if r1 < 0.0 {
            return Err(EnerginoError::TuningRejected {
                reason: "reference voltage below divider tap",
            });
        }

        let r1 = r1 as u32;
        log_info!("Divider R1 tuned to {} kOhm", r1);
        settings.r1_kohm = r1;
        Ok(r1)
    }
}
