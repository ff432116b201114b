//! Calibrated measurement report
//!
//! A `Measurement` is what every consumer sees: the telemetry line, the REST
//! responder and the feed push all render from the same report so the three
//! outputs never disagree about a reading.

use serde::Serialize;

use crate::calibration::Calibration;
use crate::cycle::MeasurementSnapshot;
use crate::time::Timestamp;

/// Calibrated view of the latest snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measurement {
    /// Load voltage (V)
    pub voltage_v: f64,
    /// Load current (A)
    pub current_a: f64,
    /// Load power (W)
    pub power_w: f64,
    /// Relay output level
    pub relay_on: bool,
    /// Sampling period (ms)
    pub period_ms: u32,
    /// Ticks since the last reset
    pub samples: u32,
    /// Voltage quantization bound (mV)
    pub voltage_error_mv: u32,
    /// Current quantization bound (mA)
    pub current_error_ma: u32,
    /// When the snapshot was taken, `None` before the first tick
    pub updated_at: Option<Timestamp>,
}

impl Measurement {
    /// Convert a raw snapshot through `calibration`
    pub fn from_snapshot(
        snapshot: &MeasurementSnapshot,
        calibration: &Calibration<'_>,
        relay_on: bool,
        period_ms: u32,
    ) -> Self {
        Self {
            voltage_v: calibration.voltage(snapshot.voltage_raw),
            current_a: calibration.current(snapshot.current_raw),
            power_w: calibration.power(snapshot.voltage_raw, snapshot.current_raw),
            relay_on,
            period_ms,
            samples: snapshot.samples,
            voltage_error_mv: calibration.voltage_error_mv(),
            current_error_ma: calibration.current_error_ma(),
            updated_at: snapshot.updated_at,
        }
    }

    /// Value of a single published metric
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Current => self.current_a,
            Metric::Voltage => self.voltage_v,
            Metric::Power => self.power_w,
            Metric::Switch => {
                if self.relay_on {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Metrics published to REST clients and the remote feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Load current (A)
    Current,
    /// Load voltage (V)
    Voltage,
    /// Load power (W)
    Power,
    /// Relay state (0 or 1)
    Switch,
}

impl Metric {
    /// All metrics in feed order
    pub const ALL: [Metric; 4] = [Metric::Current, Metric::Voltage, Metric::Power, Metric::Switch];

    /// Stream identifier used on the wire
    pub fn id(self) -> &'static str {
        match self {
            Metric::Current => "current",
            Metric::Voltage => "voltage",
            Metric::Power => "power",
            Metric::Switch => "switch",
        }
    }

    /// Look up a metric by its stream identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|metric| metric.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CalibrationSettings;

    #[test]
    fn metric_ids_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(Metric::from_id(metric.id()), Some(metric));
        }
        assert_eq!(Metric::from_id("temperature"), None);
    }

    #[test]
    fn report_from_empty_snapshot() {
        let settings = CalibrationSettings::factory_defaults();
        let cal = Calibration::new(&settings).unwrap();
        let report = Measurement::from_snapshot(&MeasurementSnapshot::default(), &cal, true, 200);

        assert_eq!(report.voltage_v, 0.0);
        assert_eq!(report.current_a, 0.0);
        assert_eq!(report.power_w, 0.0);
        assert_eq!(report.value(Metric::Switch), 1.0);
        assert_eq!(report.samples, 0);
        assert_eq!(report.updated_at, None);
    }
}
