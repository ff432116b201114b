//! Persisted Calibration Settings
//!
//! One record holds everything the device needs across power cycles: the
//! identity tag, the sampling period, the calibration constants of the
//! sensing front end, pin assignments and the remote feed credentials.
//!
//! ## Invariants
//!
//! - `magic` equals [`MAGIC`] and `revision` equals [`REVISION`]; anything
//!   else is a record from another build and is replaced by factory defaults
//! - `r2_kohm != 0` (divider ratio denominator)
//! - `sensitivity_mv_per_a != 0` (current conversion denominator)
//!
//! Field ranges beyond those are the command dispatcher's business.
//!
//! ## Units
//!
//! | Field                  | Unit  |
//! |------------------------|-------|
//! | `period_ms`            | ms    |
//! | `r1_kohm`, `r2_kohm`   | kΩ    |
//! | `offset_mv`            | mV    |
//! | `sensitivity_mv_per_a` | mV/A  |

use fugit::MillisDurationU32;
use heapless::String;
use serde::{Deserialize, Serialize};

use crate::constants::defaults;
use crate::constants::{API_KEY_MAX_LEN, FEEDS_URL_MAX_LEN, MAGIC, MAGIC_MAX_LEN, REVISION};
use crate::errors::{EnerginoError, EnerginoResult};

/// Calibration and identity record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// Layout identity tag
    pub magic: String<MAGIC_MAX_LEN>,
    /// Layout revision
    pub revision: u16,
    /// Sampling period in milliseconds
    pub period_ms: u32,
    /// Divider upper resistor (kΩ)
    pub r1_kohm: u32,
    /// Divider lower resistor (kΩ)
    pub r2_kohm: u32,
    /// Current sensor output at zero current (mV)
    pub offset_mv: u32,
    /// Current sensor scale (mV per A)
    pub sensitivity_mv_per_a: u32,
    /// Relay output pin
    pub relay_pin: u8,
    /// Current sensor analog channel
    pub current_pin: u8,
    /// Voltage divider analog channel
    pub voltage_pin: u8,
    /// Pre-shared key sent with every push
    pub api_key: String<API_KEY_MAX_LEN>,
    /// Remote feed id, 0 when no feed is configured
    pub feed_id: u32,
    /// Base URL the feed id is appended to
    pub feeds_url: String<FEEDS_URL_MAX_LEN>,
}

impl CalibrationSettings {
    /// Hard-coded values for every field
    pub fn factory_defaults() -> Self {
        Self {
            magic: truncated(MAGIC),
            revision: REVISION,
            period_ms: defaults::PERIOD_MS,
            r1_kohm: defaults::R1_KOHM,
            r2_kohm: defaults::R2_KOHM,
            offset_mv: defaults::OFFSET_MV,
            sensitivity_mv_per_a: defaults::SENSITIVITY_MV_PER_A,
            relay_pin: defaults::RELAY_PIN,
            current_pin: defaults::CURRENT_PIN,
            voltage_pin: defaults::VOLTAGE_PIN,
            api_key: String::new(),
            feed_id: defaults::FEED_ID,
            feeds_url: truncated(defaults::FEEDS_URL),
        }
    }

    /// Check the identity tag and the conversion denominators
    pub fn validate(&self) -> EnerginoResult<()> {
        if !self.matches_build() {
            return Err(EnerginoError::CorruptSettings);
        }

        self.validate_calibration()
    }

    /// Check only the fields the conversion formulas divide by
    pub fn validate_calibration(&self) -> EnerginoResult<()> {
        if self.r2_kohm == 0 {
            return Err(EnerginoError::InvalidCalibration {
                reason: "r2 must be non-zero",
            });
        }

        if self.sensitivity_mv_per_a == 0 {
            return Err(EnerginoError::InvalidCalibration {
                reason: "sensitivity must be non-zero",
            });
        }

        Ok(())
    }

    /// True when the record was written by this firmware's layout
    pub fn matches_build(&self) -> bool {
        self.magic.as_str() == MAGIC && self.revision == REVISION
    }

    /// Sampling period as a typed duration
    pub fn period(&self) -> MillisDurationU32 {
        MillisDurationU32::millis(self.period_ms)
    }

    /// True when pushes to the remote feed are enabled
    pub fn has_feed(&self) -> bool {
        self.feed_id != 0
    }

    /// Store an API key, truncating to the field width
    pub fn set_api_key(&mut self, key: &str) {
        self.api_key = truncated(key);
    }

    /// Store a feed base URL, truncating to the field width
    pub fn set_feeds_url(&mut self, url: &str) {
        self.feeds_url = truncated(url);
    }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self::factory_defaults()
    }
}

/// Copy as many whole characters of `s` as fit into `N` bytes
pub(crate) fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
