//! Constants for Energino Core
//!
//! Every numeric value the firmware relies on lives here, grouped by domain
//! and named with its unit.
//!
//! ## Organization
//!
//! - **ADC**: converter resolution and reference voltage
//! - **Protocol**: serial framing, field widths and reply formatting
//! - **Storage**: persisted record geometry
//! - **Defaults**: factory calibration and identity values

/// ADC resolution and reference voltage.
pub mod adc;

/// Serial command and telemetry protocol limits.
pub mod protocol;

/// Persisted settings record geometry.
pub mod storage;

/// Factory defaults restored on reset or corruption.
pub mod defaults;

pub use adc::{ADC_LEVELS, ADC_MAX_READING, DEFAULT_AREF_MV, TUNING_SAMPLE_COUNT};

pub use protocol::{
    API_KEY_MAX_LEN, COMMAND_PREFIX, FEEDS_URL_MAX_LEN, MAGIC_MAX_LEN, SERIAL_INPUT_CAPACITY,
};

pub use storage::{SETTINGS_ADDRESS, SETTINGS_BLOCK_SIZE};

pub use defaults::{DEFAULT_WINDOW_CAPACITY, MAGIC, REVISION};
