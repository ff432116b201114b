//! Factory Defaults
//!
//! Values written when the stored record is missing, corrupt, or explicitly
//! reset. They describe the reference board: an ACS712-05B hall sensor on
//! the current channel and a 100k/10k divider on the voltage channel.

/// Magic tag identifying this firmware's record layout.
pub const MAGIC: &str = "Energino";

/// Record layout revision. Bump when a field changes width or meaning.
pub const REVISION: u16 = 1;

/// Default sampling period (ms).
pub const PERIOD_MS: u32 = 200;

/// Divider upper resistor (kΩ).
pub const R1_KOHM: u32 = 100;

/// Divider lower resistor (kΩ).
pub const R2_KOHM: u32 = 10;

/// Zero-current output of the hall sensor (mV), half of a 5 V supply.
pub const OFFSET_MV: u32 = 2500;

/// Hall sensor scale factor (mV per A) for the 5 A variant.
pub const SENSITIVITY_MV_PER_A: u32 = 185;

/// Digital pin driving the relay.
pub const RELAY_PIN: u8 = 2;

/// Analog channel wired to the current sensor.
pub const CURRENT_PIN: u8 = 0;

/// Analog channel wired to the voltage divider.
pub const VOLTAGE_PIN: u8 = 1;

/// Feed id 0 means "no remote feed configured".
pub const FEED_ID: u32 = 0;

/// Base URL the feed id and `.csv` suffix are appended to.
pub const FEEDS_URL: &str = "https://api.xively.com/v2/feeds/";

/// Samples kept by each channel's moving-average window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 10;
