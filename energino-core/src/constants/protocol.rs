//! Serial Protocol Limits
//!
//! Widths mirror the fixed character arrays of the persisted record, minus the
//! terminator slot.

/// First character of every command and telemetry line.
pub const COMMAND_PREFIX: char = '#';

/// First character of every human-readable reply line.
pub const REPLY_PREFIX: char = '@';

/// Maximum magic tag length (chars).
pub const MAGIC_MAX_LEN: usize = 11;

/// Maximum API key length (chars). Longer payloads are truncated.
pub const API_KEY_MAX_LEN: usize = 48;

/// Maximum remote base URL length (chars). Longer payloads are truncated.
pub const FEEDS_URL_MAX_LEN: usize = 59;

/// Bytes buffered from the serial port for a single command line.
///
/// Holds `#U` followed by a full-length base URL.
pub const SERIAL_INPUT_CAPACITY: usize = 64;

/// Capacity of a rendered telemetry line.
///
/// The live variant appends feed id, URL and key, so it is sized for the
/// longest of those plus the ten standard fields.
pub const TELEMETRY_LINE_CAPACITY: usize = 256;

/// Decimal digits printed for voltage (V).
pub const VOLTAGE_DECIMALS: usize = 3;

/// Decimal digits printed for current (A).
pub const CURRENT_DECIMALS: usize = 3;

/// Decimal digits printed for power (W).
pub const POWER_DECIMALS: usize = 2;

/// Decimal digits used by the REST and push payloads.
pub const REMOTE_DECIMALS: usize = 2;
