//! Measurement core for Energino power meters
//!
//! Samples a load's voltage and current through a resistive divider and a
//! hall-effect sensor, smooths both channels with moving averages, converts
//! them to volts, amps and watts using a persisted calibration record and
//! accepts single-line serial commands to inspect and tune that record.
//!
//! Key constraints:
//! - Runs inside one cooperative control loop on an 8-bit-class MCU
//! - No heap allocation anywhere in the core
//! - Every setting change is persisted before the command returns
//!
//! ```no_run
//! use energino_core::{Energino, FixedTime, MemoryStorage, TimeSource};
//! use energino_core::sim::{SimulatedAdc, SimulatedRelay};
//! use heapless::String;
//!
//! let mut device: Energino<_, _, _> =
//!     Energino::init(SimulatedAdc::new(), SimulatedRelay::new(), MemoryStorage::<256>::new())?;
//! let mut clock = FixedTime::new(0);
//!
//! loop {
//!     let mut reply: String<512> = String::new();
//!     device.handle_line("#Z", &mut reply)?;
//!     device.poll(&clock)?;
//!     print!("{}", device.telemetry()?);
//!     clock.advance(200);
//! #   break;
//! }
//! # Ok::<(), energino_core::EnerginoError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod calibration;
pub mod command;
pub mod constants;
pub mod cycle;
pub mod device;
pub mod errors;
pub mod filter;
pub mod measurement;
pub mod settings;
pub mod sim;
pub mod storage;
pub mod telemetry;
pub mod time;
pub mod traits;
pub mod tuning;

// Public API
pub use calibration::Calibration;
pub use command::{Command, CommandOutcome, LineBuffer};
pub use cycle::{MeasurementCycle, MeasurementSnapshot, TickOutcome};
pub use device::Energino;
pub use errors::{EnerginoError, EnerginoResult};
pub use filter::MovingAverage;
pub use measurement::{Measurement, Metric};
pub use settings::CalibrationSettings;
pub use storage::{MemoryStorage, SettingsStore};
pub use telemetry::{TelemetryFrame, TelemetryLine};
pub use time::{FixedTime, TimeSource, Timestamp};
pub use traits::{AnalogInput, BlockStorage, RelayOutput};
pub use tuning::TuningRun;

#[cfg(feature = "std")]
pub use storage::FileStorage;
#[cfg(feature = "std")]
pub use time::MonotonicTime;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
