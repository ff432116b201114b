//! Hardware and Platform Seams
//!
//! The core never touches registers. Everything it needs from the board goes
//! through a handful of small traits so the same measurement code runs on
//! the MCU, in host simulation and in tests.
//!
//! ## Module Organization
//!
//! - [`io`] - analog input, relay output and block storage
//! - [`time`] - millisecond time source driving the sampling cycle
//!
//! ## Usage Example
//!
//! ```rust
//! use energino_core::traits::{AnalogInput, RelayOutput};
//! use energino_core::sim::{SimulatedAdc, SimulatedRelay};
//!
//! let mut adc = SimulatedAdc::new();
//! adc.set(0, 512);
//! assert_eq!(nb::block!(adc.read(0)), Ok(512));
//!
//! let mut relay = SimulatedRelay::new();
//! relay.set(2, true);
//! assert!(relay.is_high(2));
//! ```

pub mod io;
pub mod time;

pub use io::{AnalogInput, BlockStorage, RelayOutput};
pub use time::TimeSource;
