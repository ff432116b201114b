//! Network Connectors for Energino Power Meters
//!
//! ## Overview
//!
//! Two ways for a reading to leave the device, both rendered from the same
//! [`Measurement`](energino_core::Measurement) report as the serial
//! telemetry line so all outputs agree:
//!
//! ### REST responder ([`rest`])
//!
//! Answers `datastreams` requests from a local web bridge:
//!
//! | Path                         | Reply                                    |
//! |------------------------------|------------------------------------------|
//! | `datastreams/current`        | one stream object                        |
//! | `datastreams/voltage`        | one stream object                        |
//! | `datastreams/power`          | one stream object                        |
//! | `datastreams/switch[/0\|1]`  | optionally drive the relay, then report  |
//! | `datastreams`                | all four streams                         |
//!
//! ### Feed push ([`push`])
//!
//! PUTs a four-line CSV document to `<base url><feed id>.csv` with the API
//! key in an `X-ApiKey` header. A device with feed id `0` never pushes.
//! The HTTP client (`ureq`) sits behind the `http` feature; without it the
//! crate still builds requests for a transport supplied by the caller.
//!
//! ## Example Usage
//!
//! ```rust
//! use energino_connectors::rest;
//! use energino_core::sim::{SimulatedAdc, SimulatedRelay};
//! use energino_core::{Energino, MemoryStorage};
//!
//! let mut device: Energino<_, _, _> =
//!     Energino::init(SimulatedAdc::new(), SimulatedRelay::new(), MemoryStorage::<256>::new())?;
//!
//! let reply = rest::respond(&mut device, "datastreams/switch/1")?;
//! assert_eq!(reply, r#"{"version":"1.0.0","id":"switch","current_value":1}"#);
//! # Ok::<(), energino_connectors::ConnectorError>(())
//! ```

pub mod push;
pub mod rest;

pub use push::{PushError, PushOutcome, PushRequest, PushTransport, Pusher};

#[cfg(feature = "http")]
pub use push::{PushConfig, UreqTransport};

use energino_core::constants::protocol::REMOTE_DECIMALS;
use energino_core::EnerginoError;
use thiserror::Error;

/// REST responder errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Path does not name a known resource
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Core rejected the operation
    #[error("Device error: {0}")]
    Device(#[from] EnerginoError),

    /// Reply could not be rendered
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Round to the decimals the remote side expects
pub(crate) fn round_remote(value: f64) -> f64 {
    let scale = 10f64.powi(REMOTE_DECIMALS as i32);
    (value * scale).round() / scale
}
