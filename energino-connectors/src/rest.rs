//! REST Responder
//!
//! Maps a request path onto the device's latest measurement and renders a
//! JSON reply. Paths are split on `/`; leading and trailing slashes and
//! surrounding whitespace are ignored.
//!
//! ```text
//! datastreams/voltage   → {"version":"1.0.0","id":"voltage","current_value":26.86}
//! datastreams/switch/1  → relay high, then {"version":"1.0.0","id":"switch","current_value":1}
//! datastreams           → {"version":"1.0.0","datastreams":[{"id":"voltage",...},...]}
//! ```
//!
//! A sub-resource that is not a known metric gets the full listing, the same
//! as a bare `datastreams` request. Any other top-level resource is an
//! error. Values carry two decimals; the switch reports `0` or `1`.

use energino_core::traits::{AnalogInput, BlockStorage, RelayOutput};
use energino_core::{Energino, Measurement, Metric};
use log::debug;
use serde::Serialize;
use serde_json::Value;

use crate::{round_remote, ConnectorError};

/// Protocol version stamped on every reply
pub const API_VERSION: &str = "1.0.0";

/// Top-level resource name
pub const DATASTREAMS: &str = "datastreams";

/// Stream order in the listing reply
pub const LISTING_ORDER: [Metric; 4] = [Metric::Voltage, Metric::Current, Metric::Power, Metric::Switch];

/// Parsed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// One metric
    Stream(Metric),
    /// Relay report, optionally driving it first
    Switch(Option<bool>),
    /// Every metric
    Listing,
}

impl Request {
    /// Parse a request path such as `/datastreams/switch/1`
    pub fn parse(path: &str) -> Result<Self, ConnectorError> {
        let mut segments = path.trim().trim_matches('/').split('/').map(str::trim);

        match segments.next() {
            Some(DATASTREAMS) => {}
            _ => return Err(ConnectorError::UnknownResource(path.to_string())),
        }

        let request = match segments.next().and_then(Metric::from_id) {
            None => Self::Listing,
            Some(Metric::Switch) => {
                let level = segments.next().and_then(|value| match value.chars().next() {
                    Some('0') => Some(false),
                    Some('1') => Some(true),
                    _ => None,
                });
                Self::Switch(level)
            }
            Some(metric) => Self::Stream(metric),
        };

        Ok(request)
    }
}

/// Single-stream reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamReply {
    /// Protocol version
    pub version: &'static str,
    /// Metric identifier
    pub id: &'static str,
    /// Latest value
    pub current_value: Value,
}

/// One entry of the listing reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEntry {
    /// Metric identifier
    pub id: &'static str,
    /// Latest value
    pub current_value: Value,
}

/// Listing reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedListing {
    /// Protocol version
    pub version: &'static str,
    /// Every metric in listing order
    pub datastreams: Vec<StreamEntry>,
}

/// Any REST reply
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// One metric
    Stream(StreamReply),
    /// Every metric
    Listing(FeedListing),
}

impl Reply {
    /// Render as compact JSON
    pub fn to_json(&self) -> Result<String, ConnectorError> {
        serde_json::to_string(self).map_err(|e| ConnectorError::Serialization(e.to_string()))
    }
}

/// JSON value for one metric: two decimals, or `0`/`1` for the switch
pub fn metric_value(report: &Measurement, metric: Metric) -> Value {
    match metric {
        Metric::Switch => Value::from(u8::from(report.relay_on)),
        _ => Value::from(round_remote(report.value(metric))),
    }
}

/// Build the reply for a request against a measurement
pub fn reply_for(request: Request, report: &Measurement) -> Reply {
    let stream = |metric: Metric| {
        Reply::Stream(StreamReply {
            version: API_VERSION,
            id: metric.id(),
            current_value: metric_value(report, metric),
        })
    };

    match request {
        Request::Stream(metric) => stream(metric),
        Request::Switch(_) => stream(Metric::Switch),
        Request::Listing => Reply::Listing(FeedListing {
            version: API_VERSION,
            datastreams: LISTING_ORDER
                .iter()
                .map(|&metric| StreamEntry {
                    id: metric.id(),
                    current_value: metric_value(report, metric),
                })
                .collect(),
        }),
    }
}

/// Handle one request against a device, driving the relay if asked
pub fn handle<A, R, S, const N: usize>(
    device: &mut Energino<A, R, S, N>,
    request: Request,
) -> Result<Reply, ConnectorError>
where
    A: AnalogInput,
    R: RelayOutput,
    S: BlockStorage,
{
    if let Request::Switch(Some(on)) = request {
        debug!("REST switch request: relay {}", if on { "high" } else { "low" });
        device.set_relay(on);
    }

    let report = device.measurement()?;
    Ok(reply_for(request, &report))
}

/// Parse `path`, handle it and render the JSON reply
pub fn respond<A, R, S, const N: usize>(
    device: &mut Energino<A, R, S, N>,
    path: &str,
) -> Result<String, ConnectorError>
where
    A: AnalogInput,
    R: RelayOutput,
    S: BlockStorage,
{
    let request = Request::parse(path)?;
    handle(device, request)?.to_json()
}
