//! REST and push against a simulated device

use energino_connectors::{rest, ConnectorError, PushError, PushOutcome, PushRequest, PushTransport, Pusher};
use energino_core::sim::{SimulatedAdc, SimulatedRelay};
use energino_core::{Energino, FixedTime, MemoryStorage};
use heapless::String as LineString;
use serde_json::Value;

type Device = Energino<SimulatedAdc, SimulatedRelay, MemoryStorage<256>>;

#[derive(Default)]
struct Recorder {
    requests: Vec<PushRequest>,
}

impl PushTransport for Recorder {
    fn put(&mut self, request: &PushRequest) -> Result<(), PushError> {
        self.requests.push(request.clone());
        Ok(())
    }
}

fn loaded_device() -> Device {
    let mut device: Device =
        Energino::init(SimulatedAdc::new(), SimulatedRelay::new(), MemoryStorage::new()).unwrap();
    let (voltage_pin, current_pin) = (device.settings().voltage_pin, device.settings().current_pin);
    device.adc_mut().set(voltage_pin, 500);
    device.adc_mut().set(current_pin, 600);
    device.poll(&FixedTime::new(0)).unwrap();
    device
}

fn command(device: &mut Device, line: &str) {
    let mut reply: LineString<128> = LineString::new();
    device.handle_line(line, &mut reply).unwrap();
}

#[test]
fn test_rest_reports_calibrated_values() {
    let mut device = loaded_device();

    let voltage: Value = serde_json::from_str(&rest::respond(&mut device, "datastreams/voltage").unwrap()).unwrap();
    assert_eq!(voltage["id"], "voltage");
    assert_eq!(voltage["current_value"], 26.86);

    let current: Value = serde_json::from_str(&rest::respond(&mut device, "datastreams/current").unwrap()).unwrap();
    assert_eq!(current["current_value"], 2.32);
}

#[test]
fn test_rest_switch_drives_relay() {
    let mut device = loaded_device();
    assert!(!device.relay_on());

    let reply = rest::respond(&mut device, "/datastreams/switch/1").unwrap();
    assert_eq!(reply, r#"{"version":"1.0.0","id":"switch","current_value":1}"#);
    assert!(device.relay_on());

    // Relay changes over REST are not persisted
    assert_eq!(device.store().storage().writes(), 1);

    rest::respond(&mut device, "datastreams/switch/0").unwrap();
    assert!(!device.relay_on());
}

#[test]
fn test_rest_listing_and_errors() {
    let mut device = loaded_device();
    let listing: Value = serde_json::from_str(&rest::respond(&mut device, "datastreams").unwrap()).unwrap();
    assert_eq!(listing["datastreams"].as_array().unwrap().len(), 4);

    assert!(matches!(
        rest::respond(&mut device, "firmware/update"),
        Err(ConnectorError::UnknownResource(_))
    ));
}

#[test]
fn test_push_follows_feed_commands() {
    let mut device = loaded_device();
    let mut pusher = Pusher::new(Recorder::default());

    let report = device.measurement().unwrap();
    assert_eq!(pusher.push(device.settings(), &report).unwrap(), PushOutcome::Skipped);
    assert!(pusher.transport().requests.is_empty());

    command(&mut device, "#F61916");
    command(&mut device, "#Ksecret");
    command(&mut device, "#Uhttp://feeds.example/v2/feeds/");

    let report = device.measurement().unwrap();
    assert_eq!(pusher.push(device.settings(), &report).unwrap(), PushOutcome::Sent);

    let request = &pusher.transport().requests[0];
    assert_eq!(request.url, "http://feeds.example/v2/feeds/61916.csv");
    assert_eq!(request.api_key, "secret");
    assert_eq!(request.body, "current,2.32\nvoltage,26.86\npower,62.38\nswitch,0");
}
