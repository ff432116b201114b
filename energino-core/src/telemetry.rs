//! Telemetry Line
//!
//! ## Wire Format
//!
//! ```text
//! #<magic>,<revision>,<V>,<I>,<P>,<relay>,<period>,<samples>,<verr>,<ierr>\n
//! ```
//!
//! - `V` and `I` carry three decimals, `P` two
//! - `relay` is `0` or `1`
//! - `verr` / `ierr` are the quantization bounds in mV / mA
//!
//! The live variant appends `,<feed id>,<base url>,<api key>` before the
//! newline so a host daemon can push on the device's behalf.
//!
//! [`TelemetryFrame::parse`] is the host-side decoder for the standard line.

use core::fmt::Write;
use core::str::FromStr;

use heapless::String;

use crate::constants::protocol::{
    CURRENT_DECIMALS, POWER_DECIMALS, TELEMETRY_LINE_CAPACITY, VOLTAGE_DECIMALS,
};
use crate::constants::{COMMAND_PREFIX, MAGIC, MAGIC_MAX_LEN, REVISION};
use crate::errors::{EnerginoError, EnerginoResult};
use crate::measurement::Measurement;
use crate::settings::CalibrationSettings;

/// One rendered telemetry line
pub type TelemetryLine = String<TELEMETRY_LINE_CAPACITY>;

/// Fields in the standard line
pub const TELEMETRY_FIELDS: usize = 10;

fn write_fields<W: Write>(out: &mut W, settings: &CalibrationSettings, report: &Measurement) -> EnerginoResult<()> {
    write!(
        out,
        "{COMMAND_PREFIX}{},{},{:.vd$},{:.cd$},{:.pd$},{},{},{},{},{}",
        settings.magic,
        settings.revision,
        report.voltage_v,
        report.current_a,
        report.power_w,
        u8::from(report.relay_on),
        report.period_ms,
        report.samples,
        report.voltage_error_mv,
        report.current_error_ma,
        vd = VOLTAGE_DECIMALS,
        cd = CURRENT_DECIMALS,
        pd = POWER_DECIMALS,
    )?;
    Ok(())
}

/// Write the standard line
pub fn write_telemetry<W: Write>(out: &mut W, settings: &CalibrationSettings, report: &Measurement) -> EnerginoResult<()> {
    write_fields(out, settings, report)?;
    out.write_char('\n')?;
    Ok(())
}

/// Write the live line with feed id, base URL and key appended
pub fn write_live_telemetry<W: Write>(
    out: &mut W,
    settings: &CalibrationSettings,
    report: &Measurement,
) -> EnerginoResult<()> {
    write_fields(out, settings, report)?;
    writeln!(out, ",{},{},{}", settings.feed_id, settings.feeds_url, settings.api_key)?;
    Ok(())
}

/// Render the standard line into a fresh buffer
pub fn render(settings: &CalibrationSettings, report: &Measurement) -> EnerginoResult<TelemetryLine> {
    let mut line = TelemetryLine::new();
    write_telemetry(&mut line, settings, report)?;
    Ok(line)
}

/// Render the live line into a fresh buffer
pub fn render_live(settings: &CalibrationSettings, report: &Measurement) -> EnerginoResult<TelemetryLine> {
    let mut line = TelemetryLine::new();
    write_live_telemetry(&mut line, settings, report)?;
    Ok(line)
}

/// Decoded standard telemetry line
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    /// Device identity tag
    pub magic: String<MAGIC_MAX_LEN>,
    /// Record layout revision
    pub revision: u16,
    /// Load voltage (V)
    pub voltage_v: f64,
    /// Load current (A)
    pub current_a: f64,
    /// Load power (W)
    pub power_w: f64,
    /// Relay level
    pub relay_on: bool,
    /// Sampling period (ms)
    pub period_ms: u32,
    /// Samples since the last reset
    pub samples: u32,
    /// Voltage quantization bound (mV)
    pub voltage_error_mv: u32,
    /// Current quantization bound (mA)
    pub current_error_ma: u32,
}

impl TelemetryFrame {
    /// Decode one line, which must start with `#` and end with `\n`
    pub fn parse(line: &str) -> EnerginoResult<Self> {
        let body = line
            .strip_suffix('\n')
            .ok_or(malformed("missing line terminator"))?;
        let body = body.strip_suffix('\r').unwrap_or(body);
        let body = body
            .strip_prefix(COMMAND_PREFIX)
            .ok_or(malformed("missing '#' prefix"))?;

        match body.split(',').count() {
            n if n < TELEMETRY_FIELDS => return Err(malformed("too few fields")),
            n if n > TELEMETRY_FIELDS => return Err(malformed("too many fields")),
            _ => {}
        }

        let mut fields = body.split(',');
        let mut next = || fields.next().ok_or(malformed("too few fields"));

        let magic = next()?;
        if magic.is_empty() || magic.len() > MAGIC_MAX_LEN {
            return Err(malformed("bad magic"));
        }
        let magic = String::from_str(magic).map_err(|_| malformed("bad magic"))?;

        let frame = Self {
            magic,
            revision: field(next()?)?,
            voltage_v: field(next()?)?,
            current_a: field(next()?)?,
            power_w: field(next()?)?,
            relay_on: match next()? {
                "0" => false,
                "1" => true,
                _ => return Err(malformed("relay must be 0 or 1")),
            },
            period_ms: field(next()?)?,
            samples: field(next()?)?,
            voltage_error_mv: field(next()?)?,
            current_error_ma: field(next()?)?,
        };

        Ok(frame)
    }

    /// True when the line came from firmware with this build's record layout
    pub fn is_energino(&self) -> bool {
        self.magic.as_str() == MAGIC && self.revision == REVISION
    }
}

fn malformed(reason: &'static str) -> EnerginoError {
    EnerginoError::MalformedTelemetry { reason }
}

fn field<T: FromStr>(text: &str) -> EnerginoResult<T> {
    text.trim().parse().map_err(|_| malformed("unparsable field"))
}
