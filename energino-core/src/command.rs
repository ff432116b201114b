//! Serial Command Protocol
//!
//! ## Line Format
//!
//! ```text
//! #<opcode><payload>\n
//! ```
//!
//! One command per line. The opcode is a single character; everything after
//! it up to the line ending is the payload.
//!
//! | Opcode | Payload      | Effect                                   |
//! |--------|--------------|------------------------------------------|
//! | `R`    |              | reset to factory defaults                |
//! | `Z`    |              | dump settings as `@key: value` lines     |
//! | `T`    |              | tune the current offset and report it    |
//! | `F`    | integer ≥ 0  | remote feed id                           |
//! | `K`    | text ≤ 48    | API key (truncated)                      |
//! | `U`    | text ≤ 59    | feed base URL (truncated)                |
//! | `P`    | integer ≥ 0  | sampling period (ms)                     |
//! | `A`    | integer ≥ 0  | R1 (kΩ)                                  |
//! | `B`    | integer > 0  | R2 (kΩ)                                  |
//! | `C`    | integer ≥ 0  | current offset (mV)                      |
//! | `D`    | integer > 0  | sensitivity (mV/A)                       |
//! | `S`    | integer ≥ 0  | relay: `0` low, anything else high       |
//!
//! ## Ignored Input
//!
//! The protocol has no error replies. A line without the `#` prefix, an
//! unknown opcode, a numeric payload that is missing, negative, non-numeric
//! or wider than 32 bits, and a zero `B`/`D` payload all parse to `None` and
//! change nothing.

use core::fmt::Write;

use heapless::{String, Vec};

use crate::constants::protocol::REPLY_PREFIX;
use crate::constants::{COMMAND_PREFIX, SERIAL_INPUT_CAPACITY};
use crate::errors::EnerginoResult;
use crate::settings::{truncated, CalibrationSettings};

/// A parsed serial command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `R`: restore and persist factory defaults
    Reset,
    /// `Z`: report every setting
    Dump,
    /// `T`: measure and store the zero-current offset
    TuneOffset,
    /// `F`: remote feed id
    FeedId(u32),
    /// `K`: API key, truncated on store
    ApiKey(&'a str),
    /// `U`: feed base URL, truncated on store
    FeedsUrl(&'a str),
    /// `P`: sampling period (ms)
    Period(u32),
    /// `A`: divider upper resistor (kΩ)
    R1(u32),
    /// `B`: divider lower resistor (kΩ), never zero
    R2(u32),
    /// `C`: current sensor offset (mV)
    Offset(u32),
    /// `D`: current sensor sensitivity (mV/A), never zero
    Sensitivity(u32),
    /// `S`: relay level
    Switch(bool),
}

impl<'a> Command<'a> {
    /// Parse one line, with or without its line ending
    ///
    /// Returns `None` for anything the device should ignore.
    pub fn parse(line: &'a str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let body = line.strip_prefix(COMMAND_PREFIX)?;

        let mut chars = body.chars();
        let opcode = chars.next()?;
        let payload = chars.as_str();

        let command = match opcode {
            'R' => Self::Reset,
            'Z' => Self::Dump,
            'T' => Self::TuneOffset,
            'K' => Self::ApiKey(payload),
            'U' => Self::FeedsUrl(payload),
            'F' => Self::FeedId(number(payload)?),
            'P' => Self::Period(number(payload)?),
            'A' => Self::R1(number(payload)?),
            'B' => Self::R2(non_zero(number(payload)?)?),
            'C' => Self::Offset(number(payload)?),
            'D' => Self::Sensitivity(non_zero(number(payload)?)?),
            'S' => Self::Switch(number(payload)? != 0),
            _ => return None,
        };

        Some(command)
    }

    /// Opcode character as sent on the wire
    pub fn opcode(&self) -> char {
        match self {
            Self::Reset => 'R',
            Self::Dump => 'Z',
            Self::TuneOffset => 'T',
            Self::FeedId(_) => 'F',
            Self::ApiKey(_) => 'K',
            Self::FeedsUrl(_) => 'U',
            Self::Period(_) => 'P',
            Self::R1(_) => 'A',
            Self::R2(_) => 'B',
            Self::Offset(_) => 'C',
            Self::Sensitivity(_) => 'D',
            Self::Switch(_) => 'S',
        }
    }
}

fn number(payload: &str) -> Option<u32> {
    payload.trim().parse().ok()
}

fn non_zero(value: u32) -> Option<u32> {
    (value != 0).then_some(value)
}

/// What executing a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Settings or relay changed and the record was persisted
    Applied,
    /// Only a report was written
    Reported,
    /// Line was not a valid command
    Ignored,
}

/// Write every setting as one `@key: value` line
pub fn write_settings_dump<W: Write>(out: &mut W, settings: &CalibrationSettings) -> EnerginoResult<()> {
    let p = REPLY_PREFIX;
    writeln!(out, "{p}magic: {}", settings.magic)?;
    writeln!(out, "{p}revision: {}", settings.revision)?;
    writeln!(out, "{p}period: {} ms", settings.period_ms)?;
    writeln!(out, "{p}r1: {} Kohm", settings.r1_kohm)?;
    writeln!(out, "{p}r2: {} Kohm", settings.r2_kohm)?;
    writeln!(out, "{p}offset: {} mV", settings.offset_mv)?;
    writeln!(out, "{p}sensitivity: {} mV/A", settings.sensitivity_mv_per_a)?;
    writeln!(out, "{p}relaypin: {}", settings.relay_pin)?;
    writeln!(out, "{p}currentpin: {}", settings.current_pin)?;
    writeln!(out, "{p}voltagepin: {}", settings.voltage_pin)?;
    writeln!(out, "{p}feedid: {}", settings.feed_id)?;
    writeln!(out, "{p}feedsurl: {}", settings.feeds_url)?;
    writeln!(out, "{p}apikey: {}", settings.api_key)?;
    Ok(())
}

/// Accumulates serial bytes into complete command lines
///
/// `\r` is dropped, `\n` completes a line. A line longer than `N` bytes is
/// discarded in full, including the part that arrives after the overflow.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer<const N: usize = SERIAL_INPUT_CAPACITY> {
    buf: Vec<u8, N>,
    overflowed: bool,
}

impl<const N: usize> LineBuffer<N> {
    /// Empty buffer
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            overflowed: false,
        }
    }

    /// Feed one byte, returning the line it completes
    pub fn push(&mut self, byte: u8) -> Option<String<N>> {
        match byte {
            b'\r' => None,
            b'\n' => {
                let line = core::mem::take(&mut self.buf);
                if core::mem::take(&mut self.overflowed) {
                    log_debug!("Discarding serial line longer than {} bytes", N);
                    return None;
                }
                core::str::from_utf8(&line).ok().map(truncated::<N>)
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    /// Drop any partial line
    pub fn clear(&mut self) {
        self.buf.clear();
        self.overflowed = false;
    }

    /// Bytes buffered for the current line
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when no partial line is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
