//! Periodic Sampling Cycle
//!
//! ## State Machine
//!
//! ```text
//!            period elapsed
//!   ┌──────┐ ─────────────▶ ┌──────────┐
//!   │ Idle │                │ Sampling │  read current + voltage,
//!   └──────┘ ◀───────────── └──────────┘  filter, publish snapshot
//!              immediately
//! ```
//!
//! The control loop calls [`MeasurementCycle::tick`] as often as it likes.
//! A call made before `period` has elapsed since the last sample is a no-op,
//! so the loop can spin freely without oversampling. A tick never suspends
//! halfway: both channels are read and filtered and the snapshot is replaced
//! before `tick` returns. `&mut self` rules out reentrant ticks.
//!
//! ## Timing
//!
//! The first tick after construction or [`MeasurementCycle::reset`] samples
//! immediately. After that, the next sample is due `period` ms after the
//! previous one was taken. A timestamp earlier than the last sample (clock
//! adjusted backwards) counts as zero elapsed time.

use fugit::MillisDurationU32;

use crate::constants::DEFAULT_WINDOW_CAPACITY;
use crate::errors::EnerginoResult;
use crate::filter::MovingAverage;
use crate::settings::CalibrationSettings;
use crate::time::Timestamp;
use crate::traits::io::sample;
use crate::traits::{AnalogInput, RelayOutput};

/// Cycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// Waiting for the next period to elapse
    Idle,
    /// Reading and filtering one sample per channel
    Sampling,
}

/// Result of a `tick` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Period not yet elapsed, nothing read
    Skipped,
    /// Both channels sampled and the snapshot replaced
    Sampled,
}

/// Latest filtered readings, replaced wholesale each tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeasurementSnapshot {
    /// Filtered current-channel reading (raw counts)
    pub current_raw: f64,
    /// Filtered voltage-channel reading (raw counts)
    pub voltage_raw: f64,
    /// Ticks since the last reset
    pub samples: u32,
    /// Relay level when the snapshot was taken
    pub relay_on: bool,
    /// Time of the tick that produced this snapshot
    pub updated_at: Option<Timestamp>,
}

/// Two-channel sampling cycle with per-channel moving averages
#[derive(Debug, Clone)]
pub struct MeasurementCycle<const N: usize = DEFAULT_WINDOW_CAPACITY> {
    current: MovingAverage<N>,
    voltage: MovingAverage<N>,
    window: usize,
    snapshot: MeasurementSnapshot,
    state: CycleState,
    last_sample: Option<Timestamp>,
}

impl<const N: usize> MeasurementCycle<N> {
    /// Cycle averaging the last `window` samples of each channel
    pub fn new(window: usize) -> EnerginoResult<Self> {
        Ok(Self {
            current: MovingAverage::new(window)?,
            voltage: MovingAverage::new(window)?,
            window,
            snapshot: MeasurementSnapshot::default(),
            state: CycleState::Idle,
            last_sample: None,
        })
    }

    /// True when a tick at `now` would sample
    pub fn is_due(&self, now: Timestamp, period: MillisDurationU32) -> bool {
        match self.last_sample {
            None => true,
            Some(last) => now.saturating_sub(last) >= u64::from(period.to_millis()),
        }
    }

    /// Sample both channels if the configured period has elapsed
    ///
    /// A failed conversion leaves the previous snapshot in place and is
    /// retried one period later.
    pub fn tick<A, R>(
        &mut self,
        now: Timestamp,
        settings: &CalibrationSettings,
        adc: &mut A,
        relay: &R,
    ) -> EnerginoResult<TickOutcome>
    where
        A: AnalogInput + ?Sized,
        R: RelayOutput + ?Sized,
    {
        if !self.is_due(now, settings.period()) {
            return Ok(TickOutcome::Skipped);
        }

        self.state = CycleState::Sampling;
        self.last_sample = Some(now);
        let result = self.sample_channels(now, settings, adc, relay);
        self.state = CycleState::Idle;

        result.map(|()| TickOutcome::Sampled)
    }

    fn sample_channels<A, R>(
        &mut self,
        now: Timestamp,
        settings: &CalibrationSettings,
        adc: &mut A,
        relay: &R,
    ) -> EnerginoResult<()>
    where
        A: AnalogInput + ?Sized,
        R: RelayOutput + ?Sized,
    {
        let current_raw = sample(adc, settings.current_pin)?;
        let voltage_raw = sample(adc, settings.voltage_pin)?;

        self.current.add(i32::from(current_raw));
        self.voltage.add(i32::from(voltage_raw));

        self.snapshot = MeasurementSnapshot {
            current_raw: self.current.average(),
            voltage_raw: self.voltage.average(),
            samples: self.snapshot.samples.saturating_add(1),
            relay_on: relay.is_high(settings.relay_pin),
            updated_at: Some(now),
        };

        Ok(())
    }

    /// Drop all history: fresh windows, zero sample count, sample on next tick
    pub fn reset(&mut self) -> EnerginoResult<()> {
        *self = Self::new(self.window)?;
        Ok(())
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> &MeasurementSnapshot {
        &self.snapshot
    }

    /// Current phase
    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Samples per channel window
    pub fn window(&self) -> usize {
        self.window
    }
}
