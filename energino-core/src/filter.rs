//! Fixed-Capacity Moving Average for ADC Smoothing
//!
//! ## Overview
//!
//! Each analog channel is smoothed by a simple moving average over the last
//! `capacity` raw samples. The filter runs once per sampling tick, so both
//! `add` and `average` are O(1): the window keeps a running total instead of
//! summing the ring on every read.
//!
//! ## Storage
//!
//! Samples live in an owned array sized by the const parameter `N`. The
//! runtime capacity can be anything in `1..=N` and is fixed at construction;
//! changing it means building a new window.
//!
//! ```text
//! MovingAverage<5>, capacity 3, after adding 10, 20, 30, 40:
//! ┌────┬────┬────┬────┬────┐
//! │ 40 │ 20 │ 30 │  - │  - │   total = 90, len = 3
//! └────┴────┴────┴────┴────┘
//!        ↑
//!        write_pos = 1 (oldest sample, overwritten next)
//! ```
//!
//! ## Interrupt Safety
//!
//! `add` updates the slot, the total and the write position as three separate
//! stores. If sampling ever moves into an interrupt handler, wrap `add` and
//! the snapshot publish in a critical section.
//!
//! ## Usage Example
//!
//! ```rust
//! use energino_core::filter::MovingAverage;
//!
//! let mut window = MovingAverage::<8>::new(3)?;
//! for raw in [10, 20, 30, 40] {
//!     window.add(raw);
//! }
//! assert_eq!(window.average(), 30.0);
//! # Ok::<(), energino_core::EnerginoError>(())
//! ```

use crate::constants::DEFAULT_WINDOW_CAPACITY;
use crate::errors::{EnerginoError, EnerginoResult};

/// Simple moving average over the most recent `capacity` samples
///
/// ## Internal Invariants
///
/// - `1 <= capacity <= N`
/// - `len <= capacity`
/// - `write_pos < capacity`
/// - `total` equals the sum of the `len` stored samples
#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize = DEFAULT_WINDOW_CAPACITY> {
    window: [i32; N],
    capacity: usize,

    /// Slot the next sample goes into; holds the oldest sample once full
    write_pos: usize,
    len: usize,

    /// Running sum, wide enough for N full-scale samples
    total: i64,
}

impl<const N: usize> MovingAverage<N> {
    /// Creates an empty window averaging the last `capacity` samples
    ///
    /// Fails with [`EnerginoError::InvalidWindow`] when `capacity` is zero or
    /// larger than the storage bound `N`. Either is a build-time mistake, so
    /// callers usually treat the error as fatal.
    pub fn new(capacity: usize) -> EnerginoResult<Self> {
        if capacity == 0 || capacity > N {
            return Err(EnerginoError::InvalidWindow { capacity, bound: N });
        }

        Ok(Self {
            window: [0; N],
            capacity,
            write_pos: 0,
            len: 0,
            total: 0,
        })
    }

    /// Creates an empty window using the whole storage bound
    pub fn with_full_capacity() -> EnerginoResult<Self> {
        Self::new(N)
    }

    /// Inserts a sample, evicting the oldest one once the window is full
    pub fn add(&mut self, value: i32) {
        if self.len == self.capacity {
            self.total -= i64::from(self.window[self.write_pos]);
        } else {
            self.len += 1;
        }

        self.window[self.write_pos] = value;
        self.total += i64::from(value);
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// Mean of the stored samples, or `0.0` before the first `add`
    pub fn average(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }

        self.total as f64 / self.len as f64
    }

    /// Number of samples currently contributing to the average
    pub fn len(&self) -> usize {
        self.len
    }

    /// True before the first sample
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once `capacity` samples have been added
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Window size fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Running sum of the stored samples
    pub fn total(&self) -> i64 {
        self.total
    }
}
