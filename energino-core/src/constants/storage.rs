//! Persisted Record Geometry
//!
//! The settings record is written as one block at a fixed address. The block
//! is larger than the worst-case encoded record so a schema revision can grow
//! a few fields without moving anything.

/// Storage address of the settings block.
pub const SETTINGS_ADDRESS: usize = 0;

/// Size of the settings block in bytes.
///
/// Worst case encoding today is ~165 bytes (two full strings, five u32
/// varints at 5 bytes each).
pub const SETTINGS_BLOCK_SIZE: usize = 192;
