//! Settings Persistence
//!
//! ## Record Layout
//!
//! The settings record is encoded with `postcard` and written as one
//! zero-padded block of [`SETTINGS_BLOCK_SIZE`] bytes at
//! [`SETTINGS_ADDRESS`]:
//!
//! ```text
//! ┌──────────────────────────────┬──────────────────┐
//! │ postcard(CalibrationSettings)│ 0x00 padding ... │  192 bytes
//! └──────────────────────────────┴──────────────────┘
//! ```
//!
//! Erased EEPROM/flash reads back as `0xFF`, which never decodes into a
//! record with the right magic, so a blank device boots into factory
//! defaults.
//!
//! ## Failure Model
//!
//! A write is a single block write and the medium is trusted to complete it.
//! There is no checksum: a record that decodes, carries the right magic and
//! passes validation is taken at face value.
//!
//! ## Backends
//!
//! - [`MemoryStorage`]: array-backed, for simulation and tests
//! - [`FileStorage`]: a host file standing in for EEPROM (requires std)

use crate::constants::{SETTINGS_ADDRESS, SETTINGS_BLOCK_SIZE};
use crate::errors::{EnerginoError, EnerginoResult};
use crate::settings::CalibrationSettings;
use crate::traits::BlockStorage;

/// Load/save front end for the settings record
#[derive(Debug)]
pub struct SettingsStore<S> {
    storage: S,
    address: usize,
}

impl<S: BlockStorage> SettingsStore<S> {
    /// Store using the standard settings address
    pub fn new(storage: S) -> Self {
        Self::at(storage, SETTINGS_ADDRESS)
    }

    /// Store using a custom address
    pub fn at(storage: S, address: usize) -> Self {
        Self { storage, address }
    }

    /// Read and decode the record
    ///
    /// Returns [`EnerginoError::CorruptSettings`] when the block does not
    /// decode, carries a foreign magic tag or revision, or would make a
    /// conversion divide by zero.
    pub fn load(&mut self) -> EnerginoResult<CalibrationSettings> {
        let mut block = [0u8; SETTINGS_BLOCK_SIZE];
        self.storage.read_block(self.address, &mut block)?;

        let settings: CalibrationSettings = postcard::from_bytes(&block)?;
        if settings.validate().is_err() {
            return Err(EnerginoError::CorruptSettings);
        }

        Ok(settings)
    }

    /// Encode and write the full record as one block
    pub fn save(&mut self, settings: &CalibrationSettings) -> EnerginoResult<()> {
        let mut block = [0u8; SETTINGS_BLOCK_SIZE];
        postcard::to_slice(settings, &mut block)?;
        self.storage.write_block(self.address, &block)
    }

    /// Write and return the factory defaults
    pub fn reset_to_factory_defaults(&mut self) -> EnerginoResult<CalibrationSettings> {
        let settings = CalibrationSettings::factory_defaults();
        self.save(&settings)?;
        Ok(settings)
    }

    /// Boot-time load: fall back to (and persist) factory defaults when the
    /// stored record is corrupt
    ///
    /// Storage read errors are propagated; only a bad record triggers the
    /// reset.
    pub fn load_or_reset(&mut self) -> EnerginoResult<CalibrationSettings> {
        match self.load() {
            Ok(settings) => Ok(settings),
            Err(EnerginoError::CorruptSettings) => {
                log_warn!("Settings record corrupt or uninitialized, restoring factory defaults");
                self.reset_to_factory_defaults()
            }
            Err(err) => Err(err),
        }
    }

    /// Underlying block storage
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Underlying block storage, mutably
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Give back the block storage
    pub fn into_inner(self) -> S {
        self.storage
    }
}

/// Array-backed block storage
///
/// Starts erased (`0xFF`) like a fresh EEPROM and counts writes so tests can
/// check what was persisted and when.
#[derive(Debug, Clone)]
pub struct MemoryStorage<const N: usize> {
    bytes: [u8; N],
    writes: u32,
}

impl<const N: usize> MemoryStorage<N> {
    /// Erased storage
    pub const fn new() -> Self {
        Self {
            bytes: [0xFF; N],
            writes: 0,
        }
    }

    /// Raw contents
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of block writes performed
    pub fn writes(&self) -> u32 {
        self.writes
    }

    fn range(&self, address: usize, len: usize) -> EnerginoResult<core::ops::Range<usize>> {
        let end = address.checked_add(len).filter(|end| *end <= N).ok_or(
            EnerginoError::Storage {
                reason: "block outside storage",
            },
        )?;
        Ok(address..end)
    }
}

impl<const N: usize> Default for MemoryStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BlockStorage for MemoryStorage<N> {
    fn read_block(&mut self, address: usize, buf: &mut [u8]) -> EnerginoResult<()> {
        let range = self.range(address, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write_block(&mut self, address: usize, data: &[u8]) -> EnerginoResult<()> {
        let range = self.range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }
}

/// File standing in for the device EEPROM (requires std)
///
/// A missing file reads as erased storage. Writes rewrite the whole file,
/// growing it with `0xFF` when the block lies past its end.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: std::path::PathBuf,
}

#[cfg(feature = "std")]
impl FileStorage {
    /// Storage backed by `path`; the file is created on first write
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn contents(&self) -> EnerginoResult<std::vec::Vec<u8>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(std::vec::Vec::new()),
            Err(_err) => {
                log_warn!("Reading {} failed: {}", self.path.display(), _err);
                Err(EnerginoError::Storage { reason: "file read failed" })
            }
        }
    }
}

#[cfg(feature = "std")]
impl BlockStorage for FileStorage {
    fn read_block(&mut self, address: usize, buf: &mut [u8]) -> EnerginoResult<()> {
        let contents = self.contents()?;
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = contents.get(address + i).copied().unwrap_or(0xFF);
        }
        Ok(())
    }

    fn write_block(&mut self, address: usize, data: &[u8]) -> EnerginoResult<()> {
        let mut contents = self.contents()?;
        let end = address + data.len();
        if contents.len() < end {
            contents.resize(end, 0xFF);
        }
        contents[address..end].copy_from_slice(data);

        std::fs::write(&self.path, &contents).map_err(|_err| {
            log_warn!("Writing {} failed: {}", self.path.display(), _err);
            EnerginoError::Storage { reason: "file write failed" }
        })
    }
}
