#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]

extern crate alloc;
use thiserror::Error;

pub mod fs;

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum DeviceError {
    #[error("I/O error")]
    Io,
    #[error("Out of bounds")]
    OutOfBounds,
}

/// A fixed-size random-access store divided into equal-size sectors.
///
/// The driver only ever issues whole-sector reads and writes, indexed by
/// absolute sector number.
pub trait BlockDevice {
    const BLOCK_SIZE: usize;

    /// Read sectors from the device into the given buffer.
    ///
    /// The `sector` parameter is the absolute sector number from the start
    /// of the device. The `count` parameter is the number of sectors to
    /// read; `dst` must hold `count * Self::BLOCK_SIZE` bytes.
    ///
    /// ## Errors
    ///
    /// This function returns an error if the read operation failed.
    fn read(&mut self, dst: &mut [u8], sector: usize, count: usize) -> Result<(), DeviceError>;

    /// Write sectors to the device from the given buffer.
    ///
    /// `src` must have a size multiple of `Self::BLOCK_SIZE`.
    ///
    /// ## Errors
    ///
    /// This function returns an error if the write operation failed.
    fn write(&mut self, src: &[u8], sector: usize) -> Result<(), DeviceError>;
}
