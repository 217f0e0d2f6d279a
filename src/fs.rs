use crate::DeviceError;
use thiserror::Error;

pub mod fat12;

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum FsError {
    #[error("Invalid or truncated on-disk structure")]
    Format,
    #[error("No such file or directory")]
    NotFound,
    #[error("Not a directory")]
    NotADirectory,
    #[error("Is a directory")]
    IsADirectory,
    #[error("Not enough free blocks")]
    NoSpace,
    #[error("File already exists")]
    AlreadyExists,
    #[error("Directory not empty")]
    DirectoryNotEmpty,
    #[error("Cannot remove a protected directory")]
    ProtectedTarget,
    #[error("Storage I/O failed")]
    Storage,
}

impl From<DeviceError> for FsError {
    #[inline]
    fn from(_: DeviceError) -> Self {
        Self::Storage
    }
}

pub type FsResult<T> = Result<T, FsError>;
