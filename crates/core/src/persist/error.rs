//! Record load error types

use crate::traits::storage::StorageError;
use core::fmt;

/// Reasons a persisted record fails to load.
///
/// Every variant resolves the same way: the loader falls back to factory
/// defaults and persists them. The variants exist so the recovery can be
/// logged with its cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadError {
    /// Underlying storage operation failed
    Storage(StorageError),
    /// Not enough bytes for a header
    TruncatedHeader,
    /// Header magic does not match the record type
    WrongMagic,
    /// Version is 0 or newer than this firmware understands
    BadVersion,
    /// Payload size is 0 or larger than the current layout
    BadSize,
    /// Payload checksum mismatch
    CrcMismatch,
    /// Payload bytes could not be decoded for the claimed version
    Undecodable,
    /// Decoded fields failed domain validation
    Invalid,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Storage(e) => write!(f, "storage error: {}", e),
            LoadError::TruncatedHeader => write!(f, "truncated header"),
            LoadError::WrongMagic => write!(f, "wrong magic"),
            LoadError::BadVersion => write!(f, "unsupported version"),
            LoadError::BadSize => write!(f, "bad payload size"),
            LoadError::CrcMismatch => write!(f, "checksum mismatch"),
            LoadError::Undecodable => write!(f, "undecodable payload"),
            LoadError::Invalid => write!(f, "domain validation failed"),
        }
    }
}

impl From<StorageError> for LoadError {
    fn from(e: StorageError) -> Self {
        LoadError::Storage(e)
    }
}
