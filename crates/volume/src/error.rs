//! Volume Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A volume error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for volume operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input could not be opened as a volume at all.
    #[display("unable to open volume: {}", _0.display())]
    Open(#[error(not(source))] PathBuf),
    /// A metadata entry required to interpret the voxel data is absent.
    #[display("missing metadata: {_0}")]
    MissingField(#[error(not(source))] String),
    /// A metadata entry exists but holds a value that cannot be interpreted.
    #[display("malformed metadata: {_0}")]
    MalformedField(#[error(not(source))] String),
    /// The voxel sample type code is not one that can be decoded.
    #[display("unsupported voxel data type: {_0}")]
    UnsupportedDataType(#[error(not(source))] u32),
    /// Voxel data is truncated or inconsistent with the declared geometry.
    #[display("invalid or corrupted voxel data")]
    InvalidData,
    /// The handle was used after it had already been released.
    #[display("volume has already been released")]
    Released,
    /// An I/O operation failed while reading the input.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exn::ResultExt;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::UnsupportedDataType(7).to_string(), "unsupported voxel data type: 7");
        assert_eq!(ErrorKind::MissingField("ImageInfo/PixelSize".into()).to_string(), "missing metadata: ImageInfo/PixelSize");
        assert_eq!(ErrorKind::Released.to_string(), "volume has already been released");
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::InvalidData.is_retryable());
        assert!(!ErrorKind::Open(PathBuf::from("scan.txm")).is_retryable());
    }

    #[test]
    fn error_from_io() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read"));
        let err: Result<()> = result.or_raise(|| ErrorKind::Io);
        assert_eq!(*err.unwrap_err(), ErrorKind::Io);
    }
}
