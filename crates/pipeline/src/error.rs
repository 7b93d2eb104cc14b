//! Pipeline Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use crate::convert::Stage;
use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// The first group is fatal to a batch and is returned before any file is
/// touched. The second group abandons a single pair; the batch carries on.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The search root does not exist or is not a directory.
    #[display("search root is not a directory: {}", _0.display())]
    SearchRoot(#[error(not(source))] PathBuf),
    /// The destination root exists but is not a directory.
    #[display("destination root is not a directory: {}", _0.display())]
    Destination(#[error(not(source))] PathBuf),
    /// An exclusion pattern is not a valid regular expression.
    #[display("invalid exclusion pattern: {_0}")]
    Exclusion(#[error(not(source))] String),
    /// Depth is neither `-1` nor a non-negative integer.
    #[display("invalid depth: {_0} (expected -1 or a non-negative integer)")]
    Depth(#[error(not(source))] String),
    /// No output path can be derived for this input.
    #[display("cannot derive an output path for: {}", _0.display())]
    Path(#[error(not(source))] PathBuf),

    /// The output directory could not be created.
    #[display("unable to create directory: {}", _0.display())]
    Directory(#[error(not(source))] PathBuf),
    /// The input could not be decoded.
    #[display("unable to decode: {}", _0.display())]
    Decode(#[error(not(source))] PathBuf),
    /// Spacing or voxel data could not be read from the decoded input.
    #[display("unable to extract volume from: {}", _0.display())]
    Extract(#[error(not(source))] PathBuf),
    /// The container could not be written; no output was left behind.
    #[display("unable to write container: {}", _0.display())]
    Write(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if the whole batch must stop.
    pub fn is_fatal(&self) -> bool {
        self.stage().is_none()
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Directory(_) | Self::Write(_))
    }

    /// The conversion stage at which a pair was abandoned, if this error
    /// abandons a pair.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Directory(_) => Some(Stage::Directory),
            Self::Decode(_) => Some(Stage::Decode),
            Self::Extract(_) => Some(Stage::Extract),
            Self::Write(_) => Some(Stage::Write),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::Depth("-2".into()).to_string(), "invalid depth: -2 (expected -1 or a non-negative integer)");
        assert_eq!(ErrorKind::Decode("/data/x.txm".into()).to_string(), "unable to decode: /data/x.txm");
    }

    #[test]
    fn error_kind_fatality() {
        assert!(ErrorKind::SearchRoot("/nope".into()).is_fatal());
        assert!(ErrorKind::Exclusion("(".into()).is_fatal());
        assert!(!ErrorKind::Write("/out/x.hdf5".into()).is_fatal());
        assert_eq!(ErrorKind::Extract("x".into()).stage(), Some(Stage::Extract));
    }
}
