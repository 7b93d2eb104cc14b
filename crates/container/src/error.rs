//! Container Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A container error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for container operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The container file could not be created.
    #[display("unable to create container: {}", _0.display())]
    Create(#[error(not(source))] PathBuf),
    /// Writing the named field failed.
    #[display("unable to write field: {_0}")]
    Field(#[error(not(source))] String),
    /// Attaching an attribute (field, key) failed.
    #[display("unable to set attribute {_1:?} on field {_0}")]
    Attribute(#[error(not(source))] String, String),
    /// Flushing and closing the container failed; its contents are suspect.
    #[display("unable to close container")]
    Close,
    /// Error reported by the underlying container library.
    #[display("backend error: {_0}")]
    Backend(#[error(not(source))] String),
    /// The format is supported but was not enabled at build time.
    #[display("disabled format: {_0}")]
    DisabledFormat(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Close)
    }
}
