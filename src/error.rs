//! Application Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, exn::Exn<ErrorKind>>;

/// What stopped the run. Pairs abandoned during a batch are not errors here.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Settings could not be loaded or are incomplete.
    #[display("configuration error")]
    Config,
    /// No container writer is available in this build.
    #[display("container format unavailable")]
    Container,
    /// The batch could not start.
    #[display("batch failed")]
    Pipeline,
}
