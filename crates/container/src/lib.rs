//! Archival containers for converted volumes.
//!
//! A [`ContainerWriter`] creates [`ContainerFile`]s: self-describing files
//! holding named array fields with key/value attributes attached to them. The
//! writer is the only thing that knows the on-disk format; callers decide the
//! field names, the attributes and where the file goes.
//!
//! The HDF5 implementation links the native library and sits behind the
//! `hdf5` feature. Use [`hdf5_writer`] to obtain it, which fails with
//! [`DisabledFormat`](error::ErrorKind::DisabledFormat) when the feature is off. The `mock` feature
//! provides a JSON-backed writer with failure injection for other crates'
//! tests.

pub mod error;
#[cfg(feature = "hdf5")]
mod h5;
#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "hdf5")]
pub use crate::h5::Hdf5Writer;
#[cfg(feature = "mock")]
pub use crate::mock::{FailAt, Manifest, MockWriter};

use crate::error::Result;
use std::path::Path;
use tomoconv_volume::VoxelArray;

/// File extension of HDF5 containers, without the leading dot.
pub const HDF5_EXTENSION: &str = "hdf5";

pub type WriterHandle = Box<dyn ContainerWriter>;

/// A scalar attribute value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "mock", derive(serde::Serialize, serde::Deserialize), serde(untagged))]
pub enum Attribute {
    Float(f64),
    Text(String),
}

impl From<f64> for Attribute {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}
impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}
impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Creates container files of one format.
pub trait ContainerWriter {
    /// Short name of the format, for logging.
    fn name(&self) -> &str;

    /// File extension (without the leading dot) that files of this format use.
    fn extension(&self) -> &str;

    /// Creates (or truncates) the file at `path` and opens it for writing.
    fn create(&self, path: &Path) -> Result<Box<dyn ContainerFile>>;
}

/// An open container. Dropping it without [`close`](Self::close) releases the
/// handle but gives no guarantee that the contents were flushed.
pub trait ContainerFile {
    fn write_field(&mut self, name: &str, data: &VoxelArray) -> Result<()>;

    fn set_attribute(&mut self, field: &str, key: &str, value: &Attribute) -> Result<()>;

    /// Flushes and closes the file.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Returns the HDF5 writer, or [`DisabledFormat`](crate::error::ErrorKind::DisabledFormat) when this build
/// was compiled without the `hdf5` feature.
pub fn hdf5_writer() -> Result<WriterHandle> {
    #[cfg(feature = "hdf5")]
    {
        Ok(Box::new(Hdf5Writer))
    }
    #[cfg(not(feature = "hdf5"))]
    {
        tracing::warn!("Built without HDF5 support");
        exn::bail!(crate::error::ErrorKind::DisabledFormat(HDF5_EXTENSION.to_string()))
    }
}
