//! Decoded volumes and the scoped handles that own them.
//!
//! A [`VolumeLoader`] turns an input file into a [`Volume`]: an opaque handle
//! over decoder-side state that can report the physical sample spacing and
//! produce a dense [`VoxelArray`]. Handles own resources that must be released
//! exactly once, so callers should hold them through a [`VolumeGuard`], which
//! releases on every exit path.
//!
//! The `txm` feature (enabled by default) provides [`TxmLoader`], a reader for
//! Xradia TXM tomographs. The `mock` feature provides an in-memory loader that
//! counts acquisitions and releases, intended for other crates' tests.

pub mod error;
mod guard;
#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "txm")]
mod txm;

pub use crate::guard::VolumeGuard;
#[cfg(feature = "mock")]
pub use crate::mock::{MockEntry, MockLoader};
#[cfg(feature = "txm")]
pub use crate::txm::{EXTENSION as TXM_EXTENSION, TxmLoader};

use crate::error::Result;
use derive_more::Display;
use ndarray::Array3;
use std::path::Path;

/// Scalar type of the samples held in a [`VoxelArray`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum DataType {
    #[display("u8")]
    U8,
    #[display("u16")]
    U16,
    #[display("f32")]
    F32,
}

impl DataType {
    /// Number of bytes a single sample occupies.
    pub fn size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

/// A dense voxel volume, indexed `(slice, row, column)`.
#[derive(Clone, Debug, PartialEq)]
pub enum VoxelArray {
    U8(Array3<u8>),
    U16(Array3<u16>),
    F32(Array3<f32>),
}

impl VoxelArray {
    /// Dimensions of the volume as `(slices, rows, columns)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        match self {
            Self::U8(a) => a.dim(),
            Self::U16(a) => a.dim(),
            Self::F32(a) => a.dim(),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::U8(_) => DataType::U8,
            Self::U16(_) => DataType::U16,
            Self::F32(_) => DataType::F32,
        }
    }

    /// Total number of voxels.
    pub fn len(&self) -> usize {
        let (slices, rows, columns) = self.dim();
        slices * rows * columns
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Array3<u8>> for VoxelArray {
    fn from(value: Array3<u8>) -> Self {
        Self::U8(value)
    }
}
impl From<Array3<u16>> for VoxelArray {
    fn from(value: Array3<u16>) -> Self {
        Self::U16(value)
    }
}
impl From<Array3<f32>> for VoxelArray {
    fn from(value: Array3<f32>) -> Self {
        Self::F32(value)
    }
}

/// A decoded volume owned by the decoding library.
///
/// Implementations hold decoder-side state until [`release`](Self::release) is
/// called. Prefer [`VolumeGuard`] over calling `release` directly.
pub trait Volume {
    /// Physical distance between adjacent samples along the x axis, in meters.
    fn spacing(&self) -> f64;

    /// Copies the full voxel data out of the decoder.
    fn to_array(&mut self) -> Result<VoxelArray>;

    /// Frees the decoder-side resources. Must be idempotent: releasing an
    /// already released volume does nothing.
    fn release(&mut self);
}

/// Opens input files as [`Volume`]s.
pub trait VolumeLoader {
    /// Short name of the decoder, for logging.
    fn name(&self) -> &str;

    /// File extension (without the leading dot) of the inputs this loader
    /// understands. Matched case-insensitively.
    fn extension(&self) -> &str;

    /// Decodes `path` into a volume handle. Anything acquired before a
    /// failure is released before the error is returned.
    fn load(&self, path: &Path) -> Result<Box<dyn Volume>>;
}
