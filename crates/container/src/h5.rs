//! HDF5 containers via the native library.

use crate::error::{ErrorKind, Result};
use crate::{Attribute, ContainerFile, ContainerWriter, HDF5_EXTENSION};
use exn::ResultExt;
use hdf5::types::VarLenUnicode;
use std::path::{Path, PathBuf};
use tomoconv_volume::VoxelArray;

/// Writes each field as a dataset at the file root and each attribute as a
/// scalar attribute on that dataset.
#[derive(Clone, Copy, Debug, Default)]
pub struct Hdf5Writer;

impl ContainerWriter for Hdf5Writer {
    fn name(&self) -> &str {
        "hdf5"
    }

    fn extension(&self) -> &str {
        HDF5_EXTENSION
    }

    fn create(&self, path: &Path) -> Result<Box<dyn ContainerFile>> {
        let file = backend(hdf5::File::create(path)).or_raise(|| ErrorKind::Create(path.to_path_buf()))?;
        tracing::debug!(path = %path.display(), "Created HDF5 file");
        Ok(Box::new(Hdf5File { file, path: path.to_path_buf() }))
    }
}

struct Hdf5File {
    file: hdf5::File,
    path: PathBuf,
}

impl ContainerFile for Hdf5File {
    fn write_field(&mut self, name: &str, data: &VoxelArray) -> Result<()> {
        let builder = self.file.new_dataset_builder();
        let dataset = match data {
            VoxelArray::U8(array) => builder.with_data(array).create(name),
            VoxelArray::U16(array) => builder.with_data(array).create(name),
            VoxelArray::F32(array) => builder.with_data(array).create(name),
        };
        backend(dataset).or_raise(|| ErrorKind::Field(name.to_string()))?;
        tracing::trace!(field = name, data_type = %data.data_type(), shape = ?data.dim(), "Wrote dataset");
        Ok(())
    }

    fn set_attribute(&mut self, field: &str, key: &str, value: &Attribute) -> Result<()> {
        let failed = || ErrorKind::Attribute(field.to_string(), key.to_string());
        let dataset = backend(self.file.dataset(field)).or_raise(failed)?;
        let written = match value {
            Attribute::Float(v) => dataset.new_attr::<f64>().create(key).and_then(|attr| attr.write_scalar(v)),
            Attribute::Text(s) => {
                let text = s
                    .parse::<VarLenUnicode>()
                    .map_err(|e| exn::Exn::from(ErrorKind::Backend(e.to_string())))
                    .or_raise(failed)?;
                dataset.new_attr::<VarLenUnicode>().create(key).and_then(|attr| attr.write_scalar(&text))
            },
        };
        backend(written).or_raise(failed)
    }

    fn close(self: Box<Self>) -> Result<()> {
        let Hdf5File { file, path } = *self;
        backend(file.close()).or_raise(|| ErrorKind::Close)?;
        tracing::debug!(path = %path.display(), "Closed HDF5 file");
        Ok(())
    }
}

/// The library's error stack is flattened to text so that it can travel
/// inside an [`Exn`](exn::Exn) tree.
fn backend<T>(result: hdf5::Result<T>) -> Result<T> {
    result.map_err(|e| exn::Exn::from(ErrorKind::Backend(e.to_string())))
}
