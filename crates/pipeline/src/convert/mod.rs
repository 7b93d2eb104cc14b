//! Converting a single input into its container.
//!
//! Each pending pair runs through the same sequence: make sure the output
//! directory exists, decode the input, read the sample spacing and the voxel
//! data, and write the container. The decoded volume is held through a
//! [`VolumeGuard`] so it is released exactly once whichever way the pair ends.

mod write;

use crate::Context;
use crate::discover::CandidatePair;
use crate::error::{ErrorKind, Result};
use derive_more::Display;
use exn::ResultExt;
use std::io;
use std::path::{Path, PathBuf};
use tomoconv_volume::VolumeGuard;
use tracing::instrument;

/// Name of the dataset holding the voxel data.
pub const FIELD: &str = "tomograph";
/// Attribute holding the sample spacing, in micrometers.
pub const PIXEL_SIZE: &str = "pixel size";
/// Attribute holding the unit of [`PIXEL_SIZE`].
pub const PIXEL_UNITS: &str = "pixel units";
pub const PIXEL_UNITS_LABEL: &str = r"$\mu m$";
pub const MICROMETERS_PER_METER: f64 = 1e6;

/// Where in the conversion of a pair things went wrong.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Stage {
    #[display("directory")]
    Directory,
    #[display("decode")]
    Decode,
    #[display("extract")]
    Extract,
    #[display("write")]
    Write,
}

/// A successfully written container.
#[derive(Clone, Debug, PartialEq)]
pub struct Converted {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Sample spacing in micrometers, as stored in the container.
    pub pixel_size: f64,
    /// Volume dimensions as `(slices, rows, columns)`.
    pub shape: (usize, usize, usize),
}

/// Creates `dir` and any missing parents.
///
/// Someone else having created it first is fine; anything else already
/// occupying the path is not.
fn ensure_dir(dir: &Path) -> Result<()> {
    match std::fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(err) => Err(err).or_raise(|| ErrorKind::Directory(dir.to_path_buf())),
    }
}

/// Converts one pair, returning what was written.
///
/// # Errors
/// Returns the [`ErrorKind`] matching the [`Stage`] that failed. Whatever the
/// outcome, the decoded volume has been released and no partial container is
/// left at the output path.
#[instrument(skip_all, fields(input = %pair.input.display()))]
pub fn convert_pair(ctx: &Context, pair: &CandidatePair) -> Result<Converted> {
    let CandidatePair { input, output } = pair;
    if let Some(dir) = output.parent() {
        ensure_dir(dir)?;
    }

    let mut volume = VolumeGuard::acquire(ctx.loader, input).or_raise(|| ErrorKind::Decode(input.clone()))?;
    let pixel_size = volume.spacing().or_raise(|| ErrorKind::Extract(input.clone()))? * MICROMETERS_PER_METER;
    let data = volume.to_array().or_raise(|| ErrorKind::Extract(input.clone()))?;
    tracing::debug!(pixel_size, data_type = %data.data_type(), shape = ?data.dim(), "Volume loaded");

    write::write_container(ctx.writer, output, &data, pixel_size)?;
    volume.release();

    tracing::info!(output = %output.display(), "Converted");
    Ok(Converted { input: input.clone(), output: output.clone(), pixel_size, shape: data.dim() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use tomoconv_container::{Attribute, FailAt, MockWriter};
    use tomoconv_volume::{MockEntry, MockLoader};

    fn pair(src: &Path, dst: &Path, name: &str) -> CandidatePair {
        CandidatePair { input: src.join(format!("{name}.txm")), output: dst.join("a/b").join(format!("{name}.hdf5")) }
    }

    #[test]
    fn test_convert_pair() {
        let dst = tempfile::tempdir().unwrap();
        let loader = MockLoader::new().with_volume("x.txm", 2.5e-6, Array3::<f32>::zeros((3, 4, 5)));
        let writer = MockWriter::new();
        let ctx = Context { loader: &loader, writer: &writer };
        let pair = pair(Path::new("/src"), dst.path(), "x");

        let converted = convert_pair(&ctx, &pair).unwrap();
        assert_eq!(converted.output, pair.output);
        assert_eq!(converted.shape, (3, 4, 5));
        assert!((converted.pixel_size - 2.5).abs() < 1e-9);

        let manifest = MockWriter::read(&pair.output).unwrap();
        let field = &manifest.fields[FIELD];
        assert_eq!(field.data_type, "f32");
        assert_eq!(field.attributes[PIXEL_UNITS], Attribute::from(PIXEL_UNITS_LABEL));
        assert_eq!((loader.acquired(), loader.released(), loader.release_calls()), (1, 1, 1));
    }

    #[test]
    fn test_directory_occupied_by_file() {
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(dst.path().join("a"), b"").unwrap();
        let loader = MockLoader::new();
        let writer = MockWriter::new();
        let ctx = Context { loader: &loader, writer: &writer };

        let err = convert_pair(&ctx, &pair(Path::new("/src"), dst.path(), "x")).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Directory));
        assert!(loader.loaded().is_empty());
    }

    #[test]
    fn test_existing_directory_is_fine() {
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dst.path().join("a/b")).unwrap();
        assert!(ensure_dir(&dst.path().join("a/b")).is_ok());
    }

    #[test]
    fn test_decode_failure() {
        let dst = tempfile::tempdir().unwrap();
        let loader = MockLoader::new().with_corrupt("x.txm");
        let writer = MockWriter::new();
        let ctx = Context { loader: &loader, writer: &writer };

        let err = convert_pair(&ctx, &pair(Path::new("/src"), dst.path(), "x")).unwrap_err();
        assert_eq!(*err, ErrorKind::Decode(PathBuf::from("/src/x.txm")));
        assert!(writer.created().is_empty());
        assert_eq!(loader.acquired(), 0);
    }

    #[test]
    fn test_extract_failure_releases_volume() {
        let dst = tempfile::tempdir().unwrap();
        let loader = MockLoader::new().with("x.txm", MockEntry::Unextractable { spacing: 1e-6 });
        let writer = MockWriter::new();
        let ctx = Context { loader: &loader, writer: &writer };

        let err = convert_pair(&ctx, &pair(Path::new("/src"), dst.path(), "x")).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Extract));
        assert!(writer.created().is_empty());
        assert_eq!((loader.acquired(), loader.released(), loader.release_calls()), (1, 1, 1));
    }

    #[test]
    fn test_write_failure_releases_volume_and_leaves_no_output() {
        let dst = tempfile::tempdir().unwrap();
        let loader = MockLoader::new();
        let writer = MockWriter::new().fail_at(FailAt::SetAttribute(PIXEL_SIZE.into()), "x.hdf5");
        let ctx = Context { loader: &loader, writer: &writer };
        let pair = pair(Path::new("/src"), dst.path(), "x");

        let err = convert_pair(&ctx, &pair).unwrap_err();
        assert_eq!(*err, ErrorKind::Write(pair.output.clone()));
        assert!(!pair.output.exists());
        assert_eq!(std::fs::read_dir(pair.output.parent().unwrap()).unwrap().count(), 0);
        assert_eq!((loader.acquired(), loader.released(), loader.release_calls()), (1, 1, 1));
    }
}
