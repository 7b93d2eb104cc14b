use crate::convert::{FIELD, PIXEL_SIZE, PIXEL_UNITS, PIXEL_UNITS_LABEL};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use tempfile::TempPath;
use tomoconv_container::error::Result as ContainerResult;
use tomoconv_container::{Attribute, ContainerWriter};
use tomoconv_volume::VoxelArray;

/// Writes a container to `output` such that it either appears fully written
/// or not at all.
///
/// The container is built under a hidden staging name next to `output` and
/// renamed over it once closed. On any failure the staged file is removed.
pub(crate) fn write_container(
    writer: &dyn ContainerWriter,
    output: &Path,
    data: &VoxelArray,
    pixel_size: f64,
) -> Result<()> {
    let failed = || ErrorKind::Write(output.to_path_buf());
    let (Some(dir), Some(name)) = (output.parent(), output.file_name()) else {
        exn::bail!(failed());
    };
    let prefix = format!(".{}.", name.to_string_lossy());
    let mut builder = tempfile::Builder::new();
    builder.prefix(&prefix).suffix(".partial");
    // Staging files default to 0600; the output should get the usual umask mode.
    #[cfg(unix)]
    builder.permissions(std::os::unix::fs::PermissionsExt::from_mode(0o666));
    let staged = builder.tempfile_in(dir).or_raise(failed)?.into_temp_path();

    if let Err(err) = fill(writer, &staged, data, pixel_size) {
        discard(staged, output);
        return Err(err).or_raise(failed);
    }
    // A failed rename hands the staged path back; dropping it deletes the file.
    staged.persist(output).map_err(|e| e.error).or_raise(failed)?;
    Ok(())
}

fn fill(writer: &dyn ContainerWriter, path: &Path, data: &VoxelArray, pixel_size: f64) -> ContainerResult<()> {
    // Dropping the file on an early return closes the handle.
    let mut file = writer.create(path)?;
    file.write_field(FIELD, data)?;
    file.set_attribute(FIELD, PIXEL_SIZE, &Attribute::Float(pixel_size))?;
    file.set_attribute(FIELD, PIXEL_UNITS, &Attribute::from(PIXEL_UNITS_LABEL))?;
    file.close()
}

fn discard(staged: TempPath, output: &Path) {
    let path = staged.to_path_buf();
    match staged.close() {
        Ok(()) => tracing::info!(output = %output.display(), "Removed partial output"),
        Err(err) => tracing::error!(path = %path.display(), error = %err, "Unable to remove partial output"),
    }
}
