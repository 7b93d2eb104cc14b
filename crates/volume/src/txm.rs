//! Xradia TXM reader.
//!
//! TXM files are OLE2 compound documents. Geometry and calibration live in
//! small streams under `ImageInfo/`, and each slice is stored as its own raw
//! little-endian stream, a hundred slices per `ImageDataN` storage:
//!
//! ```text
//! ImageInfo/ImageWidth     u32
//! ImageInfo/ImageHeight    u32
//! ImageInfo/NoOfImages     u32   (older files: ImageInfo/ImagesTaken)
//! ImageInfo/PixelSize      f32   micrometers
//! ImageInfo/DataType       u32   5 = u16, 10 = f32 (optional)
//! ImageData1/Image1 .. ImageData1/Image100, ImageData2/Image101, ...
//! ```

use crate::error::{ErrorKind, Result};
use crate::{DataType, Volume, VolumeLoader, VoxelArray};
use cfb::CompoundFile;
use exn::{OptionExt, ResultExt};
use ndarray::Array3;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Extension of TXM inputs, without the leading dot.
pub const EXTENSION: &str = "txm";

const WIDTH: &str = "/ImageInfo/ImageWidth";
const HEIGHT: &str = "/ImageInfo/ImageHeight";
const IMAGES: &str = "/ImageInfo/NoOfImages";
const IMAGES_TAKEN: &str = "/ImageInfo/ImagesTaken";
const PIXEL_SIZE: &str = "/ImageInfo/PixelSize";
const DATA_TYPE: &str = "/ImageInfo/DataType";
const IMAGES_PER_STORAGE: usize = 100;
const METERS_PER_MICROMETER: f64 = 1e-6;

/// Decodes `.txm` files into [`Volume`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct TxmLoader;

impl VolumeLoader for TxmLoader {
    fn name(&self) -> &str {
        "txm"
    }

    fn extension(&self) -> &str {
        EXTENSION
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Volume>> {
        let mut file = cfb::open(path).or_raise(|| ErrorKind::Open(path.to_path_buf()))?;
        // On error the compound file is dropped here, closing the handle.
        let info = ImageInfo::read(&mut file)?;
        tracing::trace!(
            width = info.width,
            height = info.height,
            images = info.images,
            pixel_size = info.pixel_size,
            "Read TXM image info"
        );
        Ok(Box::new(TxmVolume { file: Some(file), info }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ImageInfo {
    width: usize,
    height: usize,
    images: usize,
    /// Micrometers.
    pixel_size: f32,
    data_type: Option<u32>,
}

impl ImageInfo {
    fn read(file: &mut CompoundFile<File>) -> Result<Self> {
        let width = read_u32(file, WIDTH)?.ok_or_raise(|| ErrorKind::MissingField(WIDTH.into()))?;
        let height = read_u32(file, HEIGHT)?.ok_or_raise(|| ErrorKind::MissingField(HEIGHT.into()))?;
        let images = match read_u32(file, IMAGES)? {
            Some(n) => n,
            None => read_u32(file, IMAGES_TAKEN)?.ok_or_raise(|| ErrorKind::MissingField(IMAGES.into()))?,
        };
        let pixel_size = read_f32(file, PIXEL_SIZE)?.ok_or_raise(|| ErrorKind::MissingField(PIXEL_SIZE.into()))?;
        if !pixel_size.is_finite() {
            exn::bail!(ErrorKind::MalformedField(PIXEL_SIZE.into()));
        }
        let data_type = read_u32(file, DATA_TYPE)?;
        Ok(Self {
            width: to_usize(width)?,
            height: to_usize(height)?,
            images: to_usize(images)?,
            pixel_size,
            data_type,
        })
    }

    fn slice_len(&self) -> usize {
        self.width * self.height
    }

    /// Resolves the sample type, from the declared code when present and from
    /// the size of the first slice otherwise.
    fn resolve_data_type(&self, first_slice_bytes: usize) -> Result<DataType> {
        match self.data_type {
            Some(5) => Ok(DataType::U16),
            Some(10) => Ok(DataType::F32),
            Some(other) => exn::bail!(ErrorKind::UnsupportedDataType(other)),
            None => [DataType::U16, DataType::F32, DataType::U8]
                .into_iter()
                .find(|t| t.size() * self.slice_len() == first_slice_bytes)
                .ok_or_raise(|| ErrorKind::InvalidData),
        }
    }
}

struct TxmVolume {
    file: Option<CompoundFile<File>>,
    info: ImageInfo,
}

impl Volume for TxmVolume {
    fn spacing(&self) -> f64 {
        f64::from(self.info.pixel_size) * METERS_PER_MICROMETER
    }

    fn to_array(&mut self) -> Result<VoxelArray> {
        let info = self.info;
        let file = self.file.as_mut().ok_or_raise(|| ErrorKind::Released)?;
        let shape = (info.images, info.height, info.width);
        if info.images == 0 {
            return Ok(VoxelArray::U16(Array3::zeros(shape)));
        }

        let first = read_image(file, 0)?;
        let data_type = info.resolve_data_type(first.len())?;
        let slice_bytes = data_type.size() * info.slice_len();
        if first.len() != slice_bytes {
            exn::bail!(ErrorKind::InvalidData);
        }
        let mut raw = Vec::with_capacity(slice_bytes * info.images);
        raw.extend_from_slice(&first);
        for index in 1..info.images {
            let image = read_image(file, index)?;
            if image.len() != slice_bytes {
                tracing::debug!(index, expected = slice_bytes, actual = image.len(), "TXM slice has unexpected size");
                exn::bail!(ErrorKind::InvalidData);
            }
            raw.extend_from_slice(&image);
        }

        Ok(match data_type {
            DataType::U8 => VoxelArray::U8(Array3::from_shape_vec(shape, raw).or_raise(|| ErrorKind::InvalidData)?),
            DataType::U16 => {
                let samples = raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
                VoxelArray::U16(Array3::from_shape_vec(shape, samples).or_raise(|| ErrorKind::InvalidData)?)
            },
            DataType::F32 => {
                let samples = raw.chunks_exact(4).map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]])).collect();
                VoxelArray::F32(Array3::from_shape_vec(shape, samples).or_raise(|| ErrorKind::InvalidData)?)
            },
        })
    }

    fn release(&mut self) {
        // Dropping the compound file closes the underlying handle.
        self.file.take();
    }
}

fn image_stream(index: usize) -> String {
    format!("/ImageData{}/Image{}", index / IMAGES_PER_STORAGE + 1, index + 1)
}

fn read_image(file: &mut CompoundFile<File>, index: usize) -> Result<Vec<u8>> {
    let name = image_stream(index);
    read_stream(file, &name)?.ok_or_raise(|| ErrorKind::MissingField(name))
}

fn read_stream(file: &mut CompoundFile<File>, name: &str) -> Result<Option<Vec<u8>>> {
    if !file.is_stream(name) {
        return Ok(None);
    }
    let mut stream = file.open_stream(name).or_raise(|| ErrorKind::Io)?;
    let mut buffer = Vec::new();
    stream.read_to_end(&mut buffer).or_raise(|| ErrorKind::Io)?;
    Ok(Some(buffer))
}

/// Metadata streams may hold one value per image; only the first is used.
fn read_head<const N: usize>(file: &mut CompoundFile<File>, name: &str) -> Result<Option<[u8; N]>> {
    let Some(bytes) = read_stream(file, name)? else {
        return Ok(None);
    };
    let head = bytes.get(..N).ok_or_raise(|| ErrorKind::MalformedField(name.into()))?;
    let head = <[u8; N]>::try_from(head).or_raise(|| ErrorKind::MalformedField(name.into()))?;
    Ok(Some(head))
}

fn read_u32(file: &mut CompoundFile<File>, name: &str) -> Result<Option<u32>> {
    Ok(read_head::<4>(file, name)?.map(u32::from_le_bytes))
}

fn read_f32(file: &mut CompoundFile<File>, name: &str) -> Result<Option<f32>> {
    Ok(read_head::<4>(file, name)?.map(f32::from_le_bytes))
}

fn to_usize(value: u32) -> Result<usize> {
    usize::try_from(value).or_raise(|| ErrorKind::InvalidData)
}
