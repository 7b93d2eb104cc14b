//! In-memory [`VolumeLoader`] for tests.
//!
//! Every path loads successfully as a small default volume unless its file
//! name has been registered with a different [`MockEntry`]. Acquisitions and
//! releases are counted so tests can assert that every handle is released
//! exactly once.

use crate::error::{ErrorKind, Result};
use crate::{Volume, VolumeLoader, VoxelArray};
use ndarray::Array3;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How the mock should respond to loading a particular file name.
#[derive(Clone, Debug)]
pub enum MockEntry {
    /// Load successfully; spacing in meters.
    Volume { spacing: f64, data: VoxelArray },
    /// Fail to decode.
    Corrupt,
    /// Decode, but fail when the voxel array is extracted.
    Unextractable { spacing: f64 },
}

impl Default for MockEntry {
    fn default() -> Self {
        Self::Volume { spacing: 1e-6, data: VoxelArray::U16(Array3::from_elem((2, 2, 2), 7)) }
    }
}

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    release_calls: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MockLoader {
    entries: HashMap<OsString, MockEntry>,
    counters: Arc<Counters>,
    loaded: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the response for any input whose file name is `name`.
    pub fn with(mut self, name: impl Into<OsString>, entry: MockEntry) -> Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn with_volume(self, name: impl Into<OsString>, spacing: f64, data: impl Into<VoxelArray>) -> Self {
        self.with(name, MockEntry::Volume { spacing, data: data.into() })
    }

    pub fn with_corrupt(self, name: impl Into<OsString>) -> Self {
        self.with(name, MockEntry::Corrupt)
    }

    /// Number of volumes successfully handed out.
    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    /// Number of volumes whose resources were actually freed.
    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    /// Number of calls to [`Volume::release`], including redundant ones.
    pub fn release_calls(&self) -> usize {
        self.counters.release_calls.load(Ordering::SeqCst)
    }

    /// Every path passed to [`load`](VolumeLoader::load), in call order.
    pub fn loaded(&self) -> Vec<PathBuf> {
        self.loaded.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl VolumeLoader for MockLoader {
    fn name(&self) -> &str {
        "mock"
    }

    fn extension(&self) -> &str {
        "txm"
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Volume>> {
        if let Ok(mut loaded) = self.loaded.lock() {
            loaded.push(path.to_path_buf());
        }
        let entry = path.file_name().and_then(|name| self.entries.get(name)).cloned().unwrap_or_default();
        let (spacing, data) = match entry {
            MockEntry::Volume { spacing, data } => (spacing, Some(data)),
            MockEntry::Unextractable { spacing } => (spacing, None),
            MockEntry::Corrupt => exn::bail!(ErrorKind::Open(path.to_path_buf())),
        };
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockVolume { spacing, data, live: true, counters: Arc::clone(&self.counters) }))
    }
}

struct MockVolume {
    spacing: f64,
    data: Option<VoxelArray>,
    live: bool,
    counters: Arc<Counters>,
}

impl Volume for MockVolume {
    fn spacing(&self) -> f64 {
        self.spacing
    }

    fn to_array(&mut self) -> Result<VoxelArray> {
        if !self.live {
            exn::bail!(ErrorKind::Released);
        }
        match &self.data {
            Some(data) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::InvalidData),
        }
    }

    fn release(&mut self) {
        self.counters.release_calls.fetch_add(1, Ordering::SeqCst);
        if std::mem::replace(&mut self.live, false) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
