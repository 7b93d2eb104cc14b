use crate::error::{ErrorKind, Result};
use crate::{Volume, VolumeLoader, VoxelArray};
use exn::OptionExt;
use std::path::{Path, PathBuf};

/// Scoped ownership of a decoded [`Volume`].
///
/// The volume is acquired in [`acquire`](Self::acquire) and released exactly
/// once: either by an explicit [`release`](Self::release) or when the guard is
/// dropped, whichever happens first. Further releases are no-ops.
pub struct VolumeGuard {
    path: PathBuf,
    volume: Option<Box<dyn Volume>>,
}

impl VolumeGuard {
    pub fn acquire(loader: &dyn VolumeLoader, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let volume = loader.load(path)?;
        tracing::debug!(loader = loader.name(), path = %path.display(), "Volume acquired");
        Ok(Self { path: path.to_path_buf(), volume: Some(volume) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.volume.is_none()
    }

    /// Sample spacing in meters.
    pub fn spacing(&self) -> Result<f64> {
        Ok(self.volume.as_ref().ok_or_raise(|| ErrorKind::Released)?.spacing())
    }

    pub fn to_array(&mut self) -> Result<VoxelArray> {
        self.volume.as_mut().ok_or_raise(|| ErrorKind::Released)?.to_array()
    }

    pub fn release(&mut self) {
        if let Some(mut volume) = self.volume.take() {
            volume.release();
            tracing::debug!(path = %self.path.display(), "Volume released");
        }
    }
}

impl Drop for VolumeGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;
    use std::cell::Cell;
    use std::rc::Rc;

    struct CountingVolume {
        releases: Rc<Cell<usize>>,
    }
    impl Volume for CountingVolume {
        fn spacing(&self) -> f64 {
            2.5e-6
        }
        fn to_array(&mut self) -> Result<VoxelArray> {
            Ok(Array3::<u8>::zeros((1, 2, 2)).into())
        }
        fn release(&mut self) {
            self.releases.set(self.releases.get() + 1);
        }
    }

    struct CountingLoader {
        releases: Rc<Cell<usize>>,
        fail: bool,
    }
    impl VolumeLoader for CountingLoader {
        fn name(&self) -> &str {
            "counting"
        }
        fn extension(&self) -> &str {
            "vol"
        }
        fn load(&self, path: &Path) -> Result<Box<dyn Volume>> {
            if self.fail {
                exn::bail!(ErrorKind::Open(path.to_path_buf()));
            }
            Ok(Box::new(CountingVolume { releases: Rc::clone(&self.releases) }))
        }
    }

    fn loader(fail: bool) -> CountingLoader {
        CountingLoader { releases: Rc::new(Cell::new(0)), fail }
    }

    #[test]
    fn drop_releases_once() {
        let loader = loader(false);
        {
            let guard = VolumeGuard::acquire(&loader, "scan.vol").unwrap();
            assert_eq!(guard.spacing().unwrap(), 2.5e-6);
        }
        assert_eq!(loader.releases.get(), 1);
    }

    #[test]
    fn explicit_release_is_idempotent() {
        let loader = loader(false);
        let mut guard = VolumeGuard::acquire(&loader, "scan.vol").unwrap();
        guard.release();
        guard.release();
        assert!(guard.is_released());
        drop(guard);
        assert_eq!(loader.releases.get(), 1);
    }

    #[test]
    fn use_after_release_is_an_error() {
        let loader = loader(false);
        let mut guard = VolumeGuard::acquire(&loader, "scan.vol").unwrap();
        guard.release();
        assert_eq!(*guard.spacing().unwrap_err(), ErrorKind::Released);
        assert_eq!(*guard.to_array().unwrap_err(), ErrorKind::Released);
    }

    #[test]
    fn failed_acquire_releases_nothing() {
        let loader = loader(true);
        let err = VolumeGuard::acquire(&loader, "broken.vol").err().unwrap();
        assert!(matches!(&*err, ErrorKind::Open(_)));
        assert_eq!(loader.releases.get(), 0);
    }

    #[test]
    fn release_happens_on_early_return() {
        fn extract(loader: &dyn VolumeLoader) -> Result<VoxelArray> {
            let guard = VolumeGuard::acquire(loader, "scan.vol")?;
            let _ = guard.spacing()?;
            exn::bail!(ErrorKind::InvalidData);
        }
        let loader = loader(false);
        assert!(extract(&loader).is_err());
        assert_eq!(loader.releases.get(), 1);
    }
}
