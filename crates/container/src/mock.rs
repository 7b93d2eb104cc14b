//! JSON-backed [`ContainerWriter`] for tests.
//!
//! Files are real files on disk so that existence checks and cleanup behave
//! like the real thing, but their contents are a [`Manifest`] describing what
//! was written rather than the voxel data itself. Failures can be injected at
//! any stage for files whose name contains a given needle.

use crate::error::{ErrorKind, Result};
use crate::{Attribute, ContainerFile, ContainerWriter};
use exn::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tomoconv_volume::VoxelArray;

/// Stage at which a [`MockWriter`] should fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailAt {
    Create,
    WriteField,
    /// Fail when setting the attribute with this key.
    SetAttribute(String),
    Close,
}

/// What a mock container file records about its contents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub fields: BTreeMap<String, FieldManifest>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldManifest {
    pub data_type: String,
    pub shape: Vec<usize>,
    pub attributes: BTreeMap<String, Attribute>,
}

#[derive(Clone, Default)]
pub struct MockWriter {
    failure: Option<(FailAt, String)>,
    created: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails at `stage` for every file whose name contains `needle`.
    pub fn fail_at(mut self, stage: FailAt, needle: impl Into<String>) -> Self {
        self.failure = Some((stage, needle.into()));
        self
    }

    /// Every path passed to [`create`](ContainerWriter::create), in call order.
    pub fn created(&self) -> Vec<PathBuf> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Reads back the manifest of a closed mock container.
    pub fn read(path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        let file = File::open(path).or_raise(|| ErrorKind::Backend(format!("unreadable: {}", path.display())))?;
        serde_json::from_reader(file).or_raise(|| ErrorKind::Backend(format!("not a manifest: {}", path.display())))
    }

    fn failure_for(&self, path: &Path) -> Option<FailAt> {
        let (stage, needle) = self.failure.as_ref()?;
        let name = path.file_name()?.to_string_lossy();
        name.contains(needle.as_str()).then(|| stage.clone())
    }
}

impl ContainerWriter for MockWriter {
    fn name(&self) -> &str {
        "mock"
    }

    fn extension(&self) -> &str {
        crate::HDF5_EXTENSION
    }

    fn create(&self, path: &Path) -> Result<Box<dyn ContainerFile>> {
        if let Ok(mut created) = self.created.lock() {
            created.push(path.to_path_buf());
        }
        let fail = self.failure_for(path);
        if fail == Some(FailAt::Create) {
            exn::bail!(ErrorKind::Create(path.to_path_buf()));
        }
        let file = File::create(path).or_raise(|| ErrorKind::Create(path.to_path_buf()))?;
        tracing::debug!(path = %path.display(), ?fail, "Created mock container");
        Ok(Box::new(MockFile { file, manifest: Manifest::default(), fail }))
    }
}

struct MockFile {
    file: File,
    manifest: Manifest,
    fail: Option<FailAt>,
}

impl ContainerFile for MockFile {
    fn write_field(&mut self, name: &str, data: &VoxelArray) -> Result<()> {
        if self.fail == Some(FailAt::WriteField) {
            exn::bail!(ErrorKind::Field(name.to_string()));
        }
        let (slices, rows, columns) = data.dim();
        let field = FieldManifest {
            data_type: data.data_type().to_string(),
            shape: vec![slices, rows, columns],
            attributes: BTreeMap::new(),
        };
        // Leave something behind so a failure after this point has a partial
        // file to clean up.
        writeln!(self.file, "partial: {name}").or_raise(|| ErrorKind::Field(name.to_string()))?;
        self.manifest.fields.insert(name.to_string(), field);
        Ok(())
    }

    fn set_attribute(&mut self, field: &str, key: &str, value: &Attribute) -> Result<()> {
        let failed = || ErrorKind::Attribute(field.to_string(), key.to_string());
        if matches!(&self.fail, Some(FailAt::SetAttribute(k)) if k == key) {
            exn::bail!(failed());
        }
        let Some(entry) = self.manifest.fields.get_mut(field) else {
            exn::bail!(failed());
        };
        entry.attributes.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let MockFile { mut file, manifest, fail } = *self;
        if fail == Some(FailAt::Close) {
            tracing::debug!("Injected close failure");
            exn::bail!(ErrorKind::Close);
        }
        file.set_len(0).or_raise(|| ErrorKind::Close)?;
        file.rewind().or_raise(|| ErrorKind::Close)?;
        serde_json::to_writer(&mut file, &manifest).or_raise(|| ErrorKind::Close)?;
        file.sync_all().or_raise(|| ErrorKind::Close)
    }
}
