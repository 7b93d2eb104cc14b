//! Layered configuration for tomoconv.
//!
//! Settings are merged from, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. a configuration file (TOML, YAML or JSON, chosen by extension),
//! 3. `TOMOCONV_*` environment variables,
//! 4. command-line [`Overrides`].
//!
//! Exclusion lists accumulate across layers; every other setting is replaced
//! by the highest layer that sets it.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tomoconv_pipeline::{Depth, Request};

pub const ENV_PREFIX: &str = "TOMOCONV_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory to search for inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<PathBuf>,
    /// Directory to mirror the hierarchy into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Regular expressions; matching inputs are ignored.
    pub exclude: Vec<String>,
    /// `-1` mirrors everything, `0` flattens, `N` keeps N levels.
    pub depth: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self { search: None, destination: None, exclude: Vec::new(), depth: Depth::Full.into() }
    }
}

/// Settings given on the command line. Unset fields leave lower layers alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
}

/// The per-user configuration file, if the platform has a config directory.
pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tomoconv").map(|dirs| dirs.config_dir().join("config.toml"))
}

fn file_provider(figment: Figment, path: &Path) -> Figment {
    let extension = path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}

/// Builds the layered figment without extracting it.
///
/// An explicit `file` must exist; without one, the [default](default_path)
/// file is used if present.
pub fn figment(file: Option<&Path>, overrides: &Overrides) -> Result<Figment> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    match file {
        Some(path) if !path.is_file() => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading configuration file");
            figment = file_provider(figment, path);
        },
        None => {
            if let Some(path) = default_path().filter(|path| path.is_file()) {
                tracing::debug!(path = %path.display(), "Loading default configuration file");
                figment = file_provider(figment, &path);
            }
        },
    }
    Ok(figment.merge(Env::prefixed(ENV_PREFIX)).admerge(Serialized::defaults(overrides)))
}

impl Config {
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::extract(figment(file, overrides)?)
    }

    pub fn extract(figment: Figment) -> Result<Self> {
        figment.extract().or_raise(|| ErrorKind::Invalid)
    }

    /// Turns the settings into a batch request.
    ///
    /// # Errors
    /// Fails with [`ErrorKind::Missing`] when the search or destination root
    /// was never given, and [`ErrorKind::Invalid`] for an unusable depth.
    pub fn into_request(self) -> Result<Request> {
        let Some(search) = self.search else {
            exn::bail!(ErrorKind::Missing("search"));
        };
        let Some(destination) = self.destination else {
            exn::bail!(ErrorKind::Missing("destination"));
        };
        let depth = Depth::try_from(self.depth).or_raise(|| ErrorKind::Invalid)?;
        Ok(Request { search, destination, exclude: self.exclude, depth, dry_run: false })
    }
}
