//! Mapping discovered inputs onto output paths.
//!
//! The output of an input is fully determined by the input path, the search
//! root, the destination root and a [`Depth`]. Nothing here touches the
//! filesystem.

use crate::error::{Error, ErrorKind, Result};
use derive_more::Display;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How much of the hierarchy below the search root is reproduced at the
/// destination.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Hash)]
pub enum Depth {
    /// Every directory between the search root and the input.
    #[default]
    #[display("-1")]
    Full,
    /// Only the first N directories below the search root. Zero flattens
    /// every output into the destination root.
    #[display("{_0}")]
    Limited(usize),
}

impl TryFrom<i64> for Depth {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            -1 => Ok(Self::Full),
            n => match usize::try_from(n) {
                Ok(n) => Ok(Self::Limited(n)),
                Err(_) => exn::bail!(ErrorKind::Depth(n.to_string())),
            },
        }
    }
}

impl From<Depth> for i64 {
    fn from(value: Depth) -> Self {
        match value {
            Depth::Full => -1,
            Depth::Limited(n) => i64::try_from(n).unwrap_or(i64::MAX),
        }
    }
}

impl FromStr for Depth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().parse::<i64>() {
            Ok(value) => Self::try_from(value),
            Err(_) => exn::bail!(ErrorKind::Depth(s.to_string())),
        }
    }
}

/// Whether `path` names a network location (`//host/share` or `\\host\share`).
pub fn is_network(path: &Path) -> bool {
    let text = path.to_string_lossy();
    text.starts_with("//") || text.starts_with(r"\\")
}

/// Splits a path into its segments.
///
/// Network paths are split on `/` after normalizing backslashes, with empty
/// segments dropped. Everything else uses the platform's own notion of path
/// components, so a leading root counts as a segment on both sides of a
/// comparison.
fn segments(path: &Path) -> Vec<OsString> {
    if is_network(path) {
        path.to_string_lossy()
            .replace('\\', "/")
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(OsString::from)
            .collect()
    } else {
        path.components().map(|component| component.as_os_str().to_os_string()).collect()
    }
}

/// Computes where the converted form of `input` belongs.
///
/// The output keeps the input's file stem with `extension` appended, and is
/// placed under `dest_root` inside the directories selected by `depth` from
/// between `search_root` and the input.
///
/// # Errors
/// Returns [`ErrorKind::Path`] if `input` has no file stem.
pub fn map_output(
    input: &Path,
    search_root: &Path,
    dest_root: &Path,
    depth: Depth,
    extension: &str,
) -> Result<PathBuf> {
    let mut parent = segments(input);
    let stem = parent.pop().and_then(|file| Path::new(&file).file_stem().map(OsStr::to_os_string));
    let Some(mut name) = stem else {
        exn::bail!(ErrorKind::Path(input.to_path_buf()));
    };
    name.push(".");
    name.push(extension);

    let start = segments(search_root).len();
    let end = match depth {
        Depth::Full => parent.len(),
        Depth::Limited(n) => start.saturating_add(n).min(parent.len()),
    };
    let mirrored = parent.get(start..end).unwrap_or_default();

    if is_network(dest_root) {
        let joined: Vec<String> = segments(dest_root)
            .iter()
            .chain(mirrored)
            .map(|segment| segment.to_string_lossy().into_owned())
            .chain(std::iter::once(name.to_string_lossy().into_owned()))
            .collect();
        return Ok(PathBuf::from(format!("//{}", joined.join("/"))));
    }

    let mut output = dest_root.to_path_buf();
    output.extend(mirrored.iter().map(OsString::as_os_str));
    output.push(OsStr::new(&name));
    Ok(output)
}
