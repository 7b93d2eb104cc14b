use crate::error::{ErrorKind, Result};
use crate::path::{Depth, map_output};
use exn::ResultExt;
use regex::{Regex, RegexSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// An input file together with the output it converts to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Patterns that remove candidates from discovery.
///
/// A path is excluded if any pattern matches anywhere in it. Patterns are not
/// anchored; use `^`/`$` for that, and `(?i)` for case-insensitive matching.
#[derive(Clone, Debug)]
pub struct Exclusions(RegexSet);

impl Exclusions {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(|p| p.as_ref().to_string()).collect();
        // Compiled one at a time first so the error names the offending pattern.
        for pattern in &patterns {
            Regex::new(pattern).or_raise(|| ErrorKind::Exclusion(pattern.clone()))?;
        }
        let set = RegexSet::new(&patterns).or_raise(|| ErrorKind::Exclusion(patterns.join(", ")))?;
        Ok(Self(set))
    }

    pub fn none() -> Self {
        Self(RegexSet::empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.0.is_match(&path.to_string_lossy())
    }
}

impl Default for Exclusions {
    fn default() -> Self {
        Self::none()
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}

/// Recursively finds every `input_extension` file under `search_root` that is
/// not excluded, and pairs it with its output under `dest_root`.
///
/// Symbolic links are followed. Entries that cannot be read (permissions,
/// link loops, files vanishing mid-walk) are logged and skipped.
pub fn discover(
    search_root: &Path,
    dest_root: &Path,
    exclusions: &Exclusions,
    depth: Depth,
    input_extension: &str,
    output_extension: &str,
) -> Vec<CandidatePair> {
    let mut pairs = Vec::new();
    for entry in WalkDir::new(search_root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
                tracing::warn!(path = %path, error = %err, "Skipping unreadable entry");
                continue;
            },
        };
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, input_extension) {
            continue;
        }
        if exclusions.is_excluded(path) {
            tracing::debug!(path = %path.display(), "Excluded");
            continue;
        }
        match map_output(path, search_root, dest_root, depth, output_extension) {
            Ok(output) => pairs.push(CandidatePair { input: path.to_path_buf(), output }),
            Err(err) => tracing::warn!(path = %path.display(), error = ?err, "Skipping unmappable input"),
        }
    }
    tracing::debug!(root = %search_root.display(), found = pairs.len(), "Discovery finished");
    pairs
}
