//! Mirror a tree of tomographs into a tree of containers.
//!
//! A batch walks the search root for inputs, drops the excluded ones, maps
//! each survivor onto an output path below the destination root, skips the
//! ones already converted and converts the rest, one at a time. Failures
//! abandon a single pair, never the batch.
//!
//! ```no_run
//! use tomoconv_pipeline::{Context, Request, run};
//! use tomoconv_volume::TxmLoader;
//!
//! let Ok(writer) = tomoconv_container::hdf5_writer() else { return };
//! let ctx = Context { loader: &TxmLoader, writer: writer.as_ref() };
//! let request = Request::new("/data/scans", "/data/converted");
//! match run(&ctx, &request) {
//!     Ok(report) => println!("{} converted, {} abandoned", report.converted.len(), report.abandoned.len()),
//!     Err(err) => eprintln!("{err:?}"),
//! }
//! ```

mod batch;
pub mod convert;
mod discover;
pub mod error;
mod filter;
pub mod path;

pub use crate::batch::{Abandoned, Plan, Report, dry_run, plan, run};
pub use crate::convert::{Converted, Stage, convert_pair};
pub use crate::discover::{CandidatePair, Exclusions, discover};
pub use crate::filter::pending;
pub use crate::path::{Depth, map_output};

use std::path::PathBuf;
use tomoconv_container::ContainerWriter;
use tomoconv_volume::VolumeLoader;

/// The collaborators a batch converts with.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub loader: &'a dyn VolumeLoader,
    pub writer: &'a dyn ContainerWriter,
}

/// What to convert and where to put it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request {
    pub search: PathBuf,
    pub destination: PathBuf,
    /// Regular expressions; inputs whose path matches any of them are ignored.
    pub exclude: Vec<String>,
    pub depth: Depth,
    /// Discover and filter, but convert nothing.
    pub dry_run: bool,
}

impl Request {
    pub fn new(search: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self { search: search.into(), destination: destination.into(), ..Self::default() }
    }
}
