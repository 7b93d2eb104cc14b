use clap::Parser;
use std::path::PathBuf;
use tomoconv_config::Overrides;

/// Convert every TXM tomograph under SEARCH into an HDF5 container under
/// DESTINATION, mirroring the directory hierarchy.
///
/// Inputs whose output already exists are skipped, so an interrupted run can
/// simply be started again.
#[derive(Debug, Parser)]
#[command(name = "tomoconv", version)]
pub struct Cli {
    /// Directory to search for inputs.
    pub search: Option<PathBuf>,

    /// Directory to write containers into; created as needed.
    pub destination: Option<PathBuf>,

    /// Ignore inputs whose path matches this regular expression. Repeatable.
    #[arg(short = 'x', long = "exclude", value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Directory levels below SEARCH to reproduce: -1 for all, 0 for none.
    #[arg(short, long, value_name = "DEPTH", allow_negative_numbers = true)]
    pub depth: Option<i64>,

    /// List what would be converted without converting anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Read settings from this file instead of the per-user default.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log more; repeat for even more.
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Log errors only.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            search: self.search.clone(),
            destination: self.destination.clone(),
            exclude: self.exclude.clone(),
            depth: self.depth,
        }
    }
}
