mod cli;
mod error;
mod logging;

use crate::cli::Cli;
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use std::process::ExitCode;
use tomoconv_config::Config;
use tomoconv_container::HDF5_EXTENSION;
use tomoconv_pipeline::{Context, Request};
use tomoconv_volume::{TXM_EXTENSION, TxmLoader};

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(logging::level(cli.verbose, cli.quiet));

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

fn execute(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref(), &cli.overrides()).or_raise(|| ErrorKind::Config)?;
    let request = Request { dry_run: cli.dry_run, ..config.into_request().or_raise(|| ErrorKind::Config)? };

    if request.dry_run {
        // Skip opening the container library so a dry run works in every build.
        tomoconv_pipeline::dry_run(&request, TXM_EXTENSION, HDF5_EXTENSION).or_raise(|| ErrorKind::Pipeline)?;
        return Ok(());
    }

    let writer = tomoconv_container::hdf5_writer().or_raise(|| ErrorKind::Container)?;
    let ctx = Context { loader: &TxmLoader, writer: writer.as_ref() };
    tomoconv_pipeline::run(&ctx, &request).or_raise(|| ErrorKind::Pipeline)?;
    Ok(())
}
