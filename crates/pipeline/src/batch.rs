use crate::convert::{Converted, Stage, convert_pair};
use crate::discover::{CandidatePair, Exclusions, discover};
use crate::error::{Error, ErrorKind, Result};
use crate::filter::pending;
use crate::{Context, Request};

/// The work a batch would do, before any of it is done.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    /// Inputs found under the search root, after exclusions.
    pub discovered: usize,
    /// Pairs whose output does not exist yet, in discovery order.
    pub pending: Vec<CandidatePair>,
}

impl Plan {
    /// Pairs left out because their output already exists.
    pub fn skipped(&self) -> usize {
        self.discovered - self.pending.len()
    }
}

/// A pair that was given up on, and why.
#[derive(Debug)]
pub struct Abandoned {
    pub pair: CandidatePair,
    pub stage: Stage,
    pub error: Error,
}

/// Outcome of a batch.
#[derive(Debug, Default)]
pub struct Report {
    pub discovered: usize,
    pub skipped: usize,
    /// Pairs that were due for conversion. Left untouched by a dry run.
    pub pending: Vec<CandidatePair>,
    pub converted: Vec<Converted>,
    pub abandoned: Vec<Abandoned>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.abandoned.is_empty()
    }
}

/// Validates `request` and works out which pairs still need converting.
///
/// # Errors
/// Fails with [`ErrorKind::SearchRoot`] if the search root is not a
/// directory, [`ErrorKind::Destination`] if the destination exists but is not
/// a directory, or [`ErrorKind::Exclusion`] if a pattern does not compile.
pub fn plan(request: &Request, input_extension: &str, output_extension: &str) -> Result<Plan> {
    if !request.search.is_dir() {
        exn::bail!(ErrorKind::SearchRoot(request.search.clone()));
    }
    if request.destination.exists() && !request.destination.is_dir() {
        exn::bail!(ErrorKind::Destination(request.destination.clone()));
    }
    let exclusions = Exclusions::new(&request.exclude)?;

    let pairs = discover(
        &request.search,
        &request.destination,
        &exclusions,
        request.depth,
        input_extension,
        output_extension,
    );
    let discovered = pairs.len();
    Ok(Plan { discovered, pending: pending(pairs) })
}

fn start(request: &Request, input_extension: &str, output_extension: &str) -> Result<(Plan, Report)> {
    let plan = plan(request, input_extension, output_extension)?;
    let report = Report { discovered: plan.discovered, skipped: plan.skipped(), ..Report::default() };
    tracing::info!(
        search = %request.search.display(),
        destination = %request.destination.display(),
        discovered = report.discovered,
        skipped = report.skipped,
        pending = plan.pending.len(),
        "Starting batch"
    );
    Ok((plan, report))
}

/// Reports what [`run`] would convert, converting nothing.
///
/// Needs no loader or writer, so it works in builds without container
/// support. Fails for the same reasons as [`plan`].
pub fn dry_run(request: &Request, input_extension: &str, output_extension: &str) -> Result<Report> {
    let (plan, mut report) = start(request, input_extension, output_extension)?;
    for pair in &plan.pending {
        tracing::info!(input = %pair.input.display(), output = %pair.output.display(), "Would convert");
    }
    report.pending = plan.pending;
    Ok(report)
}

/// Converts every pending pair under the request's search root.
///
/// Pairs are converted one after the other. A pair that fails is recorded in
/// [`Report::abandoned`] and the batch moves on; only problems with the
/// request itself (see [`plan`]) make this return an error. A request with
/// `dry_run` set goes through [`dry_run`] instead.
pub fn run(ctx: &Context, request: &Request) -> Result<Report> {
    if request.dry_run {
        return dry_run(request, ctx.loader.extension(), ctx.writer.extension());
    }
    let (plan, mut report) = start(request, ctx.loader.extension(), ctx.writer.extension())?;

    for pair in &plan.pending {
        match convert_pair(ctx, pair) {
            Ok(converted) => report.converted.push(converted),
            Err(error) => {
                // Anything fatal would have been caught while planning.
                let stage = error.stage().unwrap_or(Stage::Write);
                tracing::error!(
                    input = %pair.input.display(),
                    output = %pair.output.display(),
                    %stage,
                    error = ?error,
                    "Abandoned"
                );
                report.abandoned.push(Abandoned { pair: pair.clone(), stage, error });
            },
        }
    }
    report.pending = plan.pending;

    tracing::info!(
        discovered = report.discovered,
        skipped = report.skipped,
        converted = report.converted.len(),
        abandoned = report.abandoned.len(),
        "Batch finished"
    );
    Ok(report)
}
