use crate::discover::CandidatePair;

/// Drops every pair whose output already exists, leaving the work list.
///
/// This is a point-in-time check: nothing stops another process from
/// creating the output between here and the write.
pub fn pending(pairs: Vec<CandidatePair>) -> Vec<CandidatePair> {
    pairs
        .into_iter()
        .filter(|pair| {
            let done = pair.output.is_file();
            if done {
                tracing::debug!(input = %pair.input.display(), output = %pair.output.display(), "Already converted");
            }
            !done
        })
        .collect()
}
