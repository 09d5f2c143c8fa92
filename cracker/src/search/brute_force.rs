use crate::observation::{ObservationSet, SearchRange};
use crate::search::{Halt, SeedOutcome, StopSignal};
use crate::verify::verify;

/// Candidates between two progress reports.
const PROGRESS_INTERVAL: u64 = 1 << 22;

/// Tries every seed of `range` in ascending order and returns the first one
/// whose replay matches all observations.
pub fn search(observations: &ObservationSet, range: SearchRange, stop: &StopSignal) -> SeedOutcome {
    tracing::info!(%range, observations = observations.len(), "brute forcing seed");
    search_until(observations, range, || stop.poll())
}

/// The candidate loop. `halt` is polled before every candidate, so a stop
/// request takes effect after at most one more replay.
pub fn search_until<F>(observations: &ObservationSet, range: SearchRange, halt: F) -> SeedOutcome
where
    F: Fn() -> Option<Halt>,
{
    let mut checked = 0u64;
    for candidate in range.seeds() {
        if let Some(halt) = halt() {
            tracing::debug!(?halt, candidate, "search stopped");
            return halt.outcome();
        }
        if verify(candidate, observations) {
            tracing::info!(seed = candidate, "found matching seed");
            return SeedOutcome::Found(candidate);
        }
        checked += 1;
        if checked % PROGRESS_INTERVAL == 0 {
            tracing::debug!(progress = range.lo() + checked, end = range.hi(), "brute force progress");
        }
    }
    SeedOutcome::NotFound
}
