//! Brute force split over a fixed-size worker pool.

use std::sync::atomic::{AtomicU64, Ordering};

use rayon::ThreadPoolBuilder;

use crate::errors::*;
use crate::observation::{ObservationSet, SearchRange};
use crate::search::brute_force::search_until;
use crate::search::{Halt, SeedOutcome, StopSignal};

const NONE_FOUND: u64 = u64::MAX;

/// Searches `range` in chunks of `chunk_size` seeds on `workers` threads.
///
/// Returns some matching seed, not necessarily the lowest in the range: among
/// the seeds found before the other workers noticed, the lowest one wins.
pub fn search(
    observations: &ObservationSet,
    range: SearchRange,
    stop: &StopSignal,
    workers: usize,
    chunk_size: u64,
) -> Result<SeedOutcome, Error> {
    ensure!(workers > 0, "parallel search needs at least one worker");
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("seed-worker-{}", i))
        .build()?;
    let chunks = range.chunks(chunk_size);
    tracing::info!(%range, workers, chunks = chunks.len(), "parallel seed search");

    let found = AtomicU64::new(NONE_FOUND);
    pool.scope_fifo(|scope| {
        let found = &found;
        for chunk in chunks {
            scope.spawn_fifo(move |_| {
                let halt = || {
                    if found.load(Ordering::Relaxed) != NONE_FOUND {
                        return Some(Halt::Cancelled);
                    }
                    stop.poll()
                };
                if let SeedOutcome::Found(seed) = search_until(observations, chunk, halt) {
                    tracing::debug!(seed, %chunk, "worker found a seed");
                    found.fetch_min(u64::from(seed), Ordering::Relaxed);
                }
            });
        }
    });

    let found = found.into_inner();
    if found != NONE_FOUND {
        return Ok(SeedOutcome::Found(found as u32));
    }
    Ok(match stop.poll() {
        Some(halt) => halt.outcome(),
        None => SeedOutcome::NotFound,
    })
}
