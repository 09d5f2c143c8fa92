//! Seed search strategies behind one `solve` entry point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::*;
use crate::observation::{ObservationSet, SearchRange};

pub mod brute_force;
pub mod constraint;
pub mod symbolic;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Lowest matching seed for single-threaded search, some matching seed
    /// otherwise.
    Found(u32),
    /// The range was not covered completely, or it was covered without a match.
    NotFound,
    /// Proof that no seed in the range satisfies the modeled constraints.
    Unsatisfiable,
    Cancelled,
    UnsupportedIndex(u32),
}

/// Why a search stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Halt {
    Cancelled,
    TimedOut,
}

impl Halt {
    pub fn outcome(self) -> SeedOutcome {
        match self {
            Halt::Cancelled => SeedOutcome::Cancelled,
            // a timeout is absence of proof, not a failure
            Halt::TimedOut => SeedOutcome::NotFound,
        }
    }
}

/// External cancellation plus an optional deadline, shared by everything
/// taking part in one search.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl StopSignal {
    pub fn new() -> Self {
        StopSignal::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        StopSignal {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Same cancel flag, fresh deadline.
    pub fn rearm(&self, timeout: Option<Duration>) -> Self {
        StopSignal {
            cancelled: Arc::clone(&self.cancelled),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn poll(&self) -> Option<Halt> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(Halt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Halt::TimedOut),
            _ => None,
        }
    }
}

/// How the constraint strategy models the draws it encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TwistModel {
    /// Draw `i < 624` tempers word `i` of the first twisted block, exactly as
    /// the generator does.
    FirstTwist,
    /// Draw `i < 624` tempers word `i` of the freshly initialized state. Only
    /// generators that emit before twisting behave like this.
    PreTwist,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    BruteForce,
    Parallel { workers: usize, chunk_size: u64 },
    Constraint(TwistModel),
}

impl Strategy {
    pub fn solve(
        &self,
        observations: &ObservationSet,
        range: SearchRange,
        stop: &StopSignal,
    ) -> Result<SeedOutcome, Error> {
        match *self {
            Strategy::BruteForce => Ok(brute_force::search(observations, range, stop)),
            Strategy::Parallel {
                workers,
                chunk_size,
            } => crate::parallel::search(observations, range, stop, workers, chunk_size),
            Strategy::Constraint(model) => {
                Ok(constraint::solve(observations, range, model, stop))
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::BruteForce => "brute force",
            Strategy::Parallel { .. } => "parallel brute force",
            Strategy::Constraint(_) => "constraint solve",
        }
    }
}
