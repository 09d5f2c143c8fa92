use std::time::Duration;

use crate::errors::*;
use crate::observation::SearchRange;
use crate::search::Strategy;

/// Seeds below this bound are tried before the rest of the 31-bit space.
pub const DEFAULT_SPLIT: u64 = 50_000_000;
pub const DEFAULT_CHUNK_SIZE: u64 = 1_000_000;

/// Everything a crack run needs besides its observations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrackConfig {
    pub strategy: Strategy,
    /// Searched in order until one of them yields a seed.
    pub ranges: Vec<SearchRange>,
    pub timeout: Option<Duration>,
    pub target_index: u32,
}

impl Default for CrackConfig {
    fn default() -> Self {
        CrackConfig {
            strategy: Strategy::BruteForce,
            ranges: default_ranges(),
            timeout: None,
            target_index: oracle::TARGET_INDEX,
        }
    }
}

impl CrackConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_ranges(mut self, ranges: Vec<SearchRange>) -> Self {
        self.ranges = ranges;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_target_index(mut self, target_index: u32) -> Self {
        self.target_index = target_index;
        self
    }

    /// Puts `range` in front of the schedule.
    pub fn prepend_range(&mut self, range: SearchRange) {
        self.ranges.insert(0, range);
    }

    pub fn validate(&self) -> Result<(), Error> {
        ensure!(!self.ranges.is_empty(), "no search ranges configured");
        if let Strategy::Parallel {
            workers,
            chunk_size,
        } = self.strategy
        {
            ensure!(workers > 0, "worker count must be positive");
            ensure!(chunk_size > 0, "chunk size must be positive");
        }
        Ok(())
    }
}

pub fn default_ranges() -> Vec<SearchRange> {
    vec![
        SearchRange::fixed(0, DEFAULT_SPLIT),
        SearchRange::fixed(DEFAULT_SPLIT, 1 << 31),
    ]
}

pub fn default_workers() -> usize {
    num_cpus::get()
}

pub fn parallel(workers: Option<usize>, chunk_size: Option<u64>) -> Strategy {
    Strategy::Parallel {
        workers: workers.unwrap_or_else(default_workers),
        chunk_size: chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::TwistModel;

    #[test]
    fn defaults() {
        let config = CrackConfig::default();
        assert_eq!(config.strategy, Strategy::BruteForce);
        assert_eq!(config.target_index, 2019);
        assert_eq!(config.timeout, None);
        assert_eq!(
            config.ranges,
            vec![
                SearchRange::new(0, 50_000_000).unwrap(),
                SearchRange::new(50_000_000, 1 << 31).unwrap(),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_schedule_is_rejected() {
        let config = CrackConfig::default().with_ranges(Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn recent_window_goes_first() {
        let mut config = CrackConfig::default()
            .with_strategy(Strategy::Constraint(TwistModel::FirstTwist));
        let window = SearchRange::around(1_600_000_000, 60, 0).unwrap();
        config.prepend_range(window);
        assert_eq!(config.ranges[0], window);
        assert_eq!(config.ranges.len(), 3);
    }

    #[test]
    fn parallel_defaults_use_every_cpu() {
        match parallel(None, None) {
            Strategy::Parallel {
                workers,
                chunk_size,
            } => {
                assert_eq!(workers, num_cpus::get());
                assert_eq!(chunk_size, DEFAULT_CHUNK_SIZE);
            }
            other => panic!("unexpected strategy {:?}", other),
        }
    }
}
