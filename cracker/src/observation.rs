use std::fmt;

use crate::errors::*;

/// A claim that draw number `index` of the generator produced `value`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Observation {
    pub index: u32,
    pub value: u32,
}

impl Observation {
    pub fn new(index: u32, value: u32) -> Self {
        Observation { index, value }
    }
}

impl From<oracle::Reveal> for Observation {
    fn from(reveal: oracle::Reveal) -> Self {
        Observation::new(reveal.index, reveal.value)
    }
}

/// A non-empty set of observations ordered by index.
///
/// Identical duplicates collapse. Contradicting observations for the same
/// index are kept, so that no seed can ever satisfy the set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    pub fn new<I: IntoIterator<Item = Observation>>(observations: I) -> Result<Self, Error> {
        let mut observations: Vec<Observation> = observations.into_iter().collect();
        if observations.is_empty() {
            return Err(CrackError::NoObservations.into());
        }
        observations.sort();
        observations.dedup();
        Ok(ObservationSet { observations })
    }

    pub fn iter(&self) -> std::slice::Iter<Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn max_index(&self) -> u32 {
        // non-empty and sorted
        self.observations[self.observations.len() - 1].index
    }
}

impl<'a> IntoIterator for &'a ObservationSet {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

pub const SEED_SPACE: u64 = 1 << 32;

/// Half-open interval `[lo, hi)` of candidate seeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchRange {
    lo: u64,
    hi: u64,
}

impl SearchRange {
    pub fn new(lo: u64, hi: u64) -> Result<Self, Error> {
        if lo >= hi || hi > SEED_SPACE {
            return Err(CrackError::InvalidRange { lo, hi }.into());
        }
        Ok(SearchRange { lo, hi })
    }

    /// For bounds known to be valid, like the built-in defaults.
    pub(crate) fn fixed(lo: u64, hi: u64) -> Self {
        assert!(lo < hi && hi <= SEED_SPACE, "invalid fixed range [{}, {})", lo, hi);
        SearchRange { lo, hi }
    }

    pub fn full() -> Self {
        SearchRange {
            lo: 0,
            hi: SEED_SPACE,
        }
    }

    /// Seeds within `before` seconds before and `after` seconds after `now`,
    /// for generators seeded with a Unix timestamp.
    pub fn around(now: u64, before: u64, after: u64) -> Result<Self, Error> {
        let lo = now.saturating_sub(before);
        let hi = now.saturating_add(after).saturating_add(1).min(SEED_SPACE);
        SearchRange::new(lo, hi)
    }

    pub fn lo(&self) -> u64 {
        self.lo
    }

    pub fn hi(&self) -> u64 {
        self.hi
    }

    pub fn len(&self) -> u64 {
        self.hi - self.lo
    }

    pub fn contains(&self, seed: u32) -> bool {
        let seed = u64::from(seed);
        self.lo <= seed && seed < self.hi
    }

    /// Candidate seeds in ascending order.
    pub fn seeds(&self) -> impl Iterator<Item = u32> {
        (self.lo..self.hi).map(|seed| seed as u32)
    }

    /// Splits the range into disjoint contiguous chunks of at most
    /// `chunk_size` seeds, lowest first.
    pub fn chunks(&self, chunk_size: u64) -> Vec<SearchRange> {
        let chunk_size = chunk_size.max(1);
        let mut chunks = Vec::new();
        let mut lo = self.lo;
        while lo < self.hi {
            let hi = lo.saturating_add(chunk_size).min(self.hi);
            chunks.push(SearchRange { lo, hi });
            lo = hi;
        }
        chunks
    }
}

impl fmt::Display for SearchRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.lo, self.hi)
    }
}

impl std::str::FromStr for SearchRange {
    type Err = Error;

    /// Parses `lo..hi`.
    fn from_str(s: &str) -> Result<Self, Error> {
        let mut parts = s.splitn(2, "..");
        let lo = parts.next().unwrap_or("").trim();
        let hi = parts
            .next()
            .ok_or_else(|| format_err!("expected a range of the form lo..hi, got {:?}", s))?
            .trim();
        SearchRange::new(parse_bound(lo)?, parse_bound(hi)?)
    }
}

fn parse_bound(s: &str) -> Result<u64, Error> {
    let digits: String = s.chars().filter(|&c| c != '_').collect();
    if let Some(exponent) = digits.strip_prefix("2^") {
        let exponent: u32 = exponent.parse()?;
        ensure!(exponent <= 32, "range bound 2^{} is out of the seed space", exponent);
        return Ok(1 << exponent);
    }
    Ok(digits.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observations_are_sorted_and_deduplicated() {
        let set = ObservationSet::new(vec![
            Observation::new(5, 1),
            Observation::new(0, 2),
            Observation::new(5, 1),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next(), Some(&Observation::new(0, 2)));
        assert_eq!(set.max_index(), 5);
    }

    #[test]
    fn contradicting_observations_are_kept() {
        let set = ObservationSet::new(vec![Observation::new(3, 1), Observation::new(3, 2)]).unwrap();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn empty_observation_set_is_rejected() {
        let err = ObservationSet::new(Vec::new()).unwrap_err();
        match err.downcast_ref::<CrackError>() {
            Some(CrackError::NoObservations) => {}
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn range_invariants() {
        assert!(SearchRange::new(5, 5).is_err());
        assert!(SearchRange::new(6, 5).is_err());
        assert!(SearchRange::new(0, SEED_SPACE + 1).is_err());
        let full = SearchRange::full();
        assert_eq!(full.len(), SEED_SPACE);
        assert!(full.contains(u32::max_value()));
        assert_eq!(full.seeds().last(), Some(u32::max_value()));
    }

    #[test]
    fn chunks_cover_the_range() {
        let range = SearchRange::new(10, 35).unwrap();
        let chunks = range.chunks(10);
        assert_eq!(
            chunks,
            vec![
                SearchRange::new(10, 20).unwrap(),
                SearchRange::new(20, 30).unwrap(),
                SearchRange::new(30, 35).unwrap(),
            ]
        );
    }

    #[test]
    fn parses_ranges() {
        assert_eq!("0..2_000_000".parse::<SearchRange>().unwrap(), SearchRange::new(0, 2_000_000).unwrap());
        assert_eq!("50000000..2^31".parse::<SearchRange>().unwrap(), SearchRange::new(50_000_000, 1 << 31).unwrap());
        assert_eq!("0..2^32".parse::<SearchRange>().unwrap(), SearchRange::full());
        assert!("7".parse::<SearchRange>().is_err());
        assert!("9..3".parse::<SearchRange>().is_err());
    }

    #[test]
    fn time_window_is_clamped() {
        let window = SearchRange::around(100, 3600, 3600).unwrap();
        assert_eq!(window, SearchRange::new(0, 3701).unwrap());
    }
}
