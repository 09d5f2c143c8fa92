use mersenne::GeneratorState;

use crate::observation::ObservationSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mismatch {
    pub index: u32,
    pub expected: u32,
    pub found: u32,
}

/// Replays the generator from `seed` and reports the first observation it
/// contradicts. Draws stop at the first mismatch.
pub fn first_mismatch(seed: u32, observations: &ObservationSet) -> Option<Mismatch> {
    let mut state = GeneratorState::new(seed);
    let mut drawn = 0u64;
    let mut last: Option<(u32, u32)> = None;
    for observation in observations {
        let found = match last {
            // same index observed twice, compare against the draw we already made
            Some((index, value)) if index == observation.index => value,
            _ => {
                state.advance(u64::from(observation.index) - drawn);
                drawn = u64::from(observation.index) + 1;
                state.next_u32()
            }
        };
        if found != observation.value {
            return Some(Mismatch {
                index: observation.index,
                expected: observation.value,
                found,
            });
        }
        last = Some((observation.index, found));
    }
    None
}

pub fn verify(seed: u32, observations: &ObservationSet) -> bool {
    first_mismatch(seed, observations).is_none()
}
