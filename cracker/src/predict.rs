use mersenne::GeneratorState;

use crate::errors::*;
use crate::observation::ObservationSet;
use crate::verify::first_mismatch;

/// The tempered output of draw `target_index` for a generator seeded with
/// `seed`. All earlier draws are discarded.
pub fn predict_at(seed: u32, target_index: u32) -> u32 {
    let mut state = GeneratorState::new(seed);
    state.advance(u64::from(target_index));
    state.next_u32()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PredictionResult {
    pub seed: u32,
    pub target_index: u32,
    pub value: u32,
}

/// Re-checks `seed` against every observation through the prediction path
/// and fails with `VerificationFailed` on the first disagreement.
pub fn confirm(seed: u32, observations: &ObservationSet) -> Result<(), Error> {
    for observation in observations {
        let predicted = predict_at(seed, observation.index);
        if predicted != observation.value {
            return Err(CrackError::VerificationFailed {
                seed,
                index: observation.index,
                expected: observation.value,
                found: predicted,
            }
            .into());
        }
    }
    // the replay path has to agree as well
    if let Some(mismatch) = first_mismatch(seed, observations) {
        return Err(CrackError::VerificationFailed {
            seed,
            index: mismatch.index,
            expected: mismatch.expected,
            found: mismatch.found,
        }
        .into());
    }
    Ok(())
}

/// Builds a prediction for a seed that passed `confirm`.
pub fn predict(
    seed: u32,
    observations: &ObservationSet,
    target_index: u32,
) -> Result<PredictionResult, Error> {
    confirm(seed, observations)?;
    Ok(PredictionResult {
        seed,
        target_index,
        value: predict_at(seed, target_index),
    })
}
