//! Seed recovery by solving the encoded draw equations.
//!
//! Each observation is untempered into an equation `word_term(seed) == word`.
//! Layers that are bijections on 32-bit words are then peeled off by applying
//! their inverse to the right-hand side. An equation that reduces to `seed == c`
//! pins the seed outright; whatever is left is decided by evaluating the
//! residual equations over the bounded seed domain.

use mersenne::{inv_lsa, inv_rs, mul_inverse, untemper, STATE_SIZE};

use crate::observation::{ObservationSet, SearchRange};
use crate::search::symbolic::{encode_words, Formula, Program, Term, TermId};
use crate::search::{SeedOutcome, StopSignal, TwistModel};

/// Candidates between two stop-signal polls during bounded evaluation.
const POLL_INTERVAL: u64 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Equation {
    pub term: TermId,
    pub value: u32,
}

pub fn solve(
    observations: &ObservationSet,
    range: SearchRange,
    model: TwistModel,
    stop: &StopSignal,
) -> SeedOutcome {
    if let Some(unsupported) = observations
        .iter()
        .find(|o| o.index as usize >= STATE_SIZE)
    {
        tracing::warn!(index = unsupported.index, "index beyond the first twisted block");
        return SeedOutcome::UnsupportedIndex(unsupported.index);
    }

    let mut formula = Formula::new();
    let indices: Vec<u32> = observations.iter().map(|o| o.index).collect();
    let words = encode_words(&mut formula, &indices, model);
    let equations: Vec<Equation> = words
        .iter()
        .zip(observations)
        .map(|(&term, o)| {
            isolate(
                &formula,
                Equation {
                    term,
                    value: untemper(o.value),
                },
            )
        })
        .collect();
    tracing::info!(%range, ?model, terms = formula.len(), "solving draw equations");

    let mut residual = Vec::with_capacity(equations.len());
    let mut pinned = None;
    for equation in equations {
        match formula.term(equation.term) {
            Term::Const(c) if c != equation.value => return SeedOutcome::Unsatisfiable,
            Term::Const(_) => {}
            Term::Seed => match pinned {
                Some(seed) if seed != equation.value => return SeedOutcome::Unsatisfiable,
                _ => pinned = Some(equation.value),
            },
            _ => residual.push(equation),
        }
    }

    let roots: Vec<TermId> = residual.iter().map(|e| e.term).collect();
    let expected: Vec<u32> = residual.iter().map(|e| e.value).collect();
    let program = Program::compile(&formula, &roots);
    let mut scratch = Vec::with_capacity(program.len());

    if let Some(seed) = pinned {
        tracing::debug!(seed, "equations pin the seed");
        if range.contains(seed) && program.satisfies(seed, &expected, &mut scratch) {
            return SeedOutcome::Found(seed);
        }
        return SeedOutcome::Unsatisfiable;
    }

    tracing::debug!(
        equations = residual.len(),
        ops = program.len(),
        "no equation isolates the seed, evaluating over the range"
    );
    for (checked, seed) in range.seeds().enumerate() {
        if checked as u64 % POLL_INTERVAL == 0 {
            if let Some(halt) = stop.poll() {
                return halt.outcome();
            }
        }
        if program.satisfies(seed, &expected, &mut scratch) {
            return SeedOutcome::Found(seed);
        }
    }
    SeedOutcome::Unsatisfiable
}

/// Rewrites `term == value` by inverting bijective outer layers of `term`.
pub fn isolate(formula: &Formula, mut equation: Equation) -> Equation {
    while let Some(next) = peel(formula, equation) {
        equation = next;
    }
    equation
}

fn peel(formula: &Formula, equation: Equation) -> Option<Equation> {
    let value = equation.value;
    let with = |term: TermId, value: u32| Some(Equation { term, value });
    let constant = |id: TermId| formula.as_const(id);

    match formula.term(equation.term) {
        Term::Xor(a, b) => {
            if let Some(k) = constant(b) {
                return with(a, value ^ k);
            }
            if let Some(k) = constant(a) {
                return with(b, value ^ k);
            }
            for &(x, other) in &[(a, b), (b, a)] {
                match formula.term(other) {
                    // x ^ (x >> s)
                    Term::Lshr(inner, s) if inner == x => return with(x, inv_rs(value, s)),
                    // x ^ ((x << s) & m)
                    Term::And(shifted, mask) => {
                        if let (Term::Shl(inner, s), Some(m)) =
                            (formula.term(shifted), constant(mask))
                        {
                            if inner == x {
                                return with(x, inv_lsa(value, s, m));
                            }
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        Term::Add(a, b) => match (constant(a), constant(b)) {
            (_, Some(k)) => with(a, value.wrapping_sub(k)),
            (Some(k), _) => with(b, value.wrapping_sub(k)),
            _ => None,
        },
        Term::Mul(a, b) => match (constant(a), constant(b)) {
            (_, Some(k)) if k % 2 == 1 => with(a, value.wrapping_mul(mul_inverse(k))),
            (Some(k), _) if k % 2 == 1 => with(b, value.wrapping_mul(mul_inverse(k))),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use crate::search::symbolic::encode_draws;
    use mersenne::GeneratorState;

    fn observe(seed: u32, indices: &[u32]) -> ObservationSet {
        let outputs: Vec<u32> = GeneratorState::new(seed).take(1300).collect();
        ObservationSet::new(
            indices
                .iter()
                .map(|&i| Observation::new(i, outputs[i as usize])),
        )
        .unwrap()
    }

    /// Observations as a generator that tempers before twisting would emit them.
    fn observe_pre_twist(seed: u32, indices: &[u32]) -> ObservationSet {
        let state = GeneratorState::new(seed);
        ObservationSet::new(indices.iter().map(|&i| {
            Observation::new(i, mersenne::temper(state.words()[i as usize]))
        }))
        .unwrap()
    }

    #[test]
    fn temper_is_fully_peeled() {
        let mut formula = Formula::new();
        let draws = encode_draws(&mut formula, &[0], TwistModel::PreTwist);
        let value = mersenne::temper(0x1234_5678);
        let equation = isolate(&formula, Equation { term: draws[0], value });
        assert_eq!(formula.term(equation.term), Term::Seed);
        assert_eq!(equation.value, 0x1234_5678);
    }

    #[test]
    fn peeling_a_tempered_draw_untempers_the_value() {
        let mut formula = Formula::new();
        let draws = encode_draws(&mut formula, &[0], TwistModel::FirstTwist);
        let words = encode_words(&mut formula, &[0], TwistModel::FirstTwist);
        let value = GeneratorState::new(2024).next_u32();
        let equation = isolate(&formula, Equation { term: draws[0], value });
        // the twisted word itself has no invertible outer layer
        assert_eq!(equation, Equation { term: words[0], value: untemper(value) });
        assert_eq!(formula.eval(words[0], 2024), untemper(value));
    }

    #[test]
    fn initialization_chain_is_peeled_back_to_the_seed() {
        let mut formula = Formula::new();
        let draws = encode_draws(&mut formula, &[400], TwistModel::PreTwist);
        let state = GeneratorState::new(987_654_321);
        let value = mersenne::temper(state.words()[400]);
        let equation = isolate(&formula, Equation { term: draws[0], value });
        assert_eq!(formula.term(equation.term), Term::Seed);
        assert_eq!(equation.value, 987_654_321);
    }

    #[test]
    fn pre_twist_model_pins_the_seed_over_the_full_range() {
        let observations = observe_pre_twist(3_000_000_000, &[5, 600]);
        assert_eq!(
            solve(&observations, SearchRange::full(), TwistModel::PreTwist, &StopSignal::new()),
            SeedOutcome::Found(3_000_000_000)
        );
    }

    #[test]
    fn pinned_seed_outside_range_is_unsatisfiable() {
        let observations = observe_pre_twist(10, &[0]);
        let range = SearchRange::new(11, 1 << 32).unwrap();
        assert_eq!(
            solve(&observations, range, TwistModel::PreTwist, &StopSignal::new()),
            SeedOutcome::Unsatisfiable
        );
    }

    #[test]
    fn inconsistent_pre_twist_pair_is_unsatisfiable() {
        let mut observations: Vec<Observation> =
            observe_pre_twist(42, &[0, 1]).iter().cloned().collect();
        observations[1].value ^= 0x10;
        let observations = ObservationSet::new(observations).unwrap();
        assert_eq!(
            solve(&observations, SearchRange::full(), TwistModel::PreTwist, &StopSignal::new()),
            SeedOutcome::Unsatisfiable
        );
    }

    #[test]
    fn first_twist_model_recovers_the_seed() {
        let observations = observe(12345, &[0, 1]);
        let range = SearchRange::new(0, 20_000).unwrap();
        assert_eq!(
            solve(&observations, range, TwistModel::FirstTwist, &StopSignal::new()),
            SeedOutcome::Found(12345)
        );
    }

    #[test]
    fn first_twist_model_handles_late_indices() {
        let observations = observe(500, &[300, 623]);
        let range = SearchRange::new(0, 1000).unwrap();
        assert_eq!(
            solve(&observations, range, TwistModel::FirstTwist, &StopSignal::new()),
            SeedOutcome::Found(500)
        );
    }

    #[test]
    fn exhausted_bounded_domain_is_unsatisfiable() {
        let observations = observe(12345, &[0, 1]);
        let range = SearchRange::new(0, 5000).unwrap();
        assert_eq!(
            solve(&observations, range, TwistModel::FirstTwist, &StopSignal::new()),
            SeedOutcome::Unsatisfiable
        );
    }

    #[test]
    fn indices_past_the_first_block_are_unsupported() {
        let observations = observe(1, &[3, 624, 1000]);
        assert_eq!(
            solve(&observations, SearchRange::full(), TwistModel::FirstTwist, &StopSignal::new()),
            SeedOutcome::UnsupportedIndex(624)
        );
    }

    #[test]
    fn cancellation_stops_bounded_evaluation() {
        let observations = observe(12345, &[0]);
        let stop = StopSignal::new();
        stop.cancel();
        assert_eq!(
            solve(&observations, SearchRange::full(), TwistModel::FirstTwist, &stop),
            SeedOutcome::Cancelled
        );
    }
}
