//! From observations to a confirmed prediction.

use oracle::{Communicate, GameClient};

use crate::config::CrackConfig;
use crate::errors::*;
use crate::observation::{Observation, ObservationSet};
use crate::predict::{predict, PredictionResult};
use crate::search::{Halt, SeedOutcome, StopSignal};

pub trait ObservationSource {
    fn observations(&mut self) -> Result<ObservationSet, Error>;
}

pub trait PredictionSink {
    /// Hands over the prediction and returns whatever the sink answered.
    fn submit(&mut self, prediction: &PredictionResult) -> Result<String, Error>;
}

impl ObservationSource for ObservationSet {
    fn observations(&mut self) -> Result<ObservationSet, Error> {
        Ok(self.clone())
    }
}

/// One round of the game: the chosen indices are revealed, the guess is the
/// prediction.
pub struct GameSession<T: Communicate> {
    client: GameClient<T>,
    indices: [u32; 2],
}

impl<T: Communicate> GameSession<T> {
    pub fn new(client: GameClient<T>, indices: [u32; 2]) -> Self {
        GameSession { client, indices }
    }
}

impl<T: Communicate> ObservationSource for GameSession<T> {
    fn observations(&mut self) -> Result<ObservationSet, Error> {
        let reveals = self.client.reveal(self.indices)?;
        ObservationSet::new(reveals.into_iter().map(Observation::from))
    }
}

impl<T: Communicate> PredictionSink for GameSession<T> {
    fn submit(&mut self, prediction: &PredictionResult) -> Result<String, Error> {
        tracing::info!(value = prediction.value, index = prediction.target_index, "submitting guess");
        self.client.guess(prediction.value)
    }
}

pub struct Cracker {
    config: CrackConfig,
    stop: StopSignal,
}

impl Cracker {
    pub fn new(config: CrackConfig) -> Result<Cracker, Error> {
        config.validate()?;
        Ok(Cracker {
            config,
            stop: StopSignal::new(),
        })
    }

    /// Cancelling this signal stops a running search from another thread.
    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Runs the configured strategy over each range of the schedule until one
    /// of them yields a seed. The timeout covers the whole schedule.
    pub fn recover_seed(&self, observations: &ObservationSet) -> Result<u32, Error> {
        let stop = self.stop.rearm(self.config.timeout);
        let strategy = self.config.strategy;
        let mut proven_absent = true;
        for &range in &self.config.ranges {
            tracing::info!(strategy = strategy.name(), %range, "searching");
            match strategy.solve(observations, range, &stop)? {
                SeedOutcome::Found(seed) => {
                    tracing::info!(seed, "recovered seed");
                    return Ok(seed);
                }
                SeedOutcome::Unsatisfiable => {
                    tracing::debug!(%range, "no seed in range");
                }
                SeedOutcome::NotFound => {
                    proven_absent = false;
                    if stop.poll() == Some(Halt::TimedOut) {
                        tracing::warn!("search timed out");
                        break;
                    }
                }
                SeedOutcome::Cancelled => return Err(CrackError::Cancelled.into()),
                SeedOutcome::UnsupportedIndex(index) => {
                    return Err(CrackError::UnsupportedIndex { index }.into())
                }
            }
        }
        if proven_absent {
            Err(CrackError::Unsatisfiable.into())
        } else {
            Err(CrackError::NotFound.into())
        }
    }

    /// Recovers the seed, confirms it against every observation and predicts
    /// the configured target draw.
    pub fn crack(&self, observations: &ObservationSet) -> Result<PredictionResult, Error> {
        let seed = self.recover_seed(observations)?;
        predict(seed, observations, self.config.target_index)
    }

    /// Nothing reaches `sink` unless the prediction was confirmed.
    pub fn run<S, K>(&self, source: &mut S, sink: &mut K) -> Result<(PredictionResult, String), Error>
    where
        S: ObservationSource,
        K: PredictionSink,
    {
        let observations = source.observations()?;
        tracing::info!(observations = observations.len(), "received observations");
        let prediction = self.crack(&observations)?;
        let response = sink.submit(&prediction)?;
        Ok((prediction, response))
    }
}

/// Plays one round of the game on `session`, which is both source and sink.
pub fn run_game<T: Communicate>(
    cracker: &Cracker,
    session: &mut GameSession<T>,
) -> Result<(PredictionResult, String), Error> {
    let observations = session.observations()?;
    let prediction = cracker.crack(&observations)?;
    let response = session.submit(&prediction)?;
    Ok((prediction, response))
}
