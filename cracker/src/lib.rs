//! Recovers the seed of an MT19937 generator from a few of its outputs and
//! predicts the draws it has not shown yet.

#[macro_use]
extern crate failure;

pub mod config;
pub mod errors;
pub mod observation;
pub mod parallel;
pub mod pipeline;
pub mod predict;
pub mod scenarios;
pub mod search;
pub mod verify;

pub use config::CrackConfig;
pub use observation::{Observation, ObservationSet, SearchRange};
pub use pipeline::{Cracker, GameSession, ObservationSource, PredictionSink};
pub use predict::{predict_at, PredictionResult};
pub use search::{SeedOutcome, StopSignal, Strategy, TwistModel};
pub use verify::verify;
