pub mod aggregate;
pub mod config;
pub mod error;
mod experiment;
pub mod export;
pub mod failure;
pub mod metrics;
mod round;
pub mod timing;
pub mod trainer;

pub use config::ExperimentConfig;
pub use error::OrchestratorError;
pub use experiment::{Evaluator, Experiment, RunState};
pub use export::ExperimentReport;
pub use round::RoundCallResults;
