use std::num::NonZeroUsize;

use crate::{
    failure::{FailureScenario, InjectionConfig},
    metrics::ScoringConfig,
    timing::TimingConfig,
};

/// Everything one experiment run needs up front. The nested configs carry
/// the tuned defaults; override them per experiment when comparing knobs.
#[derive(Debug)]
pub struct ExperimentConfig {
    pub experiment_name: String,
    pub rounds: NonZeroUsize,
    pub scenario: Option<FailureScenario>,
    /// Seed for every injected random draw; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub timing: TimingConfig,
    pub injection: InjectionConfig,
    pub scoring: ScoringConfig,
}

impl ExperimentConfig {
    pub fn new(rounds: NonZeroUsize) -> Self {
        Self {
            experiment_name: "fl_experiment".to_string(),
            rounds,
            scenario: None,
            seed: None,
            timing: TimingConfig::default(),
            injection: InjectionConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn with_scenario(mut self, scenario: FailureScenario) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
