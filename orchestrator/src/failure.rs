use std::{collections::BTreeSet, fmt, time::Duration};

use log::{debug, info};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::OrchestratorError;

/// The failure modes a scenario can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Worker becomes completely unavailable and stays marked failed.
    TotalFailure,
    /// The request times out; transient, re-drawn every round.
    NetworkTimeout,
    /// Worker stays marked slow and answers with extra latency.
    SlowResponse,
    /// Temporary service error; transient, re-drawn every round.
    ServiceUnavailable,
    /// Secondary draw decides between total loss and slowness.
    PartialFailure,
}

/// One injectable failure scenario, immutable for its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureScenario {
    pub name: String,
    pub description: String,
    pub kind: FailureKind,
    pub affected_workers: BTreeSet<usize>,
    pub failure_probability: f64,
    pub duration_rounds: u64,
    #[serde(default = "default_recovery_probability")]
    pub recovery_probability: f64,
}

fn default_recovery_probability() -> f64 {
    0.1
}

impl FailureScenario {
    /// Range checks performed before the round loop starts; a scenario
    /// rejected here is the only fatal error class of an experiment.
    pub fn validate(&self, num_workers: usize) -> Result<(), OrchestratorError> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(OrchestratorError::InvalidScenario(format!(
                "failure_probability {} outside [0, 1]",
                self.failure_probability
            )));
        }

        if !(0.0..=1.0).contains(&self.recovery_probability) {
            return Err(OrchestratorError::InvalidScenario(format!(
                "recovery_probability {} outside [0, 1]",
                self.recovery_probability
            )));
        }

        if let Some(&worker) = self.affected_workers.iter().find(|&&w| w >= num_workers) {
            return Err(OrchestratorError::InvalidScenario(format!(
                "affected worker {worker} out of range for {num_workers} worker(s)"
            )));
        }

        Ok(())
    }
}

/// Injected health mark for one worker. `Failed` and `Slow` persist across
/// rounds until a recovery draw or scenario expiry clears them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerHealth {
    #[default]
    Healthy,
    Failed,
    Slow,
}

/// Why a worker is failing this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Unavailable,
    Timeout,
    Slow,
    ServiceError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unavailable => "completely unavailable",
            Self::Timeout => "request will time out",
            Self::Slow => "will respond slowly",
            Self::ServiceError => "temporary service error",
        };
        f.write_str(text)
    }
}

/// Verdict for one worker for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    Healthy,
    Failing(FailureReason),
}

/// Secondary knobs of the injector. The 70/30 partial-failure split and the
/// 10-30s slow window are tuned values carried over as defaults.
#[derive(Debug, Clone, Copy)]
pub struct InjectionConfig {
    /// Probability that a partial failure is a total loss rather than slowness.
    pub partial_total_bias: f64,
    pub slow_delay_min: Duration,
    pub slow_delay_max: Duration,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            partial_total_bias: 0.7,
            slow_delay_min: Duration::from_secs(10),
            slow_delay_max: Duration::from_secs(30),
        }
    }
}

/// Current injector state, for per-round reporting.
#[derive(Debug, Clone)]
pub struct InjectorStatus {
    pub active_scenario: Option<String>,
    pub remaining_rounds: u64,
    pub failed_workers: usize,
    pub slow_workers: usize,
    pub available_workers: usize,
    pub total_workers: usize,
}

/// Decides, once per worker per round, whether that worker fails and how.
///
/// All randomness flows through one seedable source so scenario outcomes
/// are reproducible run to run.
pub struct FailureInjector {
    cfg: InjectionConfig,
    rng: StdRng,
    scenario: Option<FailureScenario>,
    remaining_rounds: u64,
    health: Vec<WorkerHealth>,
}

impl FailureInjector {
    pub fn new(num_workers: usize, cfg: InjectionConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            cfg,
            rng,
            scenario: None,
            remaining_rounds: 0,
            health: vec![WorkerHealth::Healthy; num_workers],
        }
    }

    /// Arms `scenario` for its configured number of rounds.
    pub fn start_scenario(&mut self, scenario: FailureScenario) {
        info!(
            "starting failure scenario '{}' for {} round(s): {}",
            scenario.name, scenario.duration_rounds, scenario.description
        );
        self.remaining_rounds = scenario.duration_rounds;
        self.scenario = Some(scenario);
    }

    /// Draws this round's verdict for `worker` and updates its health mark.
    pub fn decide(&mut self, worker: usize) -> FailureDecision {
        let (kind, failure_probability, recovery_probability) = match &self.scenario {
            Some(s) if self.remaining_rounds > 0 && s.affected_workers.contains(&worker) => {
                (s.kind, s.failure_probability, s.recovery_probability)
            }
            _ => return FailureDecision::Healthy,
        };

        match self.health[worker] {
            WorkerHealth::Healthy => {
                if self.rng.random::<f64>() < failure_probability {
                    let split_to_failed = self.rng.random::<f64>() < self.cfg.partial_total_bias;
                    let (mark, reason) = onset(kind, split_to_failed);
                    self.health[worker] = mark;
                    FailureDecision::Failing(reason)
                } else {
                    FailureDecision::Healthy
                }
            }

            mark => {
                if self.rng.random::<f64>() < recovery_probability {
                    debug!(worker = worker; "recovered from injected failure");
                    self.health[worker] = WorkerHealth::Healthy;
                    FailureDecision::Healthy
                } else {
                    FailureDecision::Failing(match mark {
                        WorkerHealth::Slow => FailureReason::Slow,
                        _ => FailureReason::Unavailable,
                    })
                }
            }
        }
    }

    /// Extra latency for a slow-marked worker; additive only, the call
    /// itself still runs and may succeed.
    pub fn slow_delay(&mut self, worker: usize) -> Duration {
        if self.health[worker] != WorkerHealth::Slow {
            return Duration::ZERO;
        }

        let min = self.cfg.slow_delay_min.as_secs_f64();
        let max = self.cfg.slow_delay_max.as_secs_f64();
        Duration::from_secs_f64(self.rng.random_range(min..=max))
    }

    /// Consumes one round of the active scenario. At expiry the scenario is
    /// dropped and every worker mark clears.
    pub fn advance_round(&mut self) {
        if self.remaining_rounds > 0 {
            self.remaining_rounds -= 1;
        }

        if self.remaining_rounds == 0 {
            if let Some(scenario) = self.scenario.take() {
                info!("failure scenario '{}' concluded", scenario.name);
                self.health.fill(WorkerHealth::Healthy);
            }
        }
    }

    pub fn health(&self, worker: usize) -> WorkerHealth {
        self.health[worker]
    }

    pub fn status(&self) -> InjectorStatus {
        let failed = self
            .health
            .iter()
            .filter(|h| **h == WorkerHealth::Failed)
            .count();
        let slow = self
            .health
            .iter()
            .filter(|h| **h == WorkerHealth::Slow)
            .count();

        InjectorStatus {
            active_scenario: self.scenario.as_ref().map(|s| s.name.clone()),
            remaining_rounds: self.remaining_rounds,
            failed_workers: failed,
            slow_workers: slow,
            available_workers: self.health.len() - failed,
            total_workers: self.health.len(),
        }
    }
}

/// Kind-specific effect of a fresh failure draw.
fn onset(kind: FailureKind, split_to_failed: bool) -> (WorkerHealth, FailureReason) {
    match kind {
        FailureKind::TotalFailure => (WorkerHealth::Failed, FailureReason::Unavailable),
        FailureKind::NetworkTimeout => (WorkerHealth::Healthy, FailureReason::Timeout),
        FailureKind::SlowResponse => (WorkerHealth::Slow, FailureReason::Slow),
        FailureKind::ServiceUnavailable => (WorkerHealth::Healthy, FailureReason::ServiceError),
        FailureKind::PartialFailure if split_to_failed => {
            (WorkerHealth::Failed, FailureReason::Unavailable)
        }
        FailureKind::PartialFailure => (WorkerHealth::Slow, FailureReason::Slow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(kind: FailureKind, affected: &[usize]) -> FailureScenario {
        FailureScenario {
            name: "test".to_string(),
            description: "test scenario".to_string(),
            kind,
            affected_workers: affected.iter().copied().collect(),
            failure_probability: 1.0,
            duration_rounds: 3,
            recovery_probability: 0.0,
        }
    }

    fn injector(num_workers: usize) -> FailureInjector {
        FailureInjector::new(num_workers, InjectionConfig::default(), Some(42))
    }

    #[test]
    fn idle_injector_reports_everyone_healthy() {
        let mut inj = injector(3);
        for worker in 0..3 {
            assert_eq!(inj.decide(worker), FailureDecision::Healthy);
            assert_eq!(inj.slow_delay(worker), Duration::ZERO);
        }
    }

    #[test]
    fn total_failure_persists_for_exactly_the_scenario_duration() {
        let mut inj = injector(3);
        inj.start_scenario(scenario(FailureKind::TotalFailure, &[0]));

        for round in 1..=5u64 {
            let decision = inj.decide(0);
            if round <= 3 {
                assert_eq!(
                    decision,
                    FailureDecision::Failing(FailureReason::Unavailable),
                    "round {round}"
                );
            } else {
                assert_eq!(decision, FailureDecision::Healthy, "round {round}");
            }

            // Unaffected workers never fail.
            assert_eq!(inj.decide(1), FailureDecision::Healthy);
            assert_eq!(inj.decide(2), FailureDecision::Healthy);

            inj.advance_round();
        }

        assert_eq!(inj.health(0), WorkerHealth::Healthy);
        assert!(inj.status().active_scenario.is_none());
    }

    #[test]
    fn certain_recovery_heals_on_the_very_next_round() {
        let mut inj = injector(1);
        let mut s = scenario(FailureKind::TotalFailure, &[0]);
        s.recovery_probability = 1.0;
        s.duration_rounds = 10;
        inj.start_scenario(s);

        assert_eq!(
            inj.decide(0),
            FailureDecision::Failing(FailureReason::Unavailable)
        );
        inj.advance_round();

        assert_eq!(inj.decide(0), FailureDecision::Healthy);
        assert_eq!(inj.health(0), WorkerHealth::Healthy);
    }

    #[test]
    fn network_timeout_is_transient() {
        let mut inj = injector(1);
        inj.start_scenario(scenario(FailureKind::NetworkTimeout, &[0]));

        assert_eq!(
            inj.decide(0),
            FailureDecision::Failing(FailureReason::Timeout)
        );
        // No persistent mark: the worker is not "in failure" next round,
        // it simply draws again.
        assert_eq!(inj.health(0), WorkerHealth::Healthy);
    }

    #[test]
    fn slow_response_marks_and_delays() {
        let mut inj = injector(1);
        inj.start_scenario(scenario(FailureKind::SlowResponse, &[0]));

        assert_eq!(inj.decide(0), FailureDecision::Failing(FailureReason::Slow));
        assert_eq!(inj.health(0), WorkerHealth::Slow);

        let delay = inj.slow_delay(0);
        assert!(delay >= Duration::from_secs(10));
        assert!(delay <= Duration::from_secs(30));
    }

    #[test]
    fn partial_failure_splits_between_failed_and_slow() {
        let mut inj = injector(32);
        let mut s = scenario(FailureKind::PartialFailure, &[]);
        s.affected_workers = (0..32).collect();
        inj.start_scenario(s);

        let mut failed = 0;
        let mut slow = 0;
        for worker in 0..32 {
            match inj.decide(worker) {
                FailureDecision::Failing(FailureReason::Unavailable) => failed += 1,
                FailureDecision::Failing(FailureReason::Slow) => slow += 1,
                other => panic!("unexpected decision: {other:?}"),
            }
        }

        assert!(failed > 0, "no worker drew the total-loss branch");
        assert!(slow > 0, "no worker drew the slow branch");
        assert!(failed > slow, "70/30 bias should favor total loss");
    }

    #[test]
    fn zero_duration_scenario_never_fires() {
        let mut inj = injector(1);
        let mut s = scenario(FailureKind::TotalFailure, &[0]);
        s.duration_rounds = 0;
        inj.start_scenario(s);

        assert_eq!(inj.decide(0), FailureDecision::Healthy);
    }

    #[test]
    fn zero_probability_scenario_never_fires() {
        let mut inj = injector(1);
        let mut s = scenario(FailureKind::TotalFailure, &[0]);
        s.failure_probability = 0.0;
        inj.start_scenario(s);

        for _ in 0..10 {
            assert_eq!(inj.decide(0), FailureDecision::Healthy);
            inj.advance_round();
        }
    }

    #[test]
    fn expiry_clears_all_marks() {
        let mut inj = injector(2);
        let mut s = scenario(FailureKind::TotalFailure, &[0, 1]);
        s.duration_rounds = 1;
        inj.start_scenario(s);

        inj.decide(0);
        inj.decide(1);
        assert_eq!(inj.status().failed_workers, 2);
        assert_eq!(inj.status().available_workers, 0);

        inj.advance_round();
        assert_eq!(inj.status().failed_workers, 0);
        assert_eq!(inj.status().available_workers, 2);
        assert!(inj.status().active_scenario.is_none());
    }

    #[test]
    fn validate_rejects_out_of_range_probability() {
        let mut s = scenario(FailureKind::TotalFailure, &[0]);
        s.failure_probability = 1.5;
        assert!(s.validate(3).is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_worker() {
        let s = scenario(FailureKind::TotalFailure, &[5]);
        assert!(s.validate(3).is_err());
    }

    #[test]
    fn validate_accepts_a_well_formed_scenario() {
        let s = scenario(FailureKind::TotalFailure, &[0, 2]);
        assert!(s.validate(3).is_ok());
    }

    #[test]
    fn same_seed_reproduces_the_same_outcomes() {
        let run = |seed| {
            let mut inj = FailureInjector::new(4, InjectionConfig::default(), Some(seed));
            let mut s = scenario(FailureKind::PartialFailure, &[0, 1, 2, 3]);
            s.failure_probability = 0.5;
            s.recovery_probability = 0.5;
            s.duration_rounds = 6;
            inj.start_scenario(s);

            let mut outcomes = Vec::new();
            for _ in 0..6 {
                for worker in 0..4 {
                    outcomes.push(inj.decide(worker));
                }
                inj.advance_round();
            }
            outcomes
        };

        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }
}
