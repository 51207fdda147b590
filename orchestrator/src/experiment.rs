use log::{info, warn};
use tokio::time::Instant;

use crate::{
    ExperimentConfig, OrchestratorError,
    aggregate::aggregate,
    export::ExperimentReport,
    failure::FailureInjector,
    metrics::MetricsCollector,
    round::execute_round,
    timing::TimeoutEstimator,
    trainer::TrainerClient,
};

/// The evaluation capability: held-out loss and accuracy for a parameter
/// snapshot. Infallible; the round loop never aborts on evaluation.
pub trait Evaluator: Send {
    fn evaluate(&mut self, params: &[f32]) -> (f64, f64);
}

/// Experiment lifecycle. Rounds only ever move it forward; no failure path
/// exists between `Running` and `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
}

/// Drives the round loop: snapshot, fan-out, aggregate, evaluate, record.
/// Owns the global parameters exclusively; workers only ever see frozen
/// per-round snapshots.
pub struct Experiment<C, E> {
    cfg: ExperimentConfig,
    clients: Vec<C>,
    evaluator: E,
    estimator: TimeoutEstimator,
    injector: FailureInjector,
    collector: MetricsCollector,
    params: Vec<f32>,
    state: RunState,
}

impl<C: TrainerClient, E: Evaluator> Experiment<C, E> {
    /// Validates the configured scenario against the worker fleet and sets
    /// up the per-worker timing and failure state.
    ///
    /// # Errors
    /// Returns `InvalidScenario` before any round runs; this is the only
    /// fatal misconfiguration.
    pub fn new(
        cfg: ExperimentConfig,
        clients: Vec<C>,
        evaluator: E,
        initial_params: Vec<f32>,
    ) -> Result<Self, OrchestratorError> {
        if let Some(scenario) = &cfg.scenario {
            scenario.validate(clients.len())?;
        }

        let estimator = TimeoutEstimator::new(clients.len(), cfg.timing);
        let injector = FailureInjector::new(clients.len(), cfg.injection, cfg.seed);
        let collector = MetricsCollector::new(cfg.scoring);

        Ok(Self {
            cfg,
            clients,
            evaluator,
            estimator,
            injector,
            collector,
            params: initial_params,
            state: RunState::NotStarted,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn global_params(&self) -> &[f32] {
        &self.params
    }

    /// Runs the configured number of rounds to completion. A round with
    /// zero responders still completes and advances; convergence is only
    /// measured, never acted upon.
    pub async fn run(&mut self) -> Result<ExperimentReport, OrchestratorError> {
        if self.state != RunState::NotStarted {
            return Err(OrchestratorError::AlreadyRan);
        }
        self.state = RunState::Running;

        let scenario_name = self.cfg.scenario.as_ref().map(|s| s.name.clone());
        if let Some(scenario) = self.cfg.scenario.clone() {
            self.injector.start_scenario(scenario);
        }

        let rounds = self.cfg.rounds.get() as u64;
        for round in 1..=rounds {
            info!("round {round}/{rounds}");

            let snapshot = self.params.clone();
            let results = execute_round(
                round,
                &snapshot,
                &mut self.clients,
                &mut self.injector,
                &mut self.estimator,
            )
            .await;

            let aggregation_started = Instant::now();
            if results.updates.is_empty() {
                warn!("no worker responded, keeping previous parameters");
            }
            self.params = aggregate(&self.params, &results.updates);
            let (loss, accuracy) = self.evaluator.evaluate(&self.params);
            let aggregation_duration = aggregation_started.elapsed().as_secs_f64();

            self.collector.record(
                round,
                scenario_name.clone(),
                self.clients.len(),
                &results,
                loss,
                accuracy,
                aggregation_duration,
            );

            info!(
                responding = results.updates.len(),
                failed = results.failed_workers.len(),
                slow = results.slow_workers.len(),
                timeouts = results.timeout_count;
                "round {round} done: loss {loss:.4}, accuracy {accuracy:.4}"
            );

            let status = self.injector.status();
            if let Some(name) = &status.active_scenario {
                info!(
                    failed = status.failed_workers,
                    slow = status.slow_workers,
                    available = status.available_workers;
                    "scenario '{name}' active, {} round(s) remaining",
                    status.remaining_rounds
                );
            }

            self.injector.advance_round();
        }

        self.state = RunState::Completed;
        info!("experiment completed after {rounds} round(s)");

        Ok(ExperimentReport {
            experiment_name: self.cfg.experiment_name.clone(),
            summary: self.collector.summary(),
            rounds: self.collector.rounds().to_vec(),
        })
    }
}
