use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::round::RoundCallResults;

/// Resilience-score weights and derived-metric thresholds. The 0.4/0.4/0.2
/// split and the 60s response normalizer are tuned values, kept as defaults.
#[derive(Debug, Clone, Copy)]
pub struct ScoringConfig {
    pub availability_weight: f64,
    pub accuracy_weight: f64,
    pub response_weight: f64,
    /// Response times are normalized against this many seconds.
    pub response_norm_secs: f64,
    /// Accuracy deltas below this count as converged.
    pub convergence_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            availability_weight: 0.4,
            accuracy_weight: 0.4,
            response_weight: 0.2,
            response_norm_secs: 60.0,
            convergence_threshold: 0.001,
        }
    }
}

/// Immutable record of one completed round. Field names are part of the
/// exported schema consumed by downstream analysis tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round_number: u64,
    pub scenario_name: Option<String>,
    pub total_workers: usize,
    pub responding_workers: usize,
    pub failed_workers: Vec<usize>,
    pub slow_workers: Vec<usize>,
    pub response_times: Vec<f64>,
    pub avg_response_time: f64,
    pub max_response_time: f64,
    pub min_response_time: f64,
    pub timeout_count: usize,
    pub global_loss: f64,
    pub global_accuracy: f64,
    /// Accuracy delta against the previous round; 0 on the first round.
    pub convergence_rate: f64,
    /// Seconds spent aggregating and re-evaluating the global model.
    pub aggregation_duration: f64,
    pub total_samples: u64,
    pub contributions: BTreeMap<usize, u64>,
}

impl RoundOutcome {
    fn had_failures(&self) -> bool {
        !self.failed_workers.is_empty() || !self.slow_workers.is_empty()
    }
}

/// Experiment-level aggregates, always derivable from the round log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub total_rounds: usize,
    pub average_accuracy: f64,
    pub final_accuracy: f64,
    pub convergence_round: Option<u64>,
    pub total_failures: u64,
    pub resilience_score: f64,
}

/// Append-only round log plus the derived resilience/convergence scores.
/// Never fails: degenerate inputs default their derived averages to 0.
pub struct MetricsCollector {
    cfg: ScoringConfig,
    rounds: Vec<RoundOutcome>,
}

impl MetricsCollector {
    pub fn new(cfg: ScoringConfig) -> Self {
        Self {
            cfg,
            rounds: Vec::new(),
        }
    }

    /// Appends one round to the log, deriving response-time statistics and
    /// the convergence rate from the log tail.
    pub fn record(
        &mut self,
        round_number: u64,
        scenario_name: Option<String>,
        total_workers: usize,
        results: &RoundCallResults,
        global_loss: f64,
        global_accuracy: f64,
        aggregation_duration: f64,
    ) {
        let times = &results.response_times;
        let (avg, min, max) = if times.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = times.iter().sum();
            let (lo, hi) = times.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
                (lo.min(t), hi.max(t))
            });
            (sum / times.len() as f64, lo, hi)
        };

        let convergence_rate = self
            .rounds
            .last()
            .map(|prev| global_accuracy - prev.global_accuracy)
            .unwrap_or(0.0);

        self.rounds.push(RoundOutcome {
            round_number,
            scenario_name,
            total_workers,
            responding_workers: results.updates.len(),
            failed_workers: results.failed_workers.clone(),
            slow_workers: results.slow_workers.clone(),
            response_times: times.clone(),
            avg_response_time: avg,
            max_response_time: max,
            min_response_time: min,
            timeout_count: results.timeout_count,
            global_loss,
            global_accuracy,
            convergence_rate,
            aggregation_duration,
            total_samples: results.contributions.values().sum(),
            contributions: results.contributions.clone(),
        });
    }

    pub fn rounds(&self) -> &[RoundOutcome] {
        &self.rounds
    }

    /// Mean, over failure-affected rounds only, of the weighted mix of
    /// availability, accuracy, and response factor. 1.0 (vacuously perfect)
    /// when no round had any injected or real failure.
    pub fn resilience_score(&self) -> f64 {
        let mut total = 0.0;
        let mut failure_rounds = 0usize;

        for round in &self.rounds {
            if !round.had_failures() {
                continue;
            }
            failure_rounds += 1;

            let availability = if round.total_workers == 0 {
                0.0
            } else {
                round.responding_workers as f64 / round.total_workers as f64
            };
            let response_factor =
                (1.0 - round.avg_response_time / self.cfg.response_norm_secs).max(0.0);

            total += self.cfg.availability_weight * availability
                + self.cfg.accuracy_weight * round.global_accuracy
                + self.cfg.response_weight * response_factor;
        }

        if failure_rounds == 0 {
            1.0
        } else {
            total / failure_rounds as f64
        }
    }

    /// First round (>= 2) whose accuracy delta fell below the threshold.
    pub fn convergence_round(&self) -> Option<u64> {
        self.rounds
            .iter()
            .skip(1)
            .find(|r| r.convergence_rate.abs() < self.cfg.convergence_threshold)
            .map(|r| r.round_number)
    }

    pub fn summary(&self) -> ExperimentSummary {
        let total_rounds = self.rounds.len();
        let average_accuracy = if total_rounds == 0 {
            0.0
        } else {
            self.rounds.iter().map(|r| r.global_accuracy).sum::<f64>() / total_rounds as f64
        };

        ExperimentSummary {
            total_rounds,
            average_accuracy,
            final_accuracy: self.rounds.last().map(|r| r.global_accuracy).unwrap_or(0.0),
            convergence_round: self.convergence_round(),
            total_failures: self
                .rounds
                .iter()
                .map(|r| r.failed_workers.len() as u64)
                .sum(),
            resilience_score: self.resilience_score(),
        }
    }
}
