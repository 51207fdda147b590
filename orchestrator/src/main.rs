use std::{env, fs::File, io, net::SocketAddr, num::NonZeroUsize};

use log::info;
use model::{LogisticModel, Shard};
use orchestrator::{
    Evaluator, Experiment, ExperimentConfig, failure::FailureScenario, trainer::RemoteTrainer,
};

const DEFAULT_WORKERS: &str = "127.0.0.1:5001,127.0.0.1:5002,127.0.0.1:5003";
const DEFAULT_ROUNDS: usize = 10;
const FEATURES: usize = 8;
const HELD_OUT_SEED: u64 = u64::MAX;
const HELD_OUT_SAMPLES: usize = 2000;

/// Scores snapshots against a held-out shard no worker trains on.
struct HeldOutEvaluator {
    shard: Shard,
}

impl Evaluator for HeldOutEvaluator {
    fn evaluate(&mut self, params: &[f32]) -> (f64, f64) {
        match LogisticModel::from_params(params) {
            Some(model) => model.evaluate(&self.shard),
            None => (0.0, 0.0),
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let addrs: Vec<SocketAddr> = env::var("WORKERS")
        .unwrap_or_else(|_| DEFAULT_WORKERS.to_string())
        .split(',')
        .map(|s| s.trim().parse().map_err(io::Error::other))
        .collect::<io::Result<_>>()?;

    let rounds = env::var("ROUNDS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_ROUNDS);
    let rounds =
        NonZeroUsize::new(rounds).ok_or_else(|| io::Error::other("ROUNDS must be positive"))?;

    let mut cfg = ExperimentConfig::new(rounds);
    if let Ok(name) = env::var("EXPERIMENT") {
        cfg = cfg.named(name);
    }
    if let Ok(seed) = env::var("SEED") {
        cfg = cfg.with_seed(seed.parse().map_err(io::Error::other)?);
    }
    if let Ok(path) = env::var("SCENARIO") {
        let scenario: FailureScenario = serde_json::from_reader(File::open(&path)?)?;
        info!("loaded failure scenario '{}' from {path}", scenario.name);
        cfg = cfg.with_scenario(scenario);
    }

    info!(
        "running '{}' for {} round(s) against {} worker(s)",
        cfg.experiment_name,
        cfg.rounds,
        addrs.len()
    );

    let clients: Vec<RemoteTrainer> = addrs.iter().copied().map(RemoteTrainer::new).collect();
    let evaluator = HeldOutEvaluator {
        shard: Shard::synthetic(HELD_OUT_SEED, HELD_OUT_SAMPLES, FEATURES),
    };
    let initial_params = LogisticModel::new(FEATURES).params();

    let mut experiment =
        Experiment::new(cfg, clients, evaluator, initial_params).map_err(io::Error::from)?;
    let report = experiment.run().await.map_err(io::Error::from)?;

    info!(
        "summary: avg accuracy {:.4}, final accuracy {:.4}, failures {}, resilience {:.4}",
        report.summary.average_accuracy,
        report.summary.final_accuracy,
        report.summary.total_failures,
        report.summary.resilience_score,
    );

    let out = env::var("OUT").unwrap_or_else(|_| "experiment.json".to_string());
    report.save_json(&out)?;
    info!("metrics exported to {out}");

    Ok(())
}
