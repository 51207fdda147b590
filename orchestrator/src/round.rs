use std::{collections::BTreeMap, time::Duration};

use futures::future::join_all;
use log::{debug, warn};
use tokio::time::{self, Instant};

use crate::{
    failure::{FailureDecision, FailureInjector, FailureReason},
    timing::TimeoutEstimator,
    trainer::{CallError, TrainerClient},
};

/// Everything one round of fan-out produced. The sequences are in
/// worker-index order so downstream consumers can correlate them.
#[derive(Debug, Default)]
pub struct RoundCallResults {
    /// `(params, sample_count)` per responding worker, aggregation input.
    pub updates: Vec<(Vec<f32>, u64)>,
    pub failed_workers: Vec<usize>,
    pub slow_workers: Vec<usize>,
    /// One entry per worker, seconds. Synthetic for injected failures:
    /// 0 for immediate failures, the timeout ceiling for timeout kinds.
    pub response_times: Vec<f64>,
    pub timeout_count: usize,
    /// Worker index -> contributed sample count.
    pub contributions: BTreeMap<usize, u64>,
}

/// What a single worker does this round, fixed before the fan-out so every
/// random draw happens on one thread in worker order.
enum CallPlan {
    Skip {
        reason: FailureReason,
    },
    Call {
        extra_delay: Duration,
        timeout: Duration,
        injected_slow: bool,
    },
}

enum CallOutcome {
    Update {
        params: Vec<f32>,
        sample_count: u64,
        rtt: f64,
    },
    Failed {
        response_time: f64,
        timed_out: bool,
    },
}

/// Fans one frozen parameter snapshot out to every worker and collects the
/// per-worker outcomes. Calls run concurrently; a failing worker never
/// cancels its siblings, and the join below is the round barrier that must
/// complete before aggregation.
pub(crate) async fn execute_round<C: TrainerClient>(
    round: u64,
    params: &[f32],
    clients: &mut [C],
    injector: &mut FailureInjector,
    estimator: &mut TimeoutEstimator,
) -> RoundCallResults {
    let mut plans = Vec::with_capacity(clients.len());
    for worker in 0..clients.len() {
        let plan = match injector.decide(worker) {
            FailureDecision::Failing(reason) if reason != FailureReason::Slow => {
                debug!(worker = worker; "injected failure: {reason}");
                CallPlan::Skip { reason }
            }
            decision => {
                let extra_delay = injector.slow_delay(worker);
                CallPlan::Call {
                    extra_delay,
                    timeout: estimator.next_timeout(worker),
                    injected_slow: matches!(
                        decision,
                        FailureDecision::Failing(FailureReason::Slow)
                    ) || !extra_delay.is_zero(),
                }
            }
        };
        plans.push(plan);
    }

    let max_timeout = estimator.max_timeout();
    let calls = clients
        .iter_mut()
        .zip(&plans)
        .enumerate()
        .map(|(worker, (client, plan))| call_worker(worker, client, plan, round, params, max_timeout));
    let outcomes = join_all(calls).await;

    let mut results = RoundCallResults::default();
    for (worker, (outcome, plan)) in outcomes.into_iter().zip(&plans).enumerate() {
        if let CallPlan::Call {
            injected_slow: true,
            ..
        } = plan
        {
            results.slow_workers.push(worker);
        }

        match outcome {
            CallOutcome::Update {
                params,
                sample_count,
                rtt,
            } => {
                estimator.observe(worker, rtt);
                results.response_times.push(rtt);
                results.contributions.insert(worker, sample_count);
                results.updates.push((params, sample_count));
            }
            CallOutcome::Failed {
                response_time,
                timed_out,
            } => {
                results.response_times.push(response_time);
                results.failed_workers.push(worker);
                if timed_out {
                    results.timeout_count += 1;
                }
            }
        }
    }

    results
}

async fn call_worker<C: TrainerClient>(
    worker: usize,
    client: &mut C,
    plan: &CallPlan,
    round: u64,
    params: &[f32],
    max_timeout: Duration,
) -> CallOutcome {
    let (extra_delay, timeout) = match plan {
        CallPlan::Skip { reason } => {
            // Timeout-kind failures are booked as a full timeout; everything
            // else fails immediately without touching the wire.
            return if *reason == FailureReason::Timeout {
                CallOutcome::Failed {
                    response_time: max_timeout.as_secs_f64(),
                    timed_out: true,
                }
            } else {
                CallOutcome::Failed {
                    response_time: 0.0,
                    timed_out: false,
                }
            };
        }
        CallPlan::Call {
            extra_delay,
            timeout,
            ..
        } => (*extra_delay, *timeout),
    };

    let started = Instant::now();
    if !extra_delay.is_zero() {
        debug!(worker = worker; "slow response (+{:.1}s)", extra_delay.as_secs_f64());
        time::sleep(extra_delay).await;
    }

    match time::timeout(timeout, client.train(round, params)).await {
        Ok(Ok(update)) => CallOutcome::Update {
            rtt: started.elapsed().as_secs_f64(),
            params: update.params,
            sample_count: update.sample_count,
        },
        Ok(Err(CallError::Unavailable(e))) => {
            warn!(worker = worker; "worker unreachable: {e}");
            CallOutcome::Failed {
                response_time: 0.0,
                timed_out: false,
            }
        }
        Ok(Err(CallError::Malformed(detail))) => {
            warn!(worker = worker; "malformed response: {detail}");
            CallOutcome::Failed {
                response_time: 0.0,
                timed_out: false,
            }
        }
        Err(_) => {
            warn!(
                worker = worker;
                "no response within the {:.0}s bound",
                timeout.as_secs_f64()
            );
            CallOutcome::Failed {
                response_time: timeout.as_secs_f64(),
                timed_out: true,
            }
        }
    }
}
