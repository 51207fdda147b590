use std::time::Duration;

/// Smoothing and clamping constants for the adaptive timeout estimator.
///
/// The defaults are the classic Jacobson/Karels retransmission-timer values;
/// they are tuned, not derived, so they live in configuration.
#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    pub min_timeout: Duration,
    pub max_timeout: Duration,
    /// Smoothing factor for the round-trip average.
    pub alpha: f64,
    /// Smoothing factor for the round-trip deviation.
    pub beta: f64,
    /// Average round-trip estimate, in seconds, before any sample arrives.
    pub initial_avg_rtt: f64,
    /// Deviation estimate, in seconds, before any sample arrives.
    pub initial_dev_rtt: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_timeout: Duration::from_secs(10),
            max_timeout: Duration::from_secs(180),
            alpha: 0.125,
            beta: 0.25,
            initial_avg_rtt: 30.0,
            initial_dev_rtt: 5.0,
        }
    }
}

/// Smoothed round-trip estimate for one worker. Both terms stay >= 0.
#[derive(Debug, Clone, Copy)]
pub struct TimingStats {
    pub avg_rtt: f64,
    pub dev_rtt: f64,
}

/// Maintains one `TimingStats` per worker and turns it into a bounded
/// timeout for the next call. A structurally slow worker cannot push the
/// bound past the configured ceiling, while stable workers get tight
/// timeouts that surface failures quickly.
pub struct TimeoutEstimator {
    cfg: TimingConfig,
    stats: Vec<TimingStats>,
}

impl TimeoutEstimator {
    pub fn new(num_workers: usize, cfg: TimingConfig) -> Self {
        let initial = TimingStats {
            avg_rtt: cfg.initial_avg_rtt,
            dev_rtt: cfg.initial_dev_rtt,
        };

        Self {
            cfg,
            stats: vec![initial; num_workers],
        }
    }

    /// Computes the timeout bound for the next call to `worker`.
    ///
    /// Always returns a valid bound inside `[min_timeout, max_timeout]`.
    pub fn next_timeout(&self, worker: usize) -> Duration {
        let TimingStats { avg_rtt, dev_rtt } = self.stats[worker];
        let bound = avg_rtt + 4.0 * dev_rtt;

        Duration::from_secs_f64(bound.clamp(
            self.cfg.min_timeout.as_secs_f64(),
            self.cfg.max_timeout.as_secs_f64(),
        ))
    }

    /// Feeds one measured round-trip sample, in seconds, into `worker`'s
    /// estimate. Only call this for completed calls; failed or timed-out
    /// calls would pollute the estimate with synthetic delays.
    pub fn observe(&mut self, worker: usize, sample: f64) {
        let TimingConfig { alpha, beta, .. } = self.cfg;
        let stats = &mut self.stats[worker];

        let delta = (sample - stats.avg_rtt).abs();
        stats.dev_rtt = (1.0 - beta) * stats.dev_rtt + beta * delta;
        stats.avg_rtt = (1.0 - alpha) * stats.avg_rtt + alpha * sample;
    }

    pub fn stats(&self, worker: usize) -> TimingStats {
        self.stats[worker]
    }

    pub fn max_timeout(&self) -> Duration {
        self.cfg.max_timeout
    }
}
