use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::Shard;

fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// Binary logistic-regression model over a flat parameter vector.
///
/// The wire layout is `[w_0 .. w_{f-1}, bias]`, so a model with `f`
/// features round-trips through `f + 1` parameters.
pub struct LogisticModel {
    weights: Array1<f32>,
    bias: f32,
}

impl LogisticModel {
    /// Creates a zero-initialized model for `features` inputs.
    pub fn new(features: usize) -> Self {
        Self {
            weights: Array1::zeros(features),
            bias: 0.0,
        }
    }

    /// Rebuilds a model from a flat parameter vector.
    ///
    /// # Returns
    /// `None` if the vector is empty and cannot hold a bias term.
    pub fn from_params(params: &[f32]) -> Option<Self> {
        let (bias, weights) = params.split_last()?;
        Some(Self {
            weights: Array1::from_vec(weights.to_vec()),
            bias: *bias,
        })
    }

    /// Flattens the model back into its wire layout.
    pub fn params(&self) -> Vec<f32> {
        let mut params = self.weights.to_vec();
        params.push(self.bias);
        params
    }

    pub fn features(&self) -> usize {
        self.weights.len()
    }

    /// Runs one pass over the shard in `batch_size` chunks of
    /// full-gradient logistic descent.
    pub fn fit_epoch(&mut self, shard: &Shard, lr: f32, batch_size: usize) {
        for (x, y) in shard.batches(batch_size) {
            self.step(x, y, lr);
        }
    }

    fn step(&mut self, x: ArrayView2<'_, f32>, y: ArrayView1<'_, f32>, lr: f32) {
        let n = x.nrows();
        if n == 0 {
            return;
        }

        let probs = (x.dot(&self.weights) + self.bias).mapv(sigmoid);
        let err = &probs - &y;
        let grad_w = x.t().dot(&err) / n as f32;
        let grad_b = err.sum() / n as f32;

        self.weights.scaled_add(-lr, &grad_w);
        self.bias -= lr * grad_b;
    }

    /// Evaluates the model against a held-out shard.
    ///
    /// # Returns
    /// `(loss, accuracy)` where loss is mean binary cross-entropy.
    pub fn evaluate(&self, shard: &Shard) -> (f64, f64) {
        let n = shard.len();
        if n == 0 {
            return (0.0, 0.0);
        }

        let probs = (shard.inputs().dot(&self.weights) + self.bias).mapv(sigmoid);

        let mut loss = 0.0f64;
        let mut correct = 0usize;
        for (p, y) in probs.iter().zip(shard.labels()) {
            let p = p.clamp(1e-7, 1.0 - 1e-7) as f64;
            let y = *y as f64;
            loss -= y * p.ln() + (1.0 - y) * (1.0 - p).ln();
            if (p >= 0.5) == (y >= 0.5) {
                correct += 1;
            }
        }

        (loss / n as f64, correct as f64 / n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_roundtrip() {
        let mut model = LogisticModel::new(3);
        model.bias = 0.25;
        let params = model.params();
        assert_eq!(params.len(), 4);

        let rebuilt = LogisticModel::from_params(&params).unwrap();
        assert_eq!(rebuilt.params(), params);
        assert_eq!(rebuilt.features(), 3);
    }

    #[test]
    fn from_params_rejects_empty() {
        assert!(LogisticModel::from_params(&[]).is_none());
    }

    #[test]
    fn training_beats_chance_on_synthetic_shard() {
        let shard = Shard::synthetic(11, 400, 6);
        let mut model = LogisticModel::new(6);

        let (_, before) = model.evaluate(&shard);
        for _ in 0..50 {
            model.fit_epoch(&shard, 0.5, 32);
        }
        let (loss, after) = model.evaluate(&shard);

        assert!(after > before, "accuracy did not improve: {before} -> {after}");
        assert!(after > 0.8, "expected > 80% accuracy, got {after}");
        assert!(loss.is_finite());
    }

    #[test]
    fn evaluate_on_empty_shard_is_zero() {
        let shard = Shard::synthetic(1, 0, 4);
        let model = LogisticModel::new(4);
        assert_eq!(model.evaluate(&shard), (0.0, 0.0));
    }
}
