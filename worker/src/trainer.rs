use model::{LogisticModel, Shard};

use crate::{Result, WorkerErr};

/// One local training step over a private data partition.
///
/// Takes the current global parameters and produces updated parameters
/// plus the number of samples they were fitted on. Must tolerate being
/// called once per round, every round.
pub trait LocalTrainer: Send + 'static {
    fn train(&mut self, round: u64, params: &[f32]) -> Result<(Vec<f32>, u64)>;
}

/// Trains a logistic model on a deterministic synthetic shard.
pub struct ShardTrainer {
    shard: Shard,
    lr: f32,
    batch_size: usize,
    epochs: usize,
}

impl ShardTrainer {
    /// Creates a trainer over the shard belonging to `worker_id`.
    ///
    /// # Arguments
    /// * `worker_id` - Shard identity; doubles as the data seed.
    /// * `samples` - Shard size.
    /// * `features` - Input dimensionality.
    pub fn new(worker_id: u64, samples: usize, features: usize) -> Self {
        Self {
            shard: Shard::synthetic(worker_id, samples, features),
            lr: 0.5,
            batch_size: 32,
            epochs: 1,
        }
    }

    pub fn with_hyperparams(mut self, lr: f32, batch_size: usize, epochs: usize) -> Self {
        self.lr = lr;
        self.batch_size = batch_size;
        self.epochs = epochs;
        self
    }
}

impl LocalTrainer for ShardTrainer {
    fn train(&mut self, round: u64, params: &[f32]) -> Result<(Vec<f32>, u64)> {
        let expected = self.shard.features() + 1;

        let mut model = match LogisticModel::from_params(params) {
            Some(model) if model.features() == self.shard.features() => model,
            _ => {
                return Err(WorkerErr::ParamsLengthMismatch {
                    round,
                    got: params.len(),
                    expected,
                });
            }
        };

        for _ in 0..self.epochs {
            model.fit_epoch(&self.shard, self.lr, self.batch_size);
        }

        Ok((model.params(), self.shard.len() as u64))
    }
}
