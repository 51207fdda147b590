use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Seed for the ground-truth separating plane shared by every shard.
/// All shards label their samples against the same underlying function,
/// so averaged updates from disjoint shards still converge.
const TRUTH_SEED: u64 = 7;

/// A private data partition held by one participant.
pub struct Shard {
    x: Array2<f32>,
    y: Array1<f32>,
}

impl Shard {
    /// Generates a deterministic synthetic binary-classification shard.
    ///
    /// # Arguments
    /// * `seed` - Shard identity; distinct seeds draw distinct samples.
    /// * `samples` - Number of rows to generate.
    /// * `features` - Input dimensionality.
    pub fn synthetic(seed: u64, samples: usize, features: usize) -> Self {
        let mut truth_rng = StdRng::seed_from_u64(TRUTH_SEED);
        let truth: Array1<f32> =
            Array1::from_shape_fn(features, |_| truth_rng.random_range(-1.0..1.0));
        let truth_bias: f32 = truth_rng.random_range(-0.5..0.5);

        let mut rng = StdRng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((samples, features), |_| rng.random_range(-1.0..1.0));
        let y = Array1::from_shape_fn(samples, |i| {
            let logit = x.row(i).dot(&truth) + truth_bias;
            if logit > 0.0 { 1.0 } else { 0.0 }
        });

        Self { x, y }
    }

    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn features(&self) -> usize {
        self.x.ncols()
    }

    pub fn inputs(&self) -> ArrayView2<'_, f32> {
        self.x.view()
    }

    pub fn labels(&self) -> ArrayView1<'_, f32> {
        self.y.view()
    }

    /// Iterates the shard in fixed-size row batches, in order.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> impl Iterator<Item = (ArrayView2<'_, f32>, ArrayView1<'_, f32>)> {
        let batch_size = batch_size.max(1);
        self.x
            .axis_chunks_iter(Axis(0), batch_size)
            .zip(self.y.axis_chunks_iter(Axis(0), batch_size))
    }
}
