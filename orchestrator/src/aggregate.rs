/// Sample-weighted federated averaging.
///
/// Workers that trained on more local data pull the global parameters
/// proportionally harder: `new[i] = Σ_k (n_k / Σn) * update_k[i]`.
/// An empty update set returns `previous` unchanged, so an all-failed
/// round can never corrupt the global model.
pub fn aggregate(previous: &[f32], updates: &[(Vec<f32>, u64)]) -> Vec<f32> {
    let total_samples: u64 = updates.iter().map(|(_, n)| n).sum();
    if total_samples == 0 {
        return previous.to_vec();
    }

    let mut merged = vec![0.0; previous.len()];
    for (params, samples) in updates {
        debug_assert_eq!(params.len(), merged.len());

        let weight = *samples as f32 / total_samples as f32;
        for (out, param) in merged.iter_mut().zip(params) {
            *out += weight * param;
        }
    }

    merged
}
