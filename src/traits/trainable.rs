//! Training metrics reported by an optimizer update

/// Averaged loss components from one update call
///
/// Accumulated as running sums while mini-batches are processed, then
/// averaged by [`TrainingMetrics::finish`]. `skipped_updates` counts
/// mini-batches whose total loss was non-finite and therefore never applied.
#[derive(Clone, Debug, Default)]
pub struct TrainingMetrics {
    /// Combined loss (policy + value + entropy terms)
    pub total_loss: f32,

    /// Clipped-surrogate policy loss
    pub policy_loss: f32,

    /// Value-function regression loss
    pub value_loss: f32,

    /// Mean policy entropy (higher means more exploration)
    pub entropy: f32,

    /// Number of gradient updates applied
    pub n_updates: usize,

    /// Mini-batches dropped for non-finite losses
    pub skipped_updates: usize,
}

impl TrainingMetrics {
    /// Convert accumulated sums into per-update averages.
    pub fn finish(mut self) -> Self {
        let n = self.n_updates.max(1) as f32;
        self.total_loss /= n;
        self.policy_loss /= n;
        self.value_loss /= n;
        self.entropy /= n;
        self
    }
}
