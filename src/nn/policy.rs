//! Tactical actor-critic network
//!
//! A shared tanh trunk feeds two specialized branches (tactical and safety
//! assessment); their outputs are concatenated back with the trunk features
//! before the actor and critic heads. The actor produces an unconstrained
//! mean per action dimension plus a learned per-dimension log standard
//! deviation, both clamped to keep the Gaussian well-behaved over very long
//! runs.
//!
//! Every boundary sanitizes non-finite values instead of propagating them:
//! NaN observations become zeros, a degenerate std falls back to a safe
//! default. Training survives numerical accidents rather than crashing on
//! them.

use burn::module::Param;
use burn::nn::Linear;
use burn::prelude::*;
use burn::tensor::activation::tanh;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use super::orthogonal::orthogonal_linear;

/// Gain for every orthogonally-initialized layer; deliberately below 1 so
/// early outputs stay small.
const INIT_GAIN: f32 = 0.5;
const MEAN_CLAMP: f32 = 5.0;
const LOG_STD_MIN: f32 = -3.0;
const LOG_STD_MAX: f32 = 0.0;
const LOG_STD_INIT: f32 = -0.5;
/// Std used when the learned one has gone non-finite.
const FALLBACK_STD: f32 = 0.5;
const HALF_LN_TWO_PI: f32 = 0.918_938_5;

#[derive(Config, Debug)]
pub struct TacticalActorCriticConfig {
    pub obs_dim: usize,
    pub action_dim: usize,
    #[config(default = 256)]
    pub hidden_dim: usize,
}

impl TacticalActorCriticConfig {
    pub fn init<B: Backend>(&self, rng: &mut impl Rng, device: &B::Device) -> TacticalActorCritic<B> {
        let combined = self.hidden_dim + 64 + 32;
        TacticalActorCritic {
            feature1: orthogonal_linear(self.obs_dim, self.hidden_dim, INIT_GAIN, rng, device),
            feature2: orthogonal_linear(self.hidden_dim, self.hidden_dim, INIT_GAIN, rng, device),
            feature3: orthogonal_linear(self.hidden_dim, self.hidden_dim, INIT_GAIN, rng, device),
            tactical1: orthogonal_linear(self.hidden_dim, 128, INIT_GAIN, rng, device),
            tactical2: orthogonal_linear(128, 64, INIT_GAIN, rng, device),
            safety1: orthogonal_linear(self.hidden_dim, 64, INIT_GAIN, rng, device),
            safety2: orthogonal_linear(64, 32, INIT_GAIN, rng, device),
            actor_hidden: orthogonal_linear(combined, 128, INIT_GAIN, rng, device),
            actor_mean: orthogonal_linear(128, self.action_dim, INIT_GAIN, rng, device),
            critic_hidden: orthogonal_linear(combined, 128, INIT_GAIN, rng, device),
            critic_value: orthogonal_linear(128, 1, INIT_GAIN, rng, device),
            log_std: Param::from_tensor(Tensor::full([self.action_dim], LOG_STD_INIT, device)),
        }
    }
}

/// Actor-critic with shared trunk, tactical/safety branches, and a learned
/// diagonal-Gaussian action head.
#[derive(Module, Debug)]
pub struct TacticalActorCritic<B: Backend> {
    feature1: Linear<B>,
    feature2: Linear<B>,
    feature3: Linear<B>,
    tactical1: Linear<B>,
    tactical2: Linear<B>,
    safety1: Linear<B>,
    safety2: Linear<B>,
    actor_hidden: Linear<B>,
    actor_mean: Linear<B>,
    critic_hidden: Linear<B>,
    critic_value: Linear<B>,
    log_std: Param<Tensor<B, 1>>,
}

/// Replace every non-finite entry with zero. NaN is the only value that
/// differs from itself; infinities are caught by the magnitude test.
fn sanitize<B: Backend, const D: usize>(x: Tensor<B, D>) -> Tensor<B, D> {
    let x = x.clone().mask_fill(x.clone().not_equal(x.clone()), 0.0);
    x.clone().mask_fill(x.clone().abs().greater_elem(1.0e38), 0.0)
}

impl<B: Backend> TacticalActorCritic<B> {
    /// Forward pass over a batch of observations.
    ///
    /// Returns `(mean [batch, act], std [act], value [batch, 1])`. The mean
    /// is clamped to a bounded range and the std derives from the clamped
    /// log-std parameter, so both are always finite for finite weights.
    pub fn forward(&self, obs: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 1>, Tensor<B, 2>) {
        let obs = sanitize(obs);

        let x = tanh(self.feature1.forward(obs));
        let x = tanh(self.feature2.forward(x));
        let features = tanh(self.feature3.forward(x));

        let tactical = tanh(self.tactical1.forward(features.clone()));
        let tactical = tanh(self.tactical2.forward(tactical));
        let safety = tanh(self.safety1.forward(features.clone()));
        let safety = tanh(self.safety2.forward(safety));

        let combined = Tensor::cat(vec![features, tactical, safety], 1);

        let mean = self
            .actor_mean
            .forward(tanh(self.actor_hidden.forward(combined.clone())))
            .clamp(-MEAN_CLAMP, MEAN_CLAMP);
        let std = self
            .log_std
            .val()
            .clamp(LOG_STD_MIN, LOG_STD_MAX)
            .exp();
        let value = self
            .critic_value
            .forward(tanh(self.critic_hidden.forward(combined)));

        (mean, std, value)
    }

    /// Sample one action for a single observation.
    ///
    /// Returns the post-processed action components (movement in [-1, 1],
    /// turret/fire/ability in [0, 1]) and the critic's value estimate. With
    /// `deterministic` the raw mean is post-processed instead of a sample.
    pub fn act(
        &self,
        obs: &[f32],
        deterministic: bool,
        rng: &mut impl Rng,
        device: &B::Device,
    ) -> (Vec<f32>, f32) {
        let input = Tensor::<B, 1>::from_data(TensorData::from(obs), device).unsqueeze::<2>();
        let (mean, std, value) = self.forward(input);

        let mean_data = mean.into_data();
        let mean_slice = mean_data.as_slice::<f32>().unwrap_or(&[]);
        let std_data = std.into_data();
        let std_slice = std_data.as_slice::<f32>().unwrap_or(&[]);
        let value = value
            .into_data()
            .as_slice::<f32>()
            .map(|v| v[0])
            .unwrap_or(0.0);

        let action: Vec<f32> = mean_slice
            .iter()
            .zip(std_slice.iter())
            .map(|(&m, &s)| {
                let m = if m.is_finite() { m } else { 0.0 };
                let s = if s.is_finite() && s > 0.0 { s } else { FALLBACK_STD };
                if deterministic {
                    m
                } else {
                    match Normal::new(m, s) {
                        Ok(dist) => dist.sample(rng),
                        Err(_) => m,
                    }
                }
            })
            .collect();

        (post_process(&action), value)
    }

    /// Log-probability, value, and entropy for a batch of taken actions.
    ///
    /// Rebuilds the per-dimension Gaussian the sampler used (with the same
    /// non-finite fallbacks) and sums densities and entropies over the action
    /// dimensions.
    pub fn evaluate(
        &self,
        obs: Tensor<B, 2>,
        actions: Tensor<B, 2>,
    ) -> (Tensor<B, 1>, Tensor<B, 1>, Tensor<B, 1>) {
        let [batch, _] = actions.dims();
        let device = actions.device();

        let (mean, std, value) = self.forward(obs);
        let mean = sanitize(mean);
        let std = std
            .clone()
            .mask_fill(std.clone().not_equal(std), 1.0)
            .clamp_min(1e-6);

        let std_row = std.unsqueeze::<2>();
        let log_std_row = std_row.clone().log();

        let normalized = (sanitize(actions) - mean) / std_row;
        let log_probs = (normalized.powf_scalar(2.0).mul_scalar(-0.5) - log_std_row.clone())
            .sub_scalar(HALF_LN_TWO_PI)
            .sum_dim(1)
            .squeeze_dims(&[1]);

        // Diagonal-Gaussian entropy is state-independent; broadcast the
        // per-distribution value across the batch.
        let entropy_sum = log_std_row
            .add_scalar(0.5 + HALF_LN_TWO_PI)
            .sum_dim(1)
            .squeeze_dims::<1>(&[1]);
        let entropy = Tensor::ones([batch], &device) * entropy_sum;

        let values = value.squeeze_dims(&[1]);

        (log_probs, values, entropy)
    }
}

impl<B: Backend> TacticalActorCritic<B> {
    /// Every linear layer paired with a stable export name.
    pub fn named_linears(&self) -> Vec<(&'static str, &Linear<B>)> {
        vec![
            ("feature1", &self.feature1),
            ("feature2", &self.feature2),
            ("feature3", &self.feature3),
            ("tactical1", &self.tactical1),
            ("tactical2", &self.tactical2),
            ("safety1", &self.safety1),
            ("safety2", &self.safety2),
            ("actor_hidden", &self.actor_hidden),
            ("actor_mean", &self.actor_mean),
            ("critic_hidden", &self.critic_hidden),
            ("critic_value", &self.critic_value),
        ]
    }

    /// Raw (unclamped) log-std parameter values.
    pub fn log_std_values(&self) -> Vec<f32> {
        self.log_std
            .val()
            .into_data()
            .as_slice::<f32>()
            .map(|s| s.to_vec())
            .unwrap_or_default()
    }
}

/// Map raw network outputs onto the action ranges the arena expects:
/// tanh for the two movement components, sigmoid for the rest.
pub fn post_process(raw: &[f32]) -> Vec<f32> {
    raw.iter()
        .enumerate()
        .map(|(i, &x)| if i < 2 { x.tanh() } else { sigmoid(x) })
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    const OBS: usize = 58;
    const ACT: usize = 5;

    fn policy() -> (TacticalActorCritic<NdArray>, NdArrayDevice, Pcg64) {
        let device = NdArrayDevice::default();
        let mut rng = Pcg64::seed_from_u64(0);
        let policy = TacticalActorCriticConfig::new(OBS, ACT).init(&mut rng, &device);
        (policy, device, rng)
    }

    #[test]
    fn forward_shapes_match_heads() {
        let (policy, device, _) = policy();
        let obs = Tensor::<NdArray, 2>::zeros([7, OBS], &device);
        let (mean, std, value) = policy.forward(obs);
        assert_eq!(mean.dims(), [7, ACT]);
        assert_eq!(std.dims(), [ACT]);
        assert_eq!(value.dims(), [7, 1]);
    }

    #[test]
    fn nan_observations_produce_finite_outputs() {
        let (policy, device, _) = policy();
        let obs = Tensor::<NdArray, 2>::from_data(
            TensorData::new(vec![f32::NAN; OBS], [1, OBS]),
            &device,
        );
        let (mean, std, value) = policy.forward(obs);
        for v in mean.into_data().as_slice::<f32>().unwrap() {
            assert!(v.is_finite());
        }
        for v in std.into_data().as_slice::<f32>().unwrap() {
            assert!(v.is_finite() && *v > 0.0);
        }
        assert!(value.into_data().as_slice::<f32>().unwrap()[0].is_finite());
    }

    #[test]
    fn sampled_actions_respect_component_ranges() {
        let (policy, device, mut rng) = policy();
        let obs = [0.1f32; OBS];
        for _ in 0..20 {
            let (action, _) = policy.act(&obs, false, &mut rng, &device);
            assert_eq!(action.len(), ACT);
            assert!(action[0] >= -1.0 && action[0] <= 1.0);
            assert!(action[1] >= -1.0 && action[1] <= 1.0);
            for a in &action[2..] {
                assert!(*a >= 0.0 && *a <= 1.0);
            }
        }
    }

    #[test]
    fn deterministic_act_is_repeatable() {
        let (policy, device, mut rng) = policy();
        let obs = [0.3f32; OBS];
        let (a, va) = policy.act(&obs, true, &mut rng, &device);
        let (b, vb) = policy.act(&obs, true, &mut rng, &device);
        assert_eq!(a, b);
        assert_eq!(va, vb);
    }

    #[test]
    fn evaluate_entropy_matches_closed_form() {
        let (policy, device, _) = policy();
        let obs = Tensor::<NdArray, 2>::zeros([3, OBS], &device);
        let actions = Tensor::<NdArray, 2>::zeros([3, ACT], &device);
        let (_, _, entropy) = policy.evaluate(obs.clone(), actions);

        // Freshly initialized log-std is -0.5 per dimension.
        let expected = ACT as f32 * (-0.5 + 0.5 + HALF_LN_TWO_PI);
        for e in entropy.into_data().as_slice::<f32>().unwrap() {
            assert!((e - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn log_std_stays_clamped() {
        let (policy, device, _) = policy();
        let obs = Tensor::<NdArray, 2>::zeros([1, OBS], &device);
        let (_, std, _) = policy.forward(obs);
        for s in std.into_data().as_slice::<f32>().unwrap() {
            assert!(*s >= (LOG_STD_MIN).exp() - 1e-6);
            assert!(*s <= (LOG_STD_MAX).exp() + 1e-6);
        }
    }
}
