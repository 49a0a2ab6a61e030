//! Proximal Policy Optimization for the arena agent
//!
//! On-policy training over whole episodes: collect one trajectory with the
//! current policy, estimate advantages with GAE, then run several epochs of
//! shuffled mini-batch updates against the clipped surrogate objective.
//!
//! Numerical robustness is a first-class requirement here — runs last many
//! thousands of episodes and a single NaN must never kill one. Every batch
//! is sanitized on the way in, the probability ratio is computed through a
//! clamped log-difference, the value loss is bounded, and an update step
//! whose total loss is non-finite is skipped outright rather than applied.

use std::fs;
use std::path::Path;

use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{BinFileRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::{BasicOps, Numeric};
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::checkpoint::{meta_path, model_path, optimizer_path, CheckpointError, TrainerMeta};
use crate::env::Environment;
use crate::nn::{TacticalActorCritic, TacticalActorCriticConfig};
use crate::sim::observation::Observation;
use crate::sim::{ArenaAction, Outcome, ACTION_DIM};
use crate::traits::{ToTensor, TrainingMetrics};

use super::gae::compute_gae;

/// Log-probability substituted for non-finite entries before an update.
const LOG_PROB_FLOOR: f32 = -10.0;
/// Bound on the log-ratio before exponentiation.
const RATIO_LOG_CLAMP: f32 = 10.0;
/// Upper bound on the value loss; spikes beyond this destabilize training.
const VALUE_LOSS_CLAMP: f32 = 1000.0;

/// Hyperparameters for the PPO update
#[derive(Debug, Clone)]
pub struct PpoConfig {
    /// Discount factor
    pub gamma: f32,
    /// GAE trace decay
    pub gae_lambda: f32,
    /// Clipping parameter for the surrogate objective
    pub clip_epsilon: f32,
    /// Initial learning rate
    pub lr: f64,
    /// Multiplicative learning-rate decay factor
    pub lr_decay: f64,
    /// Episodes between learning-rate decays
    pub lr_decay_every: usize,
    /// Value loss coefficient
    pub value_coef: f32,
    /// Entropy bonus coefficient
    pub entropy_coef: f32,
    /// Gradient-norm clip applied on every optimizer step
    pub max_grad_norm: f32,
    /// Optimization epochs per collected episode
    pub ppo_epochs: usize,
    /// Mini-batch size within each epoch
    pub mini_batch_size: usize,
}

impl Default for PpoConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_epsilon: 0.2,
            lr: 3e-4,
            lr_decay: 0.95,
            lr_decay_every: 1000,
            value_coef: 0.5,
            entropy_coef: 0.01,
            max_grad_norm: 0.5,
            ppo_epochs: 10,
            mini_batch_size: 64,
        }
    }
}

/// One episode's transitions, in step order
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub states: Vec<Observation>,
    pub actions: Vec<ArenaAction>,
    pub rewards: Vec<f32>,
    pub values: Vec<f32>,
    pub log_probs: Vec<f32>,
    pub dones: Vec<bool>,
}

impl Trajectory {
    fn push(
        &mut self,
        state: Observation,
        action: ArenaAction,
        reward: f32,
        value: f32,
        log_prob: f32,
        done: bool,
    ) {
        self.states.push(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.values.push(value);
        self.log_probs.push(log_prob);
        self.dones.push(done);
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// A collected episode plus everything the estimator needs
#[derive(Debug, Clone)]
pub struct EpisodeRollout {
    pub trajectory: Trajectory,
    pub episode_reward: f32,
    pub length: u32,
    pub outcome: Option<Outcome>,
    /// Critic's estimate for the post-episode state; masked by GAE whenever
    /// the last transition was terminal.
    pub bootstrap_value: f32,
}

type PolicyOptimizer<B> = OptimizerAdaptor<Adam, TacticalActorCritic<B>, B>;

/// PPO trainer owning the policy parameters and optimizer state
pub struct PpoTrainer<B: AutodiffBackend> {
    // Option allows taking ownership during the optimizer step
    policy: Option<TacticalActorCritic<B>>,
    optimizer: Option<PolicyOptimizer<B>>,
    config: PpoConfig,
    lr: f64,
    episodes_seen: usize,
    pub total_steps: usize,
    pub episode_rewards: Vec<f32>,
    pub episode_lengths: Vec<u32>,
    device: B::Device,
}

impl<B: AutodiffBackend<FloatElem = f32>> PpoTrainer<B> {
    pub fn new(net: &TacticalActorCriticConfig, config: PpoConfig, device: B::Device) -> Self {
        let policy = net.init(&mut thread_rng(), &device);
        let optimizer = AdamConfig::new()
            .with_epsilon(1e-5)
            .with_grad_clipping(Some(
                burn::grad_clipping::GradientClippingConfig::Norm(config.max_grad_norm),
            ))
            .init();

        Self {
            policy: Some(policy),
            optimizer: Some(optimizer),
            lr: config.lr,
            config,
            episodes_seen: 0,
            total_steps: 0,
            episode_rewards: Vec::new(),
            episode_lengths: Vec::new(),
            device,
        }
    }

    pub fn policy(&self) -> &TacticalActorCritic<B> {
        self.policy.as_ref().unwrap()
    }

    pub fn current_lr(&self) -> f64 {
        self.lr
    }

    /// Sample (or, deterministically, take the mean of) one action.
    pub fn act(&self, obs: &Observation, deterministic: bool) -> ([f32; ACTION_DIM], f32) {
        let (sampled, value) = self
            .policy()
            .act(obs, deterministic, &mut thread_rng(), &self.device);
        let mut action = [0.0f32; ACTION_DIM];
        action.copy_from_slice(&sampled);
        (action, value)
    }

    /// Log-probability of `action` under the current policy.
    fn log_prob_of(&self, obs: &Observation, action: &[f32; ACTION_DIM]) -> f32 {
        let states = vec![*obs].to_tensor(&self.device);
        let actions = vec![*action].to_tensor(&self.device);
        let (log_probs, _, _) = self.policy().evaluate(states, actions);
        log_probs
            .into_data()
            .as_slice::<f32>()
            .map(|s| s[0])
            .unwrap_or(LOG_PROB_FLOOR)
    }

    /// Critic value for a single observation.
    pub fn state_value(&self, obs: &Observation) -> f32 {
        let input = vec![*obs].to_tensor(&self.device);
        let (_, _, value) = self.policy().forward(input);
        value
            .into_data()
            .as_slice::<f32>()
            .map(|s| s[0])
            .unwrap_or(0.0)
    }

    /// Run one full episode against `env`, recording every transition along
    /// with the log-probability each action had when it was taken.
    pub fn collect_episode<E>(&mut self, env: &mut E) -> EpisodeRollout
    where
        E: Environment<State = Observation, Action = ArenaAction, Outcome = Outcome>,
    {
        let mut obs = env.reset();
        let mut trajectory = Trajectory::default();
        let mut episode_reward = 0.0;
        let mut length = 0u32;
        let mut outcome = None;

        while env.is_active() {
            let (action, value) = self.act(&obs, false);
            let log_prob = self.log_prob_of(&obs, &action);

            let step = env.step(action);
            trajectory.push(obs, action, step.reward, value, log_prob, step.done);

            obs = step.state;
            episode_reward += step.reward;
            length += 1;
            self.total_steps += 1;

            if step.done {
                outcome = step.outcome;
                break;
            }
        }

        let bootstrap_value = self.state_value(&obs);

        EpisodeRollout {
            trajectory,
            episode_reward,
            length,
            outcome,
            bootstrap_value,
        }
    }

    /// Advantage and return targets for a collected rollout.
    pub fn estimate_advantages(&self, rollout: &EpisodeRollout) -> (Vec<f32>, Vec<f32>) {
        compute_gae(
            &rollout.trajectory.rewards,
            &rollout.trajectory.values,
            &rollout.trajectory.dones,
            rollout.bootstrap_value,
            self.config.gamma,
            self.config.gae_lambda,
        )
    }

    /// Clipped-surrogate update over one augmented trajectory.
    pub fn update(
        &mut self,
        trajectory: &Trajectory,
        advantages: &[f32],
        returns: &[f32],
    ) -> TrainingMetrics {
        let mut metrics = TrainingMetrics::default();
        if trajectory.is_empty() {
            self.advance_lr_schedule();
            return metrics;
        }

        let n_samples = trajectory.len();

        // Sanitize everything on the way in; a stray NaN in one transition
        // must not poison the whole batch.
        let states: Vec<Observation> = trajectory
            .states
            .iter()
            .map(|s| s.map(|x| sanitize_scalar(x, 0.0)))
            .collect();
        let actions: Vec<ArenaAction> = trajectory
            .actions
            .iter()
            .map(|a| a.map(|x| sanitize_scalar(x, 0.0)))
            .collect();
        let old_log_probs: Vec<f32> = trajectory
            .log_probs
            .iter()
            .map(|&x| sanitize_scalar(x, LOG_PROB_FLOOR))
            .collect();
        let mut advantages: Vec<f32> = advantages
            .iter()
            .map(|&x| sanitize_scalar(x, 0.0))
            .collect();
        let returns: Vec<f32> = returns.iter().map(|&x| sanitize_scalar(x, 0.0)).collect();

        normalize_advantages(&mut advantages);

        let states: Tensor<B, 2> = states.to_tensor(&self.device);
        let actions: Tensor<B, 2> = actions.to_tensor(&self.device);
        let old_log_probs: Tensor<B, 1> = old_log_probs.to_tensor(&self.device);
        let advantages: Tensor<B, 1> = advantages.to_tensor(&self.device);
        let returns: Tensor<B, 1> = returns.to_tensor(&self.device);

        let mut indices: Vec<usize> = (0..n_samples).collect();

        for _epoch in 0..self.config.ppo_epochs {
            indices.shuffle(&mut thread_rng());

            for batch_start in (0..n_samples).step_by(self.config.mini_batch_size) {
                let batch_end = (batch_start + self.config.mini_batch_size).min(n_samples);
                let batch_indices = &indices[batch_start..batch_end];

                let batch_states = self.gather(&states, batch_indices);
                let batch_actions = self.gather(&actions, batch_indices);
                let batch_old_log_probs = self.gather(&old_log_probs, batch_indices);
                let batch_advantages = self.gather(&advantages, batch_indices);
                let batch_returns = self.gather(&returns, batch_indices);

                let policy = self.policy.take().unwrap();

                let (log_probs, values, entropy) = policy.evaluate(batch_states, batch_actions);

                let policy_loss = clipped_surrogate_loss(
                    log_probs,
                    batch_old_log_probs,
                    batch_advantages,
                    self.config.clip_epsilon,
                );
                let value_loss = clamped_value_loss(values, batch_returns);
                let entropy_loss = entropy.clone().mean().neg();

                let loss = policy_loss.clone()
                    + value_loss.clone() * self.config.value_coef
                    + entropy_loss * self.config.entropy_coef;

                let loss_value = loss.clone().into_scalar().elem::<f32>();
                if !loss_value.is_finite() {
                    // A poisoned mini-batch is dropped, not applied.
                    metrics.skipped_updates += 1;
                    self.policy = Some(policy);
                    continue;
                }

                metrics.total_loss += loss_value;
                metrics.policy_loss += policy_loss.into_scalar().elem::<f32>();
                metrics.value_loss += value_loss.into_scalar().elem::<f32>();
                metrics.entropy += entropy.mean().into_scalar().elem::<f32>();
                metrics.n_updates += 1;

                let grads = loss.backward();
                let grads = GradientsParams::from_grads(grads, &policy);
                let mut optimizer = self.optimizer.take().unwrap();
                self.policy = Some(optimizer.step(self.lr, policy, grads));
                self.optimizer = Some(optimizer);
            }
        }

        self.advance_lr_schedule();
        metrics.finish()
    }

    /// Step-decay schedule: multiply the rate by `lr_decay` every
    /// `lr_decay_every` episodes.
    fn advance_lr_schedule(&mut self) {
        self.episodes_seen += 1;
        if self.config.lr_decay_every > 0 && self.episodes_seen % self.config.lr_decay_every == 0 {
            self.lr *= self.config.lr_decay;
        }
    }

    pub fn record_episode(&mut self, reward: f32, length: u32) {
        self.episode_rewards.push(reward);
        self.episode_lengths.push(length);
    }

    fn gather<const D: usize, K: BasicOps<B> + Numeric<B>>(
        &self,
        tensor: &Tensor<B, D, K>,
        indices: &[usize],
    ) -> Tensor<B, D, K> {
        let indices: Vec<i32> = indices.iter().map(|&x| x as i32).collect();
        let indices_tensor = Tensor::<B, 1, Int>::from_data(
            TensorData::from(indices.as_slice()).convert::<B::IntElem>(),
            &self.device,
        );
        tensor.clone().select(0, indices_tensor)
    }

    /// Persist policy, optimizer state, and episode history under `stem`.
    pub fn save_checkpoint(&self, stem: &Path) -> Result<(), CheckpointError> {
        if let Some(parent) = stem.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        self.policy()
            .clone()
            .save_file(model_path(stem), &recorder)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;

        recorder
            .record(
                self.optimizer.as_ref().unwrap().to_record(),
                optimizer_path(stem),
            )
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;

        let meta = TrainerMeta {
            total_steps: self.total_steps,
            episodes_seen: self.episodes_seen,
            lr: self.lr,
            episode_rewards: self.episode_rewards.clone(),
            episode_lengths: self.episode_lengths.clone(),
        };
        fs::write(meta_path(stem), serde_json::to_string_pretty(&meta)?)?;

        Ok(())
    }

    /// Restore a checkpoint written by [`PpoTrainer::save_checkpoint`].
    ///
    /// The policy record is required; optimizer state and metadata are
    /// restored best-effort so an older or partially-written checkpoint
    /// still yields usable weights.
    pub fn load_checkpoint(&mut self, stem: &Path) -> Result<(), CheckpointError> {
        let model = model_path(stem);
        if !model.exists() {
            return Err(CheckpointError::Missing(stem.to_path_buf()));
        }

        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let loaded = self
            .policy()
            .clone()
            .load_file(model, &recorder, &self.device)
            .map_err(|e| CheckpointError::Recorder(e.to_string()))?;
        self.policy = Some(loaded);

        match recorder.load(optimizer_path(stem), &self.device) {
            Ok(record) => {
                let optimizer = self.optimizer.take().unwrap();
                self.optimizer = Some(optimizer.load_record(record));
            }
            Err(e) => {
                tracing::warn!("optimizer state not restored: {e}");
            }
        }

        match fs::read_to_string(meta_path(stem)) {
            Ok(raw) => match serde_json::from_str::<TrainerMeta>(&raw) {
                Ok(meta) => {
                    self.total_steps = meta.total_steps;
                    self.episodes_seen = meta.episodes_seen;
                    self.lr = meta.lr;
                    self.episode_rewards = meta.episode_rewards;
                    self.episode_lengths = meta.episode_lengths;
                }
                Err(e) => tracing::warn!("checkpoint metadata unreadable: {e}"),
            },
            Err(e) => tracing::warn!("checkpoint metadata missing: {e}"),
        }

        Ok(())
    }
}

/// Zero-mean, unit-variance normalization; falls back to mean-centering only
/// when the batch is (near-)constant.
pub(crate) fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.is_empty() {
        return;
    }
    let n = advantages.len() as f32;
    let mean = advantages.iter().sum::<f32>() / n;
    let var = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n;
    let std = var.sqrt();

    if std > 1e-8 {
        for a in advantages.iter_mut() {
            *a = (*a - mean) / (std + 1e-8);
        }
    } else {
        for a in advantages.iter_mut() {
            *a -= mean;
        }
    }
}

/// Negative mean of the clipped surrogate objective.
///
/// The log-ratio is clamped before exponentiation so a badly drifted
/// mini-batch cannot produce an infinite ratio.
fn clipped_surrogate_loss<B: Backend>(
    log_probs: Tensor<B, 1>,
    old_log_probs: Tensor<B, 1>,
    advantages: Tensor<B, 1>,
    clip_epsilon: f32,
) -> Tensor<B, 1> {
    let ratio = (log_probs - old_log_probs)
        .clamp(-RATIO_LOG_CLAMP, RATIO_LOG_CLAMP)
        .exp();
    let clipped = ratio.clone().clamp(1.0 - clip_epsilon, 1.0 + clip_epsilon);

    let surr1 = ratio * advantages.clone();
    let surr2 = clipped * advantages;
    surr1.min_pair(surr2).mean().neg()
}

/// Mean-squared error against return targets, clamped to suppress spikes.
fn clamped_value_loss<B: Backend>(values: Tensor<B, 1>, returns: Tensor<B, 1>) -> Tensor<B, 1> {
    (returns - values)
        .powf_scalar(2.0)
        .mean()
        .clamp(0.0, VALUE_LOSS_CLAMP)
}

fn sanitize_scalar(x: f32, fallback: f32) -> f32 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::observation::OBS_DIM;
    use crate::sim::TankArena;
    use approx::assert_relative_eq;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use burn::backend::Autodiff;

    type TestBackend = Autodiff<NdArray>;

    fn tensor1(data: &[f32], device: &NdArrayDevice) -> Tensor<NdArray, 1> {
        Tensor::from_data(TensorData::from(data), device)
    }

    #[test]
    fn identical_log_probs_reduce_to_negative_mean_advantage() {
        let device = NdArrayDevice::default();
        let log_probs = tensor1(&[-1.0, -2.0, -0.5, -3.0], &device);
        let advantages = tensor1(&[1.0, -0.5, 2.0, 0.25], &device);

        let loss =
            clipped_surrogate_loss(log_probs.clone(), log_probs, advantages.clone(), 0.2);

        let expected = -advantages.mean().into_scalar();
        assert_relative_eq!(loss.into_scalar(), expected, epsilon = 1e-6);
    }

    #[test]
    fn value_loss_is_clamped() {
        let device = NdArrayDevice::default();
        let values = tensor1(&[0.0, 0.0], &device);
        let returns = tensor1(&[1000.0, -1000.0], &device);
        let loss = clamped_value_loss(values, returns);
        assert_relative_eq!(loss.into_scalar(), VALUE_LOSS_CLAMP);
    }

    #[test]
    fn advantages_normalize_to_unit_scale() {
        let mut advantages = vec![1.0, 2.0, 3.0, 4.0];
        normalize_advantages(&mut advantages);
        let mean: f32 = advantages.iter().sum::<f32>() / 4.0;
        let var: f32 = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-6);
        assert_relative_eq!(var.sqrt(), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn constant_advantages_are_only_centered() {
        let mut advantages = vec![5.0; 8];
        normalize_advantages(&mut advantages);
        assert!(advantages.iter().all(|a| a.abs() < 1e-6));
    }

    #[test]
    fn lr_decays_on_schedule() {
        let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM).with_hidden_dim(16);
        let config = PpoConfig {
            lr: 1.0,
            lr_decay: 0.5,
            lr_decay_every: 2,
            ..Default::default()
        };
        let mut trainer = PpoTrainer::<TestBackend>::new(&net, config, NdArrayDevice::default());

        let trajectory = Trajectory::default();
        trainer.update(&trajectory, &[], &[]);
        assert_relative_eq!(trainer.current_lr(), 1.0);
        trainer.update(&trajectory, &[], &[]);
        assert_relative_eq!(trainer.current_lr(), 0.5);
    }

    #[test]
    fn collect_and_update_round_trip() {
        let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM).with_hidden_dim(16);
        let config = PpoConfig {
            ppo_epochs: 2,
            mini_batch_size: 16,
            ..Default::default()
        };
        let mut trainer = PpoTrainer::<TestBackend>::new(&net, config, NdArrayDevice::default());
        let mut env = TankArena::with_max_steps(3, 25);

        let rollout = trainer.collect_episode(&mut env);
        assert!(!rollout.trajectory.is_empty());
        assert!(rollout.trajectory.len() as u32 <= 25);
        assert_eq!(rollout.trajectory.len() as u32, rollout.length);
        assert!(rollout.trajectory.log_probs.iter().all(|lp| lp.is_finite()));
        // The final transition always carries the done flag.
        assert_eq!(rollout.trajectory.dones.last(), Some(&true));
        assert!(rollout.outcome.is_some());

        let (advantages, returns) = trainer.estimate_advantages(&rollout);
        let metrics = trainer.update(&rollout.trajectory, &advantages, &returns);
        assert!(metrics.n_updates > 0);
        assert!(metrics.policy_loss.is_finite());
        assert!(metrics.value_loss.is_finite());
    }

    #[test]
    fn checkpoint_round_trip_restores_trainer_state() {
        let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM).with_hidden_dim(16);
        let device = NdArrayDevice::default();
        let mut trainer =
            PpoTrainer::<TestBackend>::new(&net, PpoConfig::default(), device.clone());
        trainer.total_steps = 123;
        trainer.record_episode(1.5, 10);
        trainer.record_episode(-2.0, 40);

        let dir = std::env::temp_dir().join(format!("warden-ckpt-{}", std::process::id()));
        let stem = dir.join("test");
        trainer.save_checkpoint(&stem).unwrap();

        let mut restored = PpoTrainer::<TestBackend>::new(&net, PpoConfig::default(), device);
        restored.load_checkpoint(&stem).unwrap();
        assert_eq!(restored.total_steps, 123);
        assert_eq!(restored.episode_rewards, vec![1.5, -2.0]);
        assert_eq!(restored.episode_lengths, vec![10, 40]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_checkpoint_is_reported_not_fatal() {
        let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM).with_hidden_dim(16);
        let mut trainer =
            PpoTrainer::<TestBackend>::new(&net, PpoConfig::default(), NdArrayDevice::default());
        let result = trainer.load_checkpoint(Path::new("/nonexistent/checkpoint"));
        assert!(matches!(result, Err(CheckpointError::Missing(_))));
    }

    #[test]
    fn non_finite_transitions_do_not_crash_update() {
        let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM).with_hidden_dim(16);
        let config = PpoConfig {
            ppo_epochs: 1,
            mini_batch_size: 8,
            ..Default::default()
        };
        let mut trainer = PpoTrainer::<TestBackend>::new(&net, config, NdArrayDevice::default());

        let mut trajectory = Trajectory::default();
        for i in 0..8 {
            let mut state = [0.1f32; OBS_DIM];
            state[0] = f32::NAN;
            trajectory.push(
                state,
                [0.0, 0.0, 0.5, 0.5, 0.5],
                if i == 3 { f32::INFINITY } else { 0.1 },
                0.0,
                f32::NAN,
                i == 7,
            );
        }
        let advantages = vec![f32::NAN; 8];
        let returns = vec![0.0; 8];

        let metrics = trainer.update(&trajectory, &advantages, &returns);
        assert!(metrics.total_loss.is_finite());
    }
}
