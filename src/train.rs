//! Training loop orchestration and evaluation
//!
//! Strictly sequential: one arena, one episode collected in full, one PPO
//! update, repeat. The only state that survives an episode is the trainer
//! (policy + optimizer + histories) and the [`TrainState`] bookkeeping
//! passed explicitly through the loop — nothing ambient, so several runs can
//! coexist in one process.
//!
//! Fault tolerance over purity: a failed checkpoint write or export is
//! logged and training continues. Runs last many thousands of episodes and
//! none of these conditions is worth losing one.

use std::path::{Path, PathBuf};

use burn::tensor::backend::AutodiffBackend;
use tracing::{info, warn};

use crate::algo::{PpoConfig, PpoTrainer};
use crate::checkpoint::CheckpointError;
use crate::env::Environment;
use crate::nn::TacticalActorCriticConfig;
use crate::sim::observation::OBS_DIM;
use crate::sim::{Outcome, TankArena, ACTION_DIM};

/// Run configuration accepted by the training entry point
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub episodes: usize,
    pub max_steps: u32,
    pub hidden_dim: usize,
    pub lr: f64,
    pub gamma: f32,
    pub clip_epsilon: f32,
    pub ppo_epochs: usize,
    pub mini_batch_size: usize,
    pub save_dir: PathBuf,
    pub save_interval: usize,
    pub load_model: Option<PathBuf>,
    pub eval_episodes: usize,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            episodes: 10_000,
            max_steps: 1000,
            hidden_dim: 256,
            lr: 3e-4,
            gamma: 0.99,
            clip_epsilon: 0.2,
            ppo_epochs: 10,
            mini_batch_size: 64,
            save_dir: PathBuf::from("models"),
            save_interval: 500,
            load_model: None,
            eval_episodes: 100,
            seed: 0,
        }
    }
}

/// Episode outcome counters
#[derive(Debug, Clone, Copy, Default)]
pub struct OutcomeTally {
    pub wins: usize,
    pub losses: usize,
    pub escapes: usize,
    pub exit_touches: usize,
    pub timeouts: usize,
}

impl OutcomeTally {
    pub fn record(&mut self, outcome: Option<Outcome>) {
        match outcome {
            Some(Outcome::Won) => self.wins += 1,
            Some(Outcome::Died) => self.losses += 1,
            Some(Outcome::OpponentEscaped) => self.escapes += 1,
            Some(Outcome::TouchedExit) => self.exit_touches += 1,
            Some(Outcome::Timeout) => self.timeouts += 1,
            None => {}
        }
    }
}

/// Explicit per-run bookkeeping threaded through the loop
#[derive(Debug, Clone)]
pub struct TrainState {
    pub tally: OutcomeTally,
    pub best_reward: f32,
}

impl Default for TrainState {
    fn default() -> Self {
        Self {
            tally: OutcomeTally::default(),
            best_reward: f32::NEG_INFINITY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrainSummary {
    pub episodes: usize,
    pub best_reward: f32,
}

/// Train a fresh (or warm-started) policy against the arena.
pub fn train<B: AutodiffBackend<FloatElem = f32>>(
    config: &TrainConfig,
    device: B::Device,
) -> Result<TrainSummary, CheckpointError> {
    info!(
        episodes = config.episodes,
        max_steps = config.max_steps,
        hidden_dim = config.hidden_dim,
        "starting adversarial training"
    );

    let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM).with_hidden_dim(config.hidden_dim);
    let ppo = PpoConfig {
        lr: config.lr,
        gamma: config.gamma,
        clip_epsilon: config.clip_epsilon,
        ppo_epochs: config.ppo_epochs,
        mini_batch_size: config.mini_batch_size,
        ..Default::default()
    };
    let mut trainer = PpoTrainer::<B>::new(&net, ppo, device);

    if let Some(path) = &config.load_model {
        match trainer.load_checkpoint(path) {
            Ok(()) => info!("resumed from checkpoint {}", path.display()),
            Err(e) => warn!("checkpoint unusable ({e}); starting fresh"),
        }
    }

    let mut env = TankArena::with_max_steps(config.seed, config.max_steps);
    let mut state = TrainState::default();

    for episode in 0..config.episodes {
        let rollout = trainer.collect_episode(&mut env);
        state.tally.record(rollout.outcome);

        let (advantages, returns) = trainer.estimate_advantages(&rollout);
        let metrics = trainer.update(&rollout.trajectory, &advantages, &returns);
        trainer.record_episode(rollout.episode_reward, rollout.length);

        let completed = episode + 1;
        if completed % 100 == 0 {
            let avg = rolling_mean(&trainer.episode_rewards, 100);
            let tally = state.tally;
            info!(
                episode = completed,
                avg_reward = avg as f64,
                loss = metrics.total_loss as f64,
                lr = trainer.current_lr(),
                skipped = metrics.skipped_updates,
                "progress"
            );
            // Rates are reported against the whole run even though the
            // counters reset every 1000 episodes; the resets and the
            // best-model window run on independent cadences.
            info!(
                wins = tally.wins,
                losses = tally.losses,
                escapes = tally.escapes,
                exit_touches = tally.exit_touches,
                timeouts = tally.timeouts,
                win_rate = tally.wins as f64 / completed as f64 * 100.0,
                exit_touch_rate = tally.exit_touches as f64 / completed as f64 * 100.0,
                "outcomes"
            );

            if completed % 1000 == 0 {
                state.tally = OutcomeTally::default();
            }

            if avg > state.best_reward {
                state.best_reward = avg;
                let stem = config.save_dir.join("best_model");
                match trainer.save_checkpoint(&stem) {
                    Ok(()) => info!("best model saved ({avg:.2})"),
                    Err(e) => warn!("best-model save failed: {e}"),
                }
            }
        }

        if config.save_interval > 0 && completed % config.save_interval == 0 {
            let stem = config.save_dir.join(format!("model_ep{completed}"));
            if let Err(e) = trainer.save_checkpoint(&stem) {
                warn!("periodic save failed: {e}");
            }
        }
    }

    let final_stem = config.save_dir.join("final_model");
    if let Err(e) = trainer.save_checkpoint(&final_stem) {
        warn!("final save failed: {e}");
    }

    info!(best_reward = state.best_reward as f64, "training complete");

    Ok(TrainSummary {
        episodes: config.episodes,
        best_reward: state.best_reward,
    })
}

/// Results of a deterministic evaluation run
#[derive(Debug, Clone, Copy)]
pub struct EvalReport {
    pub episodes: usize,
    pub tally: OutcomeTally,
    pub mean_reward: f32,
    pub std_reward: f32,
}

/// Evaluate a checkpoint over `eval_episodes` deterministic episodes.
///
/// A missing or unreadable checkpoint is reported and the freshly
/// initialized policy is evaluated instead.
pub fn evaluate<B: AutodiffBackend<FloatElem = f32>>(
    model: &Path,
    config: &TrainConfig,
    device: B::Device,
) -> EvalReport {
    let net = TacticalActorCriticConfig::new(OBS_DIM, ACTION_DIM).with_hidden_dim(config.hidden_dim);
    let mut trainer = PpoTrainer::<B>::new(&net, PpoConfig::default(), device);
    match trainer.load_checkpoint(model) {
        Ok(()) => info!("evaluating {}", model.display()),
        Err(e) => warn!("checkpoint unusable ({e}); evaluating a fresh policy"),
    }

    let mut env = TankArena::with_max_steps(config.seed, config.max_steps);
    let mut tally = OutcomeTally::default();
    let mut rewards = Vec::with_capacity(config.eval_episodes);

    for episode in 0..config.eval_episodes {
        let mut obs = env.reset();
        let mut episode_reward = 0.0f32;
        let mut outcome = None;

        while env.is_active() {
            let (action, _) = trainer.act(&obs, true);
            let step = env.step(action);
            episode_reward += step.reward;
            obs = step.state;
            if step.done {
                outcome = step.outcome;
                break;
            }
        }

        tally.record(outcome);
        rewards.push(episode_reward);
        info!(
            episode = episode + 1,
            reward = episode_reward as f64,
            result = outcome.map(|o| o.as_str()).unwrap_or("unknown"),
            "eval episode"
        );
    }

    let (mean, std) = mean_std(&rewards);
    EvalReport {
        episodes: config.eval_episodes,
        tally,
        mean_reward: mean,
        std_reward: std,
    }
}

fn rolling_mean(values: &[f32], window: usize) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let tail = &values[values.len().saturating_sub(window)..];
    tail.iter().sum::<f32>() / tail.len() as f32
}

fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, var.sqrt())
}
