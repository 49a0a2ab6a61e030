/// Generalized Advantage Estimation
pub mod gae;

/// Proximal Policy Optimization
pub mod ppo;

pub use gae::compute_gae;
pub use ppo::{EpisodeRollout, PpoConfig, PpoTrainer, Trajectory};
