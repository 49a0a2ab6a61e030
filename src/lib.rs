//! Adversarial tank-agent training
//!
//! Trains an exit-guarding tank policy with PPO against a scripted opponent
//! that tries to escape through an exit zone. The agent learns to hunt the
//! opponent down and hold interposing ground while never entering the exit
//! zone itself — a hard constraint that dominates every other reward signal.
//!
//! The crate splits along the training data flow:
//! - [`sim`] — the arena simulator (physics, combat, rewards, observations)
//! - [`nn`] — the tactical actor-critic network
//! - [`algo`] — trajectory collection, GAE, and the clipped-surrogate update
//! - [`train`] — episode loop, evaluation, and checkpoint cadence
//! - [`checkpoint`] / [`export`] — persistence and downstream export

pub mod algo;
pub mod checkpoint;
pub mod env;
pub mod export;
pub mod nn;
pub mod sim;
pub mod train;
pub mod traits;
