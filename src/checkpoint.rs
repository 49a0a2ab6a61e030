//! Checkpoint layout and metadata
//!
//! A checkpoint is three files sharing one path stem: the policy record and
//! the optimizer record (burn's binary recorder appends its own extension)
//! plus a JSON metadata file carrying step counters, the learning-rate
//! schedule position, and the episode reward/length history. Keeping the
//! metadata as plain JSON means a half-written or version-skewed checkpoint
//! still leaves the weights loadable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("recorder error: {0}")]
    Recorder(String),
    #[error("metadata error: {0}")]
    Meta(#[from] serde_json::Error),
    #[error("no checkpoint at {0}")]
    Missing(PathBuf),
}

/// Trainer state persisted alongside the tensor records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerMeta {
    pub total_steps: usize,
    pub episodes_seen: usize,
    pub lr: f64,
    pub episode_rewards: Vec<f32>,
    pub episode_lengths: Vec<u32>,
}

/// Path of the policy record (extension added by the recorder).
pub fn model_path(stem: &Path) -> PathBuf {
    stem_with_suffix(stem, "_model")
}

/// Path of the optimizer record (extension added by the recorder).
pub fn optimizer_path(stem: &Path) -> PathBuf {
    stem_with_suffix(stem, "_optim")
}

/// Path of the JSON metadata file.
pub fn meta_path(stem: &Path) -> PathBuf {
    let mut path = stem_with_suffix(stem, "_meta");
    path.set_extension("json");
    path
}

fn stem_with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(suffix);
    stem.with_file_name(name)
}
