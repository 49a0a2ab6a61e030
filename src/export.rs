//! Policy export for non-training runtimes
//!
//! Two artifacts from one trained policy:
//!
//! 1. A self-contained named-record file (`NamedMpkFileRecorder`) that a burn
//!    runtime without the training stack can load directly.
//! 2. A plain JSON dump of every parameter tensor, nested `layer -> weight /
//!    bias`, for consumers with no tensor runtime at all. Weight rows are
//!    indexed by output feature, matching the convention of the game engine
//!    that embeds them.
//!
//! The record export can fail on its own (recorder/version skew); that is
//! reported but never blocks the JSON dump.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::nn::Linear;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::nn::TacticalActorCritic;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the export artifacts ended up
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// Portable policy record, absent if the recorder failed
    pub portable: Option<PathBuf>,
    /// JSON parameter dump
    pub weights: PathBuf,
}

/// Export both artifacts under `stem`.
pub fn export_policy<B: Backend>(
    policy: &TacticalActorCritic<B>,
    stem: &Path,
) -> Result<ExportReport, ExportError> {
    if let Some(parent) = stem.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let portable_path = suffixed(stem, "_portable");
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let portable = match policy.clone().save_file(&portable_path, &recorder) {
        Ok(()) => Some(portable_path),
        Err(e) => {
            tracing::error!("portable record export failed: {e}");
            None
        }
    };

    let mut weights_path = suffixed(stem, "_weights");
    weights_path.set_extension("json");
    let dump = weights_json(policy);
    fs::write(&weights_path, serde_json::to_string_pretty(&dump)?)?;

    Ok(ExportReport {
        portable,
        weights: weights_path,
    })
}

/// Append `suffix` to the final path component of `stem`.
fn suffixed(stem: &Path, suffix: &str) -> PathBuf {
    let mut name = stem
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    stem.with_file_name(name)
}

/// Nested `name -> {weight, bias}` dump of every parameter tensor.
pub fn weights_json<B: Backend>(policy: &TacticalActorCritic<B>) -> Value {
    let mut root = Map::new();
    for (name, linear) in policy.named_linears() {
        root.insert(name.to_string(), linear_json(linear));
    }
    root.insert("log_std".to_string(), json!(policy.log_std_values()));
    Value::Object(root)
}

fn linear_json<B: Backend>(linear: &Linear<B>) -> Value {
    let weight = linear.weight.val();
    let [d_input, d_output] = weight.dims();
    let flat = weight
        .into_data()
        .as_slice::<f32>()
        .map(|s| s.to_vec())
        .unwrap_or_default();

    // Stored [input][output]; emit rows indexed by output feature.
    let mut rows: Vec<Vec<f32>> = vec![Vec::with_capacity(d_input); d_output];
    for (i, &v) in flat.iter().enumerate() {
        rows[i % d_output].push(v);
    }

    let bias: Vec<f32> = linear
        .bias
        .as_ref()
        .and_then(|b| b.val().into_data().as_slice::<f32>().map(|s| s.to_vec()).ok())
        .unwrap_or_default();

    json!({ "weight": rows, "bias": bias })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::TacticalActorCriticConfig;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn small_policy() -> TacticalActorCritic<NdArray> {
        let device = NdArrayDevice::default();
        let mut rng = Pcg64::seed_from_u64(0);
        TacticalActorCriticConfig::new(58, 5)
            .with_hidden_dim(16)
            .init(&mut rng, &device)
    }

    #[test]
    fn json_dump_covers_every_layer() {
        let policy = small_policy();
        let dump = weights_json(&policy);
        let object = dump.as_object().unwrap();

        for (name, _) in policy.named_linears() {
            let layer = object.get(name).unwrap_or_else(|| panic!("missing {name}"));
            assert!(layer.get("weight").unwrap().is_array());
            assert!(layer.get("bias").unwrap().is_array());
        }
        assert_eq!(object.get("log_std").unwrap().as_array().unwrap().len(), 5);
    }

    #[test]
    fn weight_rows_are_indexed_by_output() {
        let policy = small_policy();
        let dump = weights_json(&policy);
        // feature1 maps 58 inputs to 16 hidden units.
        let weight = dump["feature1"]["weight"].as_array().unwrap();
        assert_eq!(weight.len(), 16);
        assert_eq!(weight[0].as_array().unwrap().len(), 58);
    }

    #[test]
    fn export_writes_both_artifacts() {
        let policy = small_policy();
        let dir = std::env::temp_dir().join(format!("warden-export-{}", std::process::id()));
        let report = export_policy(&policy, &dir.join("best")).unwrap();

        assert!(report.weights.exists());
        let portable = report.portable.expect("portable record written");
        assert!(portable.with_extension("mpk").exists() || portable.exists());

        fs::remove_dir_all(&dir).ok();
    }
}
