//! Checkpoint save/load for trained RBM parameters.
//!
//! Serializes the weight matrix, both bias vectors, and the update
//! coefficients to JSON, with matrices stored as nested `Vec`s.

use crate::core::ParameterSet;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable checkpoint data.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckpointData {
    /// Number of visible units.
    pub n_visible: usize,
    /// Number of hidden units.
    pub n_hidden: usize,
    /// Weight matrix as nested Vec for serialization.
    pub weights: Vec<Vec<f64>>,
    /// Hidden bias vector.
    pub hidden_bias: Vec<f64>,
    /// Visible bias vector.
    pub visible_bias: Vec<f64>,
    /// Weight-gradient momentum coefficient.
    pub momentum: f64,
    /// Weight-decay coefficient.
    pub weight_decay: f64,
    /// Training step at which this checkpoint was saved.
    pub step: usize,
    /// Reconstruction cross-entropy at checkpoint time.
    pub cross_entropy: f64,
}

/// Convert an Array2 to Vec<Vec<f64>> for serialization.
fn array2_to_vecs(arr: &Array2<f64>) -> Vec<Vec<f64>> {
    arr.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Convert Vec<Vec<f64>> back to Array2.
fn vecs_to_array2(vecs: &[Vec<f64>]) -> Result<Array2<f64>, String> {
    if vecs.is_empty() {
        return Ok(Array2::zeros((0, 0)));
    }
    let nrows = vecs.len();
    let ncols = vecs[0].len();
    let flat: Vec<f64> = vecs.iter().flat_map(|r| r.iter().copied()).collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| format!("Failed to reconstruct weight matrix: {e}"))
}

/// Save a parameter checkpoint to a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be written or the data cannot be
/// serialized.
pub fn save_checkpoint(
    params: &ParameterSet,
    path: &Path,
    step: usize,
    cross_entropy: f64,
) -> Result<(), String> {
    let data = CheckpointData {
        n_visible: params.n_visible(),
        n_hidden: params.n_hidden(),
        weights: array2_to_vecs(&params.weights),
        hidden_bias: params.hidden_bias.to_vec(),
        visible_bias: params.visible_bias.to_vec(),
        momentum: params.momentum,
        weight_decay: params.weight_decay,
        step,
        cross_entropy,
    };

    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| format!("Failed to serialize checkpoint: {e}"))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

/// Load a parameter checkpoint from a JSON file.
///
/// Returns the parameters along with the checkpoint metadata.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or describes
/// inconsistent dimensions.
pub fn load_checkpoint(path: &Path) -> Result<(ParameterSet, CheckpointData), String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let data: CheckpointData =
        serde_json::from_str(&json).map_err(|e| format!("Failed to parse checkpoint: {e}"))?;

    let weights = vecs_to_array2(&data.weights)?;
    if weights.dim() != (data.n_visible, data.n_hidden) {
        return Err(format!(
            "Checkpoint dimensions are inconsistent: weights are {:?} but header says ({}, {})",
            weights.dim(),
            data.n_visible,
            data.n_hidden
        ));
    }
    if data.hidden_bias.len() != data.n_hidden || data.visible_bias.len() != data.n_visible {
        return Err("Checkpoint bias lengths do not match the layer sizes".to_string());
    }

    let params = ParameterSet {
        weights,
        hidden_bias: Array1::from_vec(data.hidden_bias.clone()),
        visible_bias: Array1::from_vec(data.visible_bias.clone()),
        momentum: data.momentum,
        weight_decay: data.weight_decay,
    };
    Ok((params, data))
}
