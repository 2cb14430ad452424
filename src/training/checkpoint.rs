//! Classifier checkpoints
//!
//! One parameter file per training mode lives in the model directory:
//! `model_lisa.bin` for clean training and `adv_model_lisa.bin` for
//! adversarial training. Parameters are stored at full precision.

use std::fs;
use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{BinFileRecorder, FullPrecisionSettings};
use burn::tensor::backend::Backend;
use tracing::info;

use crate::model::{LisaCnn, LisaCnnConfig};
use crate::utils::{Result, ShadowError};

const CHECKPOINT_STEM: &str = "model_lisa";

/// Checkpoint location for a training mode
pub fn checkpoint_path(model_dir: &Path, adversarial: bool) -> PathBuf {
    let prefix = if adversarial { "adv_" } else { "" };
    model_dir.join(format!("{}{}.bin", prefix, CHECKPOINT_STEM))
}

/// Save classifier parameters, creating the model directory if needed
pub fn save_classifier<B: Backend>(
    model: &LisaCnn<B>,
    model_dir: &Path,
    adversarial: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(model_dir)?;
    let path = checkpoint_path(model_dir, adversarial);

    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path.clone(), &recorder)
        .map_err(|e| ShadowError::Checkpoint(format!("failed to save {:?}: {}", path, e)))?;

    info!("Saved checkpoint to {:?}", path);
    Ok(path)
}

/// Restore a classifier saved by [`save_classifier`]
pub fn load_classifier<B: Backend>(
    model_dir: &Path,
    adversarial: bool,
    class_count: usize,
    device: &B::Device,
) -> Result<LisaCnn<B>> {
    let path = checkpoint_path(model_dir, adversarial);
    if !path.exists() {
        return Err(ShadowError::MissingFile(path));
    }

    let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
    let model = LisaCnnConfig::new()
        .with_num_classes(class_count)
        .init::<B>(device)
        .load_file(path.clone(), &recorder, device)
        .map_err(|e| ShadowError::Checkpoint(format!("failed to load {:?}: {}", path, e)))?;

    info!("Loaded checkpoint from {:?}", path);
    Ok(model)
}
