//! Run configuration.
//!
//! One immutable [`RunConfig`] is loaded at startup from a JSON document and
//! passed by reference into every component that needs it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::masks::{lisa_mask_table, MaskShape};
use crate::utils::error::{ResultExt, ShadowError};
use crate::utils::Result;

/// Top-level configuration for every command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "RunConfigDocument")]
pub struct RunConfig {
    /// Number of output classes of the classifier
    pub class_count: usize,
    /// Compute device: `cpu`, `cuda` or `cuda:<ordinal>`
    pub device: String,
    /// Seed for shuffling, shadow sampling and weight initialisation
    pub seed: u64,
    /// Filesystem locations
    pub paths: PathConfig,
    /// Training hyperparameters
    pub training: TrainingConfig,
    /// Shadow mask shape per class label
    pub masks: BTreeMap<usize, MaskShape>,
}

/// On-disk form of [`RunConfig`]; a missing mask table falls back to the
/// built-in one restricted to `0..class_count`
#[derive(Deserialize)]
struct RunConfigDocument {
    class_count: usize,
    device: String,
    seed: u64,
    #[serde(default)]
    paths: PathConfig,
    #[serde(default)]
    training: TrainingConfig,
    #[serde(default)]
    masks: Option<BTreeMap<usize, MaskShape>>,
}

impl From<RunConfigDocument> for RunConfig {
    fn from(doc: RunConfigDocument) -> Self {
        let class_count = doc.class_count;
        Self {
            class_count,
            device: doc.device,
            seed: doc.seed,
            paths: doc.paths,
            training: doc.training,
            masks: doc.masks.unwrap_or_else(|| default_masks(class_count)),
        }
    }
}

/// Built-in mask table without labels the classifier cannot emit
fn default_masks(class_count: usize) -> BTreeMap<usize, MaskShape> {
    lisa_mask_table()
        .into_iter()
        .filter(|(label, _)| *label < class_count)
        .collect()
}

/// Filesystem locations used by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Directory holding `train.json` and `test.json`
    pub dataset_dir: PathBuf,
    /// Directory checkpoints are written to and read from
    pub model_dir: PathBuf,
    /// Root under which frame-sequence directories live
    pub videos_dir: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset/LISA"),
            model_dir: PathBuf::from("model"),
            videos_dir: PathBuf::from("videos"),
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training epochs
    pub epochs: usize,
    /// Mini-batch size for training and per-epoch evaluation
    pub batch_size: usize,
    /// Batch size for standalone test-set evaluation
    pub test_batch_size: usize,
    /// Initial SGD learning rate
    pub learning_rate: f64,
    /// SGD momentum
    pub momentum: f64,
    /// L2 weight decay penalty
    pub weight_decay: f64,
    /// Epoch counts after which the rate is multiplied by `lr_gamma`
    pub lr_milestones: Vec<usize>,
    /// Multiplicative decay applied at each milestone
    pub lr_gamma: f64,
    /// Label smoothing of the cross-entropy loss
    pub label_smoothing: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 16,
            test_batch_size: 64,
            learning_rate: 0.02,
            momentum: 0.9,
            weight_decay: 5e-4,
            lr_milestones: vec![50],
            lr_gamma: 0.2,
            label_smoothing: 0.1,
        }
    }
}

/// Parsed compute device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Cpu,
    Cuda(usize),
}

impl DeviceKind {
    /// Parse `cpu`, `cuda` or `cuda:<ordinal>`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "cpu" => Ok(DeviceKind::Cpu),
            "cuda" | "gpu" => Ok(DeviceKind::Cuda(0)),
            other => match other.strip_prefix("cuda:") {
                Some(ordinal) => ordinal
                    .parse::<usize>()
                    .map(DeviceKind::Cuda)
                    .config_context(&format!("invalid CUDA ordinal in device '{}'", s)),
                None => Err(ShadowError::Config(format!("unknown device '{}'", s))),
            },
        }
    }
}

impl RunConfig {
    /// Configuration with default paths and hyperparameters
    ///
    /// The mask table is the built-in one restricted to `0..class_count`.
    pub fn new(class_count: usize, device: &str, seed: u64) -> Self {
        Self {
            class_count,
            device: device.to_string(),
            seed,
            paths: PathConfig::default(),
            training: TrainingConfig::default(),
            masks: default_masks(class_count),
        }
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShadowError::MissingFile(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .config_context(&format!("failed to parse {}", path.display()))?;
        config.validate()?;

        info!(
            "Loaded configuration from {:?} (classes: {}, device: {}, seed: {})",
            path, config.class_count, config.device, config.seed
        );
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.class_count == 0 {
            return Err(ShadowError::Config(
                "class_count must be greater than 0".to_string(),
            ));
        }
        self.device_kind()?;

        let t = &self.training;
        if t.epochs == 0 {
            return Err(ShadowError::Config("epochs must be greater than 0".to_string()));
        }
        if t.batch_size == 0 || t.test_batch_size == 0 {
            return Err(ShadowError::Config(
                "batch sizes must be greater than 0".to_string(),
            ));
        }
        if t.learning_rate <= 0.0 {
            return Err(ShadowError::Config(
                "learning_rate must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&t.label_smoothing) {
            return Err(ShadowError::Config(
                "label_smoothing must be in range [0.0, 1.0)".to_string(),
            ));
        }
        if let Some(label) = self.masks.keys().find(|&&l| l >= self.class_count) {
            return Err(ShadowError::LabelOutOfRange {
                label: *label,
                class_count: self.class_count,
            });
        }

        Ok(())
    }

    /// Parsed compute device
    pub fn device_kind(&self) -> Result<DeviceKind> {
        DeviceKind::parse(&self.device)
    }
}
