//! # LISA Shadow Robustness
//!
//! Traffic-sign classification on the LISA dataset with adversarial shadow
//! augmentation, built on the Burn framework.
//!
//! ## Modules
//!
//! - `dataset`: sample archives, mask templates, shadow casting and set doubling
//! - `model`: the CNN classifier
//! - `training`: epoch loop, learning rate decay and checkpoints
//! - `inference`: batch evaluation, single-image prediction and the frame-sequence harness
//! - `preprocess`: per-object crops from key-framed video annotations
//! - `utils`: errors, logging and number formatting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lisa_shadow::backend::{device_for, TrainingBackend};
//! use lisa_shadow::config::RunConfig;
//! use lisa_shadow::training::train_classifier;
//! use lisa_shadow::utils::RunLogger;
//!
//! let config = RunConfig::load("params.json".as_ref())?;
//! let device = device_for(config.device_kind()?)?;
//! let mut logger = RunLogger::new("log.txt");
//! train_classifier::<TrainingBackend>(&config, true, device, &mut logger)?;
//! logger.save()?;
//! ```

pub mod backend;
pub mod config;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod preprocess;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::RunConfig;
pub use dataset::{AugmentationStage, MaskRegistry, SampleSet, SampleStore, ShadowAugmentor};
pub use inference::{Evaluator, SequenceHarness, SequenceReport, SignPredictor};
pub use model::{LisaCnn, LisaCnnConfig};
pub use training::{Trainer, TrainingSummary};
pub use utils::error::{Result, ShadowError};
pub use utils::logging::RunLogger;

/// Side length of the square model input
pub const IMAGE_SIZE: usize = 32;

/// Ground-truth label used for frame sequences when none is given (speedLimit30)
pub const DEFAULT_SEQUENCE_LABEL: usize = 9;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
