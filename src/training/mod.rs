//! Training module
//!
//! This module provides:
//! - The epoch-loop trainer with optional adversarial shadow augmentation
//! - Multi-step learning rate decay
//! - Checkpoint naming, saving and loading

pub mod checkpoint;
pub mod scheduler;
pub mod trainer;

// Re-export main types for convenience
pub use checkpoint::{checkpoint_path, load_classifier, save_classifier};
pub use scheduler::MultiStepLr;
pub use trainer::{train_classifier, EpochMetrics, Trainer, TrainerPhase, TrainingSummary};
