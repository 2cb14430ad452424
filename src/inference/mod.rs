//! Inference module for model evaluation and prediction
//!
//! This module provides:
//! - Batch evaluation shared by training and test-set accuracy runs
//! - Single image prediction with softmax confidence
//! - The frame-sequence robustness harness

pub mod evaluator;
pub mod harness;
pub mod predictor;

// Re-export main types for convenience
pub use evaluator::{EpochTally, Evaluator};
pub use harness::{sorted_frames, FrameClassifier, SequenceHarness, SequenceReport};
pub use predictor::{InferenceResult, Prediction, SignPredictor};
