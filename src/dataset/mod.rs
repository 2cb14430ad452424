//! Dataset module for LISA traffic-sign data
//!
//! This module provides:
//! - Loading the JSON sample archives of the train and test splits
//! - Per-class shadow mask templates
//! - Synthetic shadow casting and the set-doubling augmentation stage
//! - Burn `Dataset`/`Batcher` adapters

pub mod augmentation;
pub mod burn_dataset;
pub mod masks;
pub mod shadow;
pub mod store;

// Re-export main types for convenience
pub use augmentation::AugmentationStage;
pub use burn_dataset::{shuffled_indices, SignBatch, SignBatcher, SignDataset, SignItem};
pub use masks::{lisa_mask_table, MaskRegistry, MaskShape, MaskTemplate};
pub use shadow::{ShadowAugmentor, ShadowParams};
pub use store::{LabeledImage, SampleArchive, SampleSet, SampleStore};

/// Number of classes in the LISA subset
pub const NUM_CLASSES: usize = 16;

/// LISA class names, indexed by label
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "addedLane",
    "keepRight",
    "laneEnds",
    "merge",
    "pedestrianCrossing",
    "school",
    "schoolSpeedLimit25",
    "signalAhead",
    "speedLimit25",
    "speedLimit30",
    "speedLimit35",
    "speedLimit45",
    "stop",
    "stopAhead",
    "turnRight",
    "yield",
];

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}
